use std::str::FromStr;

/// The tri-state mode a [`sim_context::Context`] (and, through it, every
/// primitive) runs in. Invalid configuration degrades to `Off` rather than
/// erroring, per spec §3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Off,
    Record,
    Replay,
}

impl Mode {
    pub fn is_active(self) -> bool {
        !matches!(self, Mode::Off)
    }

    pub fn is_recording(self) -> bool {
        matches!(self, Mode::Record)
    }

    pub fn is_replaying(self) -> bool {
        matches!(self, Mode::Replay)
    }

    /// Parses `SIM_MODE`-style input, silently degrading anything
    /// unrecognized to `Off` rather than raising an error.
    pub fn from_env_str(raw: &str) -> Mode {
        raw.parse().unwrap_or_default()
    }
}

impl FromStr for Mode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(Mode::Off),
            "record" => Ok(Mode::Record),
            "replay" => Ok(Mode::Replay),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Mode::Off => "off",
            Mode::Record => "record",
            Mode::Replay => "replay",
        })
    }
}
