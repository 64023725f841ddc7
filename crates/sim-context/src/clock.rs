use sim_fixture::Mode;
use std::sync::OnceLock;
use time::OffsetDateTime;

static FROZEN_OVERRIDE: OnceLock<Option<OffsetDateTime>> = OnceLock::new();

/// The timestamp replay defaults to when nothing overrides it (spec §6).
const DEFAULT_REPLAY_FREEZE: &str = "2024-01-01T12:00:00Z";

/// The current UTC time, honoring `SIM_FROZEN_TIME` (spec §6) if set —
/// read once and cached, matching "environment is read once at context
/// creation" (spec §5). Not part of the core's hard engineering spine
/// (spec §9: clock freezing "belongs in the external collaborators
/// layer"), but cheap enough to carry here so primitives have one place to
/// stamp `recorded_at`.
///
/// With no explicit override, replay still needs a deterministic clock:
/// this falls back to [`DEFAULT_REPLAY_FREEZE`] whenever the *active*
/// context is replaying, rather than only when `SIM_MODE=replay` happened
/// to be set in the process environment — a context built programmatically
/// (e.g. `Context::new(Mode::Replay, ...)`) must freeze just the same.
pub fn now_utc() -> OffsetDateTime {
    let override_time = FROZEN_OVERRIDE.get_or_init(|| {
        crate::EnvConfig::from_process_env()
            .frozen_time
            .and_then(|raw| parse_frozen_time(&raw))
    });

    if let Some(t) = override_time {
        return *t;
    }

    if crate::context::current().mode() == Mode::Replay {
        return parse_frozen_time(DEFAULT_REPLAY_FREEZE).expect("constant parses");
    }

    OffsetDateTime::now_utc()
}

fn parse_frozen_time(raw: &str) -> Option<OffsetDateTime> {
    if let Ok(epoch) = raw.parse::<i64>() {
        return OffsetDateTime::from_unix_timestamp(epoch).ok();
    }
    OffsetDateTime::parse(raw, &time::format_description::well_known::Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rfc3339_and_epoch_seconds() {
        assert!(parse_frozen_time("2024-01-01T12:00:00Z").is_some());
        assert!(parse_frozen_time("1704110400").is_some());
        assert!(parse_frozen_time("not a time").is_none());
    }

    #[test]
    fn replay_context_without_explicit_override_freezes_to_the_default() {
        let ctx = crate::Context::new(Mode::Replay, "run1".into(), None);
        let _guard = crate::set_thread_context(ctx);

        assert_eq!(now_utc(), parse_frozen_time(DEFAULT_REPLAY_FREEZE).unwrap());
    }

    #[test]
    fn off_context_without_explicit_override_uses_the_live_clock() {
        let ctx = crate::Context::new(Mode::Off, "run1".into(), None);
        let _guard = crate::set_thread_context(ctx);

        assert_ne!(now_utc(), parse_frozen_time(DEFAULT_REPLAY_FREEZE).unwrap());
    }
}
