use sim_fixture::Mode;
use std::path::PathBuf;

/// Snapshot of the `SIM_*` environment variables read once at context
/// construction (spec §5 "Environment is read once at context creation").
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub mode: Mode,
    pub run_id: Option<String>,
    pub store_root: Option<PathBuf>,
    pub buffer_size_kb: Option<u64>,
    pub flush_interval_ms: Option<u64>,
    pub frozen_time: Option<String>,
}

impl EnvConfig {
    pub fn from_process_env() -> EnvConfig {
        EnvConfig {
            mode: std::env::var("SIM_MODE")
                .map(|v| Mode::from_env_str(&v))
                .unwrap_or_default(),
            run_id: std::env::var("SIM_RUN_ID").ok(),
            store_root: std::env::var("SIM_STUB_DIR").ok().map(PathBuf::from),
            buffer_size_kb: std::env::var("SIM_BUFFER_SIZE_KB")
                .ok()
                .and_then(|v| v.parse().ok()),
            flush_interval_ms: std::env::var("SIM_FLUSH_INTERVAL_MS")
                .ok()
                .and_then(|v| v.parse().ok()),
            frozen_time: std::env::var("SIM_FROZEN_TIME").ok().or_else(|| {
                // Replay runs default to a fixed clock even with no
                // explicit override, per spec §6.
                (std::env::var("SIM_MODE").as_deref() == Ok("replay"))
                    .then(|| "2024-01-01T12:00:00Z".to_string())
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test_guard::with_env_lock;

    #[test]
    fn invalid_mode_degrades_to_off() {
        with_env_lock(|| {
            std::env::set_var("SIM_MODE", "bogus");
            assert_eq!(EnvConfig::from_process_env().mode, Mode::Off);
            std::env::remove_var("SIM_MODE");
        });
    }

    #[test]
    fn replay_without_frozen_time_override_defaults() {
        with_env_lock(|| {
            std::env::set_var("SIM_MODE", "replay");
            std::env::remove_var("SIM_FROZEN_TIME");
            let cfg = EnvConfig::from_process_env();
            assert_eq!(cfg.frozen_time.as_deref(), Some("2024-01-01T12:00:00Z"));
            std::env::remove_var("SIM_MODE");
        });
    }
}

#[cfg(test)]
mod serial_test_guard {
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Environment-variable tests in this module mutate process-global
    /// state; serialize them so they don't race `cargo test`'s default
    /// multi-threaded runner.
    pub fn with_env_lock<F: FnOnce()>(f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        f();
    }
}
