use std::time::Duration;

/// Policy applied when the sink's in-memory buffer is at capacity and a
/// new event arrives (spec §4.4 "Backpressure policy").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropPolicy {
    DropOldest,
    DropNewest,
    DropRandom,
}

#[derive(Debug, Clone)]
pub struct SinkConfig {
    /// Byte ceiling for the buffer, default 512 KiB (`SIM_BUFFER_SIZE_KB`).
    pub buffer_bytes_ceiling: usize,
    /// Optional event-count ceiling, independent of the byte ceiling.
    pub max_events: usize,
    /// Background flush interval, default 200ms (`SIM_FLUSH_INTERVAL_MS`).
    pub flush_interval: Duration,
    /// Events accumulated before an `emit` call synchronously flushes a
    /// batch on the producer's stack (spec §4.4 "Persistence").
    pub batch_size: usize,
    pub drop_policy: DropPolicy,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            buffer_bytes_ceiling: 512 * 1024,
            max_events: usize::MAX,
            flush_interval: Duration::from_millis(200),
            batch_size: 32,
            drop_policy: DropPolicy::DropOldest,
        }
    }
}

impl SinkConfig {
    /// Applies `SIM_BUFFER_SIZE_KB` / `SIM_FLUSH_INTERVAL_MS` overrides on
    /// top of the defaults above.
    pub fn from_env(buffer_size_kb: Option<u64>, flush_interval_ms: Option<u64>) -> SinkConfig {
        let mut config = SinkConfig::default();
        if let Some(kb) = buffer_size_kb {
            config.buffer_bytes_ceiling = (kb as usize).saturating_mul(1024);
        }
        if let Some(ms) = flush_interval_ms {
            config.flush_interval = Duration::from_millis(ms);
        }
        config
    }
}
