use sim_fixture::{DirectStore, Sink};
use std::sync::{Arc, OnceLock, RwLock};

static DEFAULT_SINK: OnceLock<RwLock<Arc<dyn Sink>>> = OnceLock::new();

fn slot() -> &'static RwLock<Arc<dyn Sink>> {
    DEFAULT_SINK.get_or_init(|| RwLock::new(Arc::new(DirectStore)))
}

/// The process-wide default sink, used by primitives that were never given
/// an explicit one via their `Context`. Per spec §9, this is a convenience,
/// not load-bearing: every primitive also accepts a sink explicitly.
pub fn default_sink() -> Arc<dyn Sink> {
    slot().read().unwrap_or_else(|e| e.into_inner()).clone()
}

/// Replaces the global default sink. The caller is responsible for closing
/// (flush + release) the previous sink if it owns buffered state.
pub fn set_default_sink(sink: Arc<dyn Sink>) -> Arc<dyn Sink> {
    let mut slot = slot().write().unwrap_or_else(|e| e.into_inner());
    std::mem::replace(&mut *slot, sink)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_fixture::SinkEvent;

    struct Counting(std::sync::atomic::AtomicU64);

    impl Sink for Counting {
        fn emit(&self, _event: SinkEvent) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    #[test]
    fn replacing_default_returns_previous() {
        let previous = set_default_sink(Arc::new(Counting(Default::default())));
        let _ = previous;
        let current = default_sink();
        current.emit(SinkEvent::new(std::path::PathBuf::from("/tmp/x.json"), &serde_json::json!(1)).unwrap());
        set_default_sink(Arc::new(DirectStore));
    }
}
