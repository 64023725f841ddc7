use crate::env::EnvConfig;
use crate::id::random_id;
use sim_fixture::{Mode, Sink, StubDescriptor};
use std::cell::RefCell;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

struct Inner {
    mode: Mode,
    run_id: String,
    request_id: String,
    store_root: Option<PathBuf>,
    sink: Option<Arc<dyn Sink>>,
    ordinal_counters: HashMap<String, u64>,
    collected_stubs: Vec<StubDescriptor>,
    trace_depth: usize,
}

/// Per-request scoped state (spec C2): mode, run id, ordinals, collected
/// stubs, trace depth. Cheap to clone — clones share the same underlying
/// state via `Arc`, which is what makes explicit propagation across a
/// `tokio::spawn` boundary ("inherit a snapshot") a simple clone-and-move.
#[derive(Clone)]
pub struct Context(Arc<Mutex<Inner>>);

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.0.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("Context")
            .field("mode", &inner.mode)
            .field("run_id", &inner.run_id)
            .field("request_id", &inner.request_id)
            .field("trace_depth", &inner.trace_depth)
            .finish()
    }
}

impl Context {
    pub fn new(mode: Mode, run_id: String, store_root: Option<PathBuf>) -> Context {
        Context(Arc::new(Mutex::new(Inner {
            mode,
            run_id,
            request_id: random_id(),
            store_root,
            sink: None,
            ordinal_counters: HashMap::new(),
            collected_stubs: Vec::new(),
            trace_depth: 0,
        })))
    }

    /// Builds a context from `SIM_*` environment variables, as `current()`
    /// does lazily when nothing has been explicitly set (spec §4.2).
    pub fn from_env() -> Context {
        let env = EnvConfig::from_process_env();
        let run_id = env.run_id.unwrap_or_else(random_id);
        Context::new(env.mode, run_id, env.store_root)
    }

    pub fn with_sink(self, sink: Arc<dyn Sink>) -> Context {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).sink = Some(sink);
        self
    }

    pub fn mode(&self) -> Mode {
        self.lock().mode
    }

    pub fn is_active(&self) -> bool {
        self.mode().is_active()
    }

    pub fn is_recording(&self) -> bool {
        self.mode().is_recording()
    }

    pub fn is_replaying(&self) -> bool {
        self.mode().is_replaying()
    }

    pub fn run_id(&self) -> String {
        self.lock().run_id.clone()
    }

    pub fn request_id(&self) -> String {
        self.lock().request_id.clone()
    }

    pub fn store_root(&self) -> Option<PathBuf> {
        self.lock().store_root.clone()
    }

    pub fn sink(&self) -> Option<Arc<dyn Sink>> {
        self.lock().sink.clone()
    }

    pub fn trace_depth(&self) -> usize {
        self.lock().trace_depth
    }

    /// Rotates `request_id` and clears all per-request state. Called at
    /// request ingress.
    pub fn start_new_request(&self) {
        let mut inner = self.lock();
        inner.request_id = random_id();
        inner.ordinal_counters.clear();
        inner.collected_stubs.clear();
        inner.trace_depth = 0;
    }

    /// Clears per-request state without rotating identifiers.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.ordinal_counters.clear();
        inner.collected_stubs.clear();
        inner.trace_depth = 0;
    }

    /// Read-modify-write on `ordinal_counters[fp]`: returns 0, 1, 2, ...
    /// on successive calls with the same fingerprint, without gaps.
    pub fn next_ordinal(&self, fingerprint: &str) -> u64 {
        let mut inner = self.lock();
        let counter = inner.ordinal_counters.entry(fingerprint.to_string()).or_insert(0);
        let ordinal = *counter;
        *counter += 1;
        ordinal
    }

    pub fn enter_trace(&self) -> usize {
        let mut inner = self.lock();
        inner.trace_depth += 1;
        inner.trace_depth
    }

    pub fn exit_trace(&self) -> usize {
        let mut inner = self.lock();
        inner.trace_depth = inner.trace_depth.saturating_sub(1);
        inner.trace_depth
    }

    pub fn push_stub(&self, stub: StubDescriptor) {
        self.lock().collected_stubs.push(stub);
    }

    /// The current length of `collected_stubs`, to snapshot before a trace
    /// body runs (spec §4.5 step 4, `S = len(context.collected_stubs)`).
    pub fn stubs_len(&self) -> usize {
        self.lock().collected_stubs.len()
    }

    /// Slices `collected_stubs[since..]` out of the context and returns it,
    /// per spec §4.5 step 6 ("slice out inner_stubs ... and delete that
    /// slice from the context").
    pub fn drain_stubs_since(&self, since: usize) -> Vec<StubDescriptor> {
        let mut inner = self.lock();
        if since >= inner.collected_stubs.len() {
            return Vec::new();
        }
        inner.collected_stubs.split_off(since)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

tokio::task_local! {
    static TASK_CONTEXT: Context;
}

thread_local! {
    static THREAD_CONTEXT: RefCell<Option<Context>> = const { RefCell::new(None) };
}

/// Returns the context bound to the current request/task, creating one
/// from the environment (mode defaulting to `off`) if none exists yet.
///
/// Checks task-local storage first (so concurrent `tokio` tasks on the
/// same OS thread never see each other's context), then falls back to a
/// thread-local default for purely synchronous call stacks (spec §4.2,
/// §5: "plain thread-local is insufficient under task switching" — so the
/// task-local check always takes priority).
pub fn current() -> Context {
    if let Ok(ctx) = TASK_CONTEXT.try_with(|ctx| ctx.clone()) {
        return ctx;
    }
    THREAD_CONTEXT.with(|cell| {
        let mut slot = cell.borrow_mut();
        if let Some(ctx) = slot.as_ref() {
            ctx.clone()
        } else {
            let ctx = Context::from_env();
            *slot = Some(ctx.clone());
            ctx
        }
    })
}

/// Handle returned by [`set_thread_context`]; restores the previous
/// thread-local context when dropped.
pub struct ContextGuard {
    previous: Option<Context>,
    _not_send: std::marker::PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        THREAD_CONTEXT.with(|cell| {
            *cell.borrow_mut() = self.previous.take();
        });
    }
}

/// Replaces the thread-local context for synchronous call stacks, returning
/// a guard that restores the previous value on drop.
pub fn set_thread_context(ctx: Context) -> ContextGuard {
    let previous = THREAD_CONTEXT.with(|cell| cell.borrow_mut().replace(ctx));
    ContextGuard {
        previous,
        _not_send: std::marker::PhantomData,
    }
}

/// Runs `fut` with `ctx` bound as the task-local context for its entire
/// lifetime, including across `.await` suspension points. This is the
/// async-safe counterpart to [`set_thread_context`] and the mechanism by
/// which a spawned task can "inherit a snapshot of the parent context"
/// (spec §5) by capturing `ctx` before `tokio::spawn`.
pub async fn scope<F: std::future::Future>(ctx: Context, fut: F) -> F::Output {
    TASK_CONTEXT.scope(ctx, fut).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_new_request_clears_ordinals_stubs_and_depth() {
        let ctx = Context::new(Mode::Record, "run1".into(), None);
        ctx.next_ordinal("fp");
        ctx.enter_trace();
        ctx.push_stub(StubDescriptor::Capture {
            label: "x".into(),
            ordinal: 0,
            output: serde_json::json!(1),
            source: sim_fixture::Source::Record,
        });

        let old_request_id = ctx.request_id();
        ctx.start_new_request();

        assert_ne!(ctx.request_id(), old_request_id);
        assert_eq!(ctx.next_ordinal("fp"), 0);
        assert_eq!(ctx.trace_depth(), 0);
        assert_eq!(ctx.stubs_len(), 0);
    }

    #[test]
    fn reset_clears_state_but_keeps_request_id() {
        let ctx = Context::new(Mode::Record, "run1".into(), None);
        ctx.next_ordinal("fp");
        let request_id = ctx.request_id();
        ctx.reset();
        assert_eq!(ctx.request_id(), request_id);
        assert_eq!(ctx.next_ordinal("fp"), 0);
    }

    #[test]
    fn ordinals_increment_without_gaps_per_fingerprint() {
        let ctx = Context::new(Mode::Record, "run1".into(), None);
        assert_eq!(ctx.next_ordinal("a"), 0);
        assert_eq!(ctx.next_ordinal("a"), 1);
        assert_eq!(ctx.next_ordinal("a"), 2);
        assert_eq!(ctx.next_ordinal("b"), 0);
    }

    #[test]
    fn drain_stubs_since_removes_only_the_suffix() {
        let ctx = Context::new(Mode::Record, "run1".into(), None);
        let stub = |label: &str| StubDescriptor::Capture {
            label: label.into(),
            ordinal: 0,
            output: serde_json::json!(null),
            source: sim_fixture::Source::Record,
        };
        ctx.push_stub(stub("a"));
        let snapshot = ctx.stubs_len();
        ctx.push_stub(stub("b"));
        ctx.push_stub(stub("c"));

        let drained = ctx.drain_stubs_since(snapshot);
        assert_eq!(drained.len(), 2);
        assert_eq!(ctx.stubs_len(), 1);
    }

    #[tokio::test]
    async fn concurrent_tasks_on_one_thread_observe_independent_contexts() {
        let rt = tokio::runtime::Handle::current();
        let mut handles = Vec::new();
        for i in 0..8 {
            let ctx = Context::new(Mode::Record, format!("run{i}"), None);
            handles.push(rt.spawn(scope(ctx.clone(), async move {
                for _ in 0..50 {
                    tokio::task::yield_now().await;
                }
                let observed = current();
                assert_eq!(observed.run_id(), ctx.run_id());
                observed.next_ordinal("fp")
            })));
        }
        for h in handles {
            h.await.unwrap();
        }
    }

    #[test]
    fn set_thread_context_restores_previous_on_drop() {
        let first = Context::new(Mode::Off, "first".into(), None);
        let second = Context::new(Mode::Record, "second".into(), None);

        let _g1 = set_thread_context(first.clone());
        assert_eq!(current().run_id(), "first");
        {
            let _g2 = set_thread_context(second.clone());
            assert_eq!(current().run_id(), "second");
        }
        assert_eq!(current().run_id(), "first");
    }
}
