//! Public surface for applications adopting record-and-replay: one crate to
//! depend on instead of wiring up `sim-context`/`sim-trace`/`sim-capture`/
//! `sim-db`/`sim-sink` individually, the way `doc` aggregates `json`/`tuple`
//! for downstream crates in the teacher workspace.

pub mod http;

pub use sim_canon::{fingerprint, fingerprint_prefix, sql, Value};
pub use sim_capture::{capture, CaptureError, CaptureHandle};
pub use sim_context::{current, scope, set_thread_context, Context, ContextGuard, Mode};
pub use sim_db::{Connection, DbError, DbProxy};
pub use sim_fixture::{NoopRedactor, Redactor};
pub use sim_sink::{default_sink, set_default_sink, DropPolicy, RemoteStore, Sink, SinkConfig, SinkEvent};
pub use sim_trace::{trace, TraceError};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn off_mode_round_trips_through_the_facade_only() {
        let dir = tempdir().unwrap();
        let ctx = Context::new(Mode::Off, "run-1".into(), Some(dir.path().to_path_buf()));
        let input = Value::object([("a".to_string(), Value::Int(1)), ("b".to_string(), Value::Int(2))]);
        let result: Result<i32, TraceError<std::convert::Infallible>> =
            scope(ctx, trace("facade::add", input, || async { Ok(3) })).await;
        assert_eq!(result.unwrap(), 3);
    }
}
