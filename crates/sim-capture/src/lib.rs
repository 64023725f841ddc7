//! The capture primitive (spec component C6): an opaque, transport-agnostic
//! labeled block whose caller decides what value represents its result.
//! Unlike [`sim_trace`](../sim_trace), capture has no input to fingerprint —
//! it is keyed purely by `(label, ordinal)`.

use sim_context::Context;
use sim_fixture::{paths, read_fixture, CaptureFixture, Mode, ReadFixtureError, Sink, SinkEvent, Source, StubDescriptor, StubMissError};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error(transparent)]
    StubMiss(#[from] StubMissError),
    #[error("capture block for label '{label}' exited without calling handle.set(..)")]
    ResultNotSet { label: String },
}

/// The value a captured block reads and writes. In record/off mode the
/// developer calls [`CaptureHandle::set`] to record the block's result; in
/// replay mode `result` arrives pre-populated and `replaying` is `true`, so
/// the developer is expected to branch on it to skip redoing real work.
pub struct CaptureHandle<T> {
    pub replaying: bool,
    pub result: Option<T>,
}

impl<T> CaptureHandle<T> {
    pub fn set(&mut self, value: T) {
        self.result = Some(value);
    }
}

/// Runs `body` under the capture primitive's record/replay semantics,
/// keyed by `label`.
pub fn capture<T, F>(label: &str, body: F) -> Result<T, CaptureError>
where
    F: FnOnce(&mut CaptureHandle<T>),
    T: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    let ctx = sim_context::current();
    match ctx.mode() {
        Mode::Off => run_inert(label, body),
        Mode::Record => record(&ctx, label, body),
        Mode::Replay => replay(&ctx, label, body),
    }
}

fn run_inert<T, F>(label: &str, body: F) -> Result<T, CaptureError>
where
    F: FnOnce(&mut CaptureHandle<T>),
{
    let mut handle = CaptureHandle { replaying: false, result: None };
    body(&mut handle);
    handle.result.ok_or_else(|| CaptureError::ResultNotSet { label: label.to_string() })
}

fn record<T, F>(ctx: &Context, label: &str, body: F) -> Result<T, CaptureError>
where
    F: FnOnce(&mut CaptureHandle<T>),
    T: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    let ordinal = ctx.next_ordinal(&format!("capture:{label}"));
    let mut handle = CaptureHandle { replaying: false, result: None };
    body(&mut handle);

    let Some(value) = handle.result else {
        tracing::warn!(label, ordinal, "capture block exited without a result; nothing persisted");
        return Err(CaptureError::ResultNotSet { label: label.to_string() });
    };

    let output = serde_json::to_value(&value).unwrap_or(serde_json::Value::Null);
    if let Some(store_root) = ctx.store_root() {
        let fixture = CaptureFixture {
            label: label.to_string(),
            ordinal,
            result: output.clone(),
            recorded_at: sim_context::clock::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
        };
        let path = paths::capture_path(&store_root, label, ordinal);
        emit(ctx, path, &fixture);
    }

    ctx.push_stub(StubDescriptor::Capture {
        label: label.to_string(),
        ordinal,
        output,
        source: Source::Record,
    });

    Ok(value)
}

fn replay<T, F>(ctx: &Context, label: &str, body: F) -> Result<T, CaptureError>
where
    F: FnOnce(&mut CaptureHandle<T>),
    T: serde::Serialize + serde::de::DeserializeOwned + Clone,
{
    let ordinal = ctx.next_ordinal(&format!("capture:{label}"));
    let store_root = ctx.store_root().unwrap_or_default();
    let path = paths::capture_path(&store_root, label, ordinal);

    let lookup: Result<CaptureFixture, ReadFixtureError> = read_fixture(&path, || StubMissError {
        qualname: format!("capture:{label}"),
        fingerprint: String::new(),
        ordinal,
        expected_path: path.clone(),
    });

    let fixture = match lookup {
        Ok(fixture) => fixture,
        Err(ReadFixtureError::Miss(miss)) => return Err(CaptureError::StubMiss(miss)),
        Err(other) => {
            tracing::error!(error = %other, path = %path.display(), "capture fixture read failed");
            return Err(CaptureError::StubMiss(StubMissError {
                qualname: format!("capture:{label}"),
                fingerprint: String::new(),
                ordinal,
                expected_path: path,
            }));
        }
    };

    let value: T = serde_json::from_value(fixture.result.clone())
        .map_err(|_| CaptureError::ResultNotSet { label: label.to_string() })?;

    let mut handle = CaptureHandle { replaying: true, result: Some(value.clone()) };
    body(&mut handle);

    ctx.push_stub(StubDescriptor::Capture {
        label: label.to_string(),
        ordinal,
        output: fixture.result,
        source: Source::Replay,
    });

    Ok(handle.result.unwrap_or(value))
}

fn emit(ctx: &Context, path: std::path::PathBuf, fixture: &CaptureFixture) {
    let sink: Arc<dyn Sink> = ctx.sink().unwrap_or_else(|| Arc::new(sim_fixture::DirectStore));
    match SinkEvent::new(path, fixture) {
        Ok(event) => sink.emit(event),
        Err(err) => tracing::error!(error = %err, "failed to serialize capture fixture"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_context::Context as Ctx;

    #[test]
    fn off_mode_returns_value_set_by_caller() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Ctx::new(Mode::Off, "run1".into(), Some(dir.path().to_path_buf()));
        let _guard = sim_context::set_thread_context(ctx);

        let result = capture::<i64, _>("checkout.total", |h| h.set(42));
        assert_eq!(result.unwrap(), 42);
        assert!(!dir.path().join("__capture__").exists());
    }

    #[test]
    fn off_mode_without_set_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Ctx::new(Mode::Off, "run1".into(), Some(dir.path().to_path_buf()));
        let _guard = sim_context::set_thread_context(ctx);

        let result = capture::<i64, _>("checkout.total", |_h| {});
        assert!(matches!(result, Err(CaptureError::ResultNotSet { .. })));
    }

    #[test]
    fn record_then_replay_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let record_ctx = Ctx::new(Mode::Record, "run1".into(), Some(dir.path().to_path_buf()));
        {
            let _guard = sim_context::set_thread_context(record_ctx);
            let out = capture::<i64, _>("checkout.total", |h| h.set(42));
            assert_eq!(out.unwrap(), 42);
        }

        assert!(dir.path().join("__capture__").join("checkout_total_0.json").exists());

        let replay_ctx = Ctx::new(Mode::Replay, "run1".into(), Some(dir.path().to_path_buf()));
        let _guard = sim_context::set_thread_context(replay_ctx);
        let out = capture::<i64, _>("checkout.total", |h| {
            assert!(h.replaying);
            assert_eq!(h.result, Some(42));
        });
        assert_eq!(out.unwrap(), 42);
    }

    #[test]
    fn replay_missing_fixture_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Ctx::new(Mode::Replay, "run1".into(), Some(dir.path().to_path_buf()));
        let _guard = sim_context::set_thread_context(ctx);
        let out = capture::<i64, _>("never.recorded", |_h| {});
        assert!(matches!(out, Err(CaptureError::StubMiss(_))));
    }

    #[test]
    fn ordinal_separates_repeated_labels() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = Ctx::new(Mode::Record, "run1".into(), Some(dir.path().to_path_buf()));
        let _guard = sim_context::set_thread_context(ctx);
        capture::<i64, _>("checkout.total", |h| h.set(1)).unwrap();
        capture::<i64, _>("checkout.total", |h| h.set(2)).unwrap();
        assert!(dir.path().join("__capture__").join("checkout_total_0.json").exists());
        assert!(dir.path().join("__capture__").join("checkout_total_1.json").exists());
    }
}
