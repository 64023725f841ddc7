//! The trace primitive (spec component C5): a function-boundary
//! recorder/replayer. In record mode every call is fingerprinted and
//! persisted as a [`FixtureEvent`](sim_fixture::FixtureEvent); in replay
//! mode the underlying body is never invoked — the call is satisfied
//! entirely from the matching fixture.
//!
//! Rust has no runtime introspection of a function's named parameters, so
//! unlike the reference implementation's decorator, `trace` takes the
//! already-bound input map as an explicit argument: the caller builds a
//! [`sim_canon::Value::Object`] from its own arguments before calling in.

use sim_canon::{fingerprint, fingerprint_prefix, Value};
use sim_context::Context;
use sim_fixture::{paths, read_fixture, FixtureEvent, Mode, ReadFixtureError, Sink, SinkEvent, Source, StubDescriptor, StubMissError};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, thiserror::Error)]
pub enum TraceError<E: std::error::Error + 'static> {
    #[error(transparent)]
    StubMiss(#[from] StubMissError),
    #[error(transparent)]
    Encoding(#[from] sim_canon::EncodingError),
    #[error(transparent)]
    Inner(E),
}

/// Runs `body` under the trace primitive's record/replay semantics,
/// keyed by `qualname` and `input`.
///
/// - **off**: `body` runs unmodified; errors propagate unchanged.
/// - **record**: `body` runs; its result (or error) is persisted as a
///   fixture, then returned/propagated as normal.
/// - **replay**: `body` is never invoked. The recorded output for this
///   `(qualname, input_fingerprint, ordinal)` is returned, or
///   [`TraceError::StubMiss`] if none exists.
pub async fn trace<F, Fut, T, E>(qualname: &str, input: Value, body: F) -> Result<T, TraceError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    T: serde::Serialize + serde::de::DeserializeOwned,
    E: std::error::Error + 'static,
{
    let ctx = sim_context::current();
    match ctx.mode() {
        Mode::Off => body().await.map_err(TraceError::Inner),
        Mode::Record => record(ctx, qualname, input, body).await,
        Mode::Replay => replay(ctx, qualname, input),
    }
}

fn input_fingerprint(qualname: &str, input: &Value) -> String {
    let keyed = Value::object([
        ("qualname".to_string(), Value::String(qualname.to_string())),
        ("args".to_string(), input.clone()),
    ]);
    fingerprint(&keyed)
}

async fn record<F, Fut, T, E>(ctx: Context, qualname: &str, input: Value, body: F) -> Result<T, TraceError<E>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    T: serde::Serialize + serde::de::DeserializeOwned,
    E: std::error::Error + 'static,
{
    let input_fp = input_fingerprint(qualname, &input);
    let ordinal = ctx.next_ordinal(&input_fp);
    let stubs_snapshot = ctx.stubs_len();
    ctx.enter_trace();

    let started = Instant::now();
    let result = body().await;
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    // "finally block": always decrement trace_depth, always drain and
    // attribute inner stubs, always emit a fixture — whether `body`
    // succeeded or errored (spec §4.5 step 6).
    let depth_after = ctx.exit_trace();
    let inner_stubs = ctx.drain_stubs_since(stubs_snapshot);

    let (output_json, output_fp, error_message) = match &result {
        Ok(value) => {
            let json = Value::from_serialize(value)?;
            let fp = fingerprint(&json);
            (Some(serde_json::to_value(value).expect("already validated serializable")), fp, None)
        }
        Err(err) => (None, String::new(), Some(err.to_string())),
    };

    let input_json = canon_value_to_json(&input);
    let event = FixtureEvent {
        fixture_id: sim_context::random_id(),
        qualname: qualname.to_string(),
        run_id: ctx.run_id(),
        recorded_at: sim_context::clock::now_utc(),
        input: input_json,
        input_fingerprint: input_fp.clone(),
        output: output_json.clone(),
        output_fingerprint: output_fp,
        stubs: inner_stubs,
        ordinal,
        duration_ms,
        error: error_message,
    };

    if let Some(store_root) = ctx.store_root() {
        let fp16 = fingerprint_prefix(&input_fp, 16).to_string();
        let path = paths::trace_path(&store_root, qualname, &fp16, ordinal);
        emit_event(&ctx, path, &event);
    }

    if depth_after > 0 {
        if let Ok(value) = &result {
            ctx.push_stub(StubDescriptor::Trace {
                qualname: qualname.to_string(),
                ordinal,
                output: serde_json::to_value(value).unwrap_or(serde_json::Value::Null),
                source: Source::Record,
            });
        }
    }

    result.map_err(TraceError::Inner)
}

fn replay<T, E>(ctx: Context, qualname: &str, input: Value) -> Result<T, TraceError<E>>
where
    T: serde::de::DeserializeOwned + serde::Serialize,
    E: std::error::Error + 'static,
{
    let input_fp = input_fingerprint(qualname, &input);
    let ordinal = ctx.next_ordinal(&input_fp);
    let stubs_snapshot = ctx.stubs_len();
    ctx.enter_trace();

    let store_root = ctx.store_root().unwrap_or_default();
    let fp16 = fingerprint_prefix(&input_fp, 16).to_string();
    let path = paths::trace_path(&store_root, qualname, &fp16, ordinal);

    let lookup: Result<FixtureEvent, ReadFixtureError> = read_fixture(&path, || StubMissError {
        qualname: qualname.to_string(),
        fingerprint: input_fp.clone(),
        ordinal,
        expected_path: path.clone(),
    });

    let depth_after = ctx.exit_trace();
    let _ = ctx.drain_stubs_since(stubs_snapshot);

    let event = match lookup {
        Ok(event) => event,
        Err(ReadFixtureError::Miss(miss)) => return Err(TraceError::StubMiss(miss)),
        Err(other) => {
            tracing::error!(error = %other, path = %path.display(), "fixture read failed");
            return Err(TraceError::StubMiss(StubMissError {
                qualname: qualname.to_string(),
                fingerprint: input_fp,
                ordinal,
                expected_path: path,
            }));
        }
    };

    let output = event.output.clone().unwrap_or(serde_json::Value::Null);
    let value: T = serde_json::from_value(output.clone())
        .map_err(|err| sim_canon::EncodingError::NonSerializable {
            type_name: std::any::type_name::<T>().to_string(),
            source: err,
        })?;

    if depth_after > 0 {
        ctx.push_stub(StubDescriptor::Trace {
            qualname: qualname.to_string(),
            ordinal,
            output,
            source: Source::Replay,
        });
    }

    Ok(value)
}

fn canon_value_to_json(value: &Value) -> serde_json::Value {
    serde_json::from_slice(&sim_canon::canonicalize(value)).unwrap_or(serde_json::Value::Null)
}

fn emit_event(ctx: &Context, path: std::path::PathBuf, event: &FixtureEvent) {
    let sink: Arc<dyn Sink> = ctx.sink().unwrap_or_else(|| Arc::new(sim_fixture::DirectStore));
    match SinkEvent::new(path, event) {
        Ok(sink_event) => sink.emit(sink_event),
        Err(err) => tracing::error!(error = %err, "failed to serialize trace fixture"),
    }
}
