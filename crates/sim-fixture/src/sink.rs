use std::path::PathBuf;

/// A single unit of persistence work: write `payload` (pre-serialized,
/// 2-space-indented UTF-8 JSON) to `path`.
///
/// Keeping this generic over the concrete fixture shape is what lets
/// [`Sink`] live beside the fixture value types (C3) while its concrete
/// implementations (C4, in `sim-sink`) stay decoupled from `sim-context`
/// and the primitive crates: nobody but the emitting primitive needs to
/// know whether a given event is a trace, capture, or db fixture.
#[derive(Debug, Clone)]
pub struct SinkEvent {
    pub path: PathBuf,
    pub payload: Vec<u8>,
}

impl SinkEvent {
    pub fn new(path: PathBuf, value: &impl serde::Serialize) -> serde_json::Result<Self> {
        let payload = serde_json::to_vec_pretty(value)?;
        Ok(SinkEvent { path, payload })
    }
}

/// The persistence boundary primitives write through (spec C4). Concrete,
/// buffered implementations live in `sim-sink`; this crate only owns the
/// trait so that `sim-context` and the primitive crates can depend on the
/// contract without depending on the buffering machinery itself.
pub trait Sink: Send + Sync {
    /// Must return in bounded time independent of storage latency.
    fn emit(&self, event: SinkEvent);
}

/// The primitives' fallback when a [`Context`](crate) carries no sink:
/// writes straight to the store, atomically (stage then rename), with no
/// buffering. Used directly by tests and by `off`/minimal deployments.
#[derive(Debug, Default)]
pub struct DirectStore;

impl Sink for DirectStore {
    fn emit(&self, event: SinkEvent) {
        if let Err(err) = write_atomic(&event.path, &event.payload) {
            tracing::warn!(path = %event.path.display(), error = %err, "direct fixture write failed");
        }
    }
}

/// Writes `bytes` to `path` by first writing a staging file in the same
/// directory, then renaming it into place, so a reader never observes a
/// partially-written fixture file.
pub fn write_atomic(path: &std::path::Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "fixture path has no parent")
    })?;
    std::fs::create_dir_all(dir)?;

    let mut staging = dir.join(format!(
        ".{}.staging-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("fixture"),
        std::process::id()
    ));
    // Extremely unlikely collision guard: two writers in the same process
    // racing the identical path within the same instant.
    while staging.exists() {
        staging.set_extension("retry");
    }

    std::fs::write(&staging, bytes)?;
    std::fs::rename(&staging, path)?;
    Ok(())
}

/// Reads and deserializes a fixture file, mapping a missing file to the
/// `miss` closure's `StubMissError` rather than a generic I/O error — the
/// shape every primitive's replay-mode lookup needs (spec §4.5-§4.7).
pub fn read_fixture<T: serde::de::DeserializeOwned>(
    path: &std::path::Path,
    miss: impl FnOnce() -> crate::StubMissError,
) -> Result<T, ReadFixtureError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ReadFixtureError::Miss(miss()))
        }
        Err(err) => return Err(ReadFixtureError::Io(err)),
    };
    serde_json::from_slice(&bytes).map_err(ReadFixtureError::Decode)
}

#[derive(Debug, thiserror::Error)]
pub enum ReadFixtureError {
    #[error(transparent)]
    Miss(#[from] crate::StubMissError),
    #[error("failed to read fixture file: {0}")]
    Io(#[source] std::io::Error),
    #[error("failed to decode fixture file: {0}")]
    Decode(#[source] serde_json::Error),
}
