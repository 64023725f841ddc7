//! The fetcher (spec component C8): materializes a fixture set for a given
//! `(service, endpoint)` from a pluggable source into a local cache
//! directory, then loads every fixture directory found there into memory.

use sim_fixture::{FixtureSet, GoldenOutputFile, InputFile, MetadataFile, StubsFile};
use sim_sink::{RemoteStore, RemoteStoreError};
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("local source copy failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("remote store error: {0}")]
    Remote(#[from] RemoteStoreError),
}

/// Where a fetcher pulls fixtures from before they land in the local cache.
#[async_trait::async_trait]
pub trait FixtureSource: Send + Sync {
    /// Populates `cache_dir` with every file under `{service}/{endpoint}`.
    async fn materialize(&self, service: &str, endpoint: &str, cache_dir: &Path) -> Result<(), FetchError>;
}

/// Copies fixtures from a directory already on local disk — the common case
/// in development and CI where fixtures are checked in or mounted.
pub struct LocalDirSource {
    root: PathBuf,
}

impl LocalDirSource {
    pub fn new(root: impl Into<PathBuf>) -> LocalDirSource {
        LocalDirSource { root: root.into() }
    }
}

#[async_trait::async_trait]
impl FixtureSource for LocalDirSource {
    async fn materialize(&self, service: &str, endpoint: &str, cache_dir: &Path) -> Result<(), FetchError> {
        let src = self.root.join(sim_fixture::paths::sanitize(service)).join(sim_fixture::paths::sanitize(endpoint));
        if !src.exists() {
            tracing::warn!(service, endpoint, path = %src.display(), "no local fixtures for endpoint");
            return Ok(());
        }
        copy_dir_recursive(&src, cache_dir)
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<(), FetchError> {
    std::fs::create_dir_all(dst)?;
    for entry in walkdir::WalkDir::new(src).min_depth(1) {
        let entry = entry.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        let rel = entry.path().strip_prefix(src).expect("walkdir yields paths under src");
        let target = dst.join(rel);
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// Lists and downloads fixtures from a durable remote store — the same
/// [`RemoteStore`] contract `sim-sink` uses to upload them.
pub struct RemoteSource<R: RemoteStore> {
    store: R,
}

impl<R: RemoteStore> RemoteSource<R> {
    pub fn new(store: R) -> RemoteSource<R> {
        RemoteSource { store }
    }
}

#[async_trait::async_trait]
impl<R: RemoteStore> FixtureSource for RemoteSource<R> {
    async fn materialize(&self, service: &str, endpoint: &str, cache_dir: &Path) -> Result<(), FetchError> {
        let prefix = format!("{}/{}/", sim_fixture::paths::sanitize(service), sim_fixture::paths::sanitize(endpoint));
        let keys = self.store.list().await?;
        for key in keys.iter().filter(|k| k.starts_with(&prefix)) {
            let rel = &key[prefix.len()..];
            let local_path = cache_dir.join(rel);
            if let Some(parent) = local_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            if let Err(err) = self.store.get(key, &local_path).await {
                tracing::warn!(key, error = %err, "failed to download fixture file; skipping");
            }
        }
        Ok(())
    }
}

/// Materializes and loads fixture sets for a `(service, endpoint)` pair.
pub struct Fetcher<S: FixtureSource> {
    source: S,
    cache_root: PathBuf,
}

impl<S: FixtureSource> Fetcher<S> {
    pub fn new(source: S, cache_root: impl Into<PathBuf>) -> Fetcher<S> {
        Fetcher { source, cache_root: cache_root.into() }
    }

    /// Idempotent: a non-empty cache directory is reused unless
    /// `force_refresh` is set, per spec §4.8.
    pub async fn fetch(&self, service: &str, endpoint: &str, force_refresh: bool) -> Result<Vec<FixtureSet>, FetchError> {
        let cache_dir = self
            .cache_root
            .join(sim_fixture::paths::sanitize(service))
            .join(sim_fixture::paths::sanitize(endpoint));

        let needs_materialize = force_refresh || !dir_has_entries(&cache_dir);
        if needs_materialize {
            if force_refresh && cache_dir.exists() {
                std::fs::remove_dir_all(&cache_dir)?;
            }
            self.source.materialize(service, endpoint, &cache_dir).await?;
        }

        Ok(load_fixture_sets(&cache_dir))
    }
}

fn dir_has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir).map(|mut it| it.next().is_some()).unwrap_or(false)
}

/// Loads every `{fixture_id}/` subdirectory of `cache_dir` into a
/// [`FixtureSet`], skipping (with a warning) any fixture missing one of its
/// four component files rather than aborting the whole load.
fn load_fixture_sets(cache_dir: &Path) -> Vec<FixtureSet> {
    let mut sets = Vec::new();
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return sets;
    };

    for entry in entries.flatten() {
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        let dir = entry.path();
        match load_one(&dir) {
            Ok(set) => sets.push(set),
            Err(missing) => {
                tracing::warn!(fixture_dir = %dir.display(), file = missing, "fixture missing a required file; skipping");
            }
        }
    }
    sets.sort_by(|a, b| a.input.fixture_id.cmp(&b.input.fixture_id));
    sets
}

fn load_one(dir: &Path) -> Result<FixtureSet, &'static str> {
    let input: InputFile = read_json(&dir.join("input.json")).ok_or("input.json")?;
    let golden_output: GoldenOutputFile = read_json(&dir.join("golden_output.json")).ok_or("golden_output.json")?;
    let stubs: StubsFile = read_json(&dir.join("stubs.json")).unwrap_or_default();
    let metadata: MetadataFile = read_json(&dir.join("metadata.json")).ok_or("metadata.json")?;
    Ok(FixtureSet { input, golden_output, stubs, metadata })
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let bytes = std::fs::read(path).ok()?;
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &Path, fixture_id: &str) {
        std::fs::create_dir_all(dir).unwrap();
        std::fs::write(
            dir.join("input.json"),
            serde_json::to_vec(&InputFile {
                fixture_id: fixture_id.into(),
                name: "get_user".into(),
                args: serde_json::json!({"id": 1}),
                fingerprint: "fp".into(),
            })
            .unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join("golden_output.json"),
            serde_json::to_vec(&GoldenOutputFile {
                fixture_id: fixture_id.into(),
                output: serde_json::json!({"status": 200}),
                fingerprint: "fp2".into(),
            })
            .unwrap(),
        )
        .unwrap();
        std::fs::write(
            dir.join("metadata.json"),
            serde_json::to_vec(&MetadataFile {
                fixture_id: fixture_id.into(),
                name: "get_user".into(),
                recorded_at: time::OffsetDateTime::UNIX_EPOCH,
                recording_mode: sim_fixture::Mode::Record,
                run_id: "run1".into(),
                duration_ms: 1.0,
                schema_version: sim_fixture::SCHEMA_VERSION.into(),
            })
            .unwrap(),
        )
        .unwrap();
    }

    #[tokio::test]
    async fn fetch_materializes_from_local_source_and_loads_sets() {
        let source_root = tempfile::tempdir().unwrap();
        write_fixture(&source_root.path().join("users").join("get_user").join("fx1"), "fx1");

        let cache_root = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(LocalDirSource::new(source_root.path()), cache_root.path());

        let sets = fetcher.fetch("users", "get_user", false).await.unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].input.fixture_id, "fx1");
    }

    #[tokio::test]
    async fn fetch_is_idempotent_on_nonempty_cache() {
        let source_root = tempfile::tempdir().unwrap();
        write_fixture(&source_root.path().join("users").join("get_user").join("fx1"), "fx1");

        let cache_root = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(LocalDirSource::new(source_root.path()), cache_root.path());
        fetcher.fetch("users", "get_user", false).await.unwrap();

        // Remove the source after the first fetch; a second non-forced fetch
        // must still succeed by reusing the populated cache.
        std::fs::remove_dir_all(source_root.path()).unwrap();
        let sets = fetcher.fetch("users", "get_user", false).await.unwrap();
        assert_eq!(sets.len(), 1);
    }

    #[tokio::test]
    async fn fetch_skips_fixture_directories_missing_required_files() {
        let source_root = tempfile::tempdir().unwrap();
        let dir = source_root.path().join("users").join("get_user").join("fx_bad");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("input.json"), b"{}").unwrap();

        let cache_root = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new(LocalDirSource::new(source_root.path()), cache_root.path());
        let sets = fetcher.fetch("users", "get_user", false).await.unwrap();
        assert!(sets.is_empty());
    }
}
