mod local_dir;
mod store;

pub use local_dir::LocalDirRemoteStore;
pub use store::{RemoteStore, RemoteStoreError};

use crate::local::BufferedSink;
use sim_fixture::{Sink, SinkEvent};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Composes a local [`BufferedSink`] with a background upload worker (spec
/// §4.4 "Remote tier"). `emit` always goes to the local sink first; the
/// worker scans the local store root and copies completed fixture files to
/// the remote store in batches, retrying on failure with the local file
/// left in place until the upload succeeds.
pub struct RemoteSink {
    local: Arc<BufferedSink>,
    store_root: PathBuf,
    worker: Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<tokio::sync::Notify>,
    closed: Arc<std::sync::atomic::AtomicBool>,
}

impl RemoteSink {
    pub fn new(
        local: Arc<BufferedSink>,
        store_root: PathBuf,
        remote: Arc<dyn RemoteStore>,
        scan_interval: Duration,
    ) -> Arc<RemoteSink> {
        let shutdown = Arc::new(tokio::sync::Notify::new());
        let closed = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let worker_root = store_root.clone();
        let worker_shutdown = shutdown.clone();
        let worker_closed = closed.clone();
        let handle = tokio::spawn(async move {
            upload_loop(worker_root, remote, scan_interval, worker_shutdown, worker_closed).await;
        });

        Arc::new(RemoteSink {
            local,
            store_root,
            worker: Mutex::new(Some(handle)),
            shutdown,
            closed,
        })
    }

    pub async fn flush(&self) {
        self.local.flush().await;
    }

    /// Drains pending uploads within `timeout`, then stops the worker.
    pub async fn close(&self, timeout: Duration) {
        self.local.close().await;
        self.closed.store(true, std::sync::atomic::Ordering::Release);
        self.shutdown.notify_one();
        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = tokio::time::timeout(timeout, handle).await;
        }
    }
}

impl Sink for RemoteSink {
    fn emit(&self, event: SinkEvent) {
        self.local.emit(event);
    }
}

async fn upload_loop(
    store_root: PathBuf,
    remote: Arc<dyn RemoteStore>,
    scan_interval: Duration,
    shutdown: Arc<tokio::sync::Notify>,
    closed: Arc<std::sync::atomic::AtomicBool>,
) {
    let mut uploaded: HashSet<String> = match remote.list().await {
        Ok(keys) => keys.into_iter().collect(),
        Err(err) => {
            tracing::warn!(error = %err, "failed to list remote store at startup");
            HashSet::new()
        }
    };

    loop {
        tokio::select! {
            _ = tokio::time::sleep(scan_interval) => {}
            _ = shutdown.notified() => {}
        }

        let pending = scan_pending(&store_root, &uploaded).await;
        for (key, path) in pending {
            match remote.put(&key, &path).await {
                Ok(()) => {
                    uploaded.insert(key);
                }
                Err(err) => {
                    // Left in the local store; re-enqueued by being
                    // rediscovered on the next scan.
                    tracing::warn!(error = %err, key, "fixture upload failed, will retry");
                }
            }
        }

        if closed.load(std::sync::atomic::Ordering::Acquire) {
            return;
        }
    }
}

async fn scan_pending(store_root: &std::path::Path, uploaded: &HashSet<String>) -> Vec<(String, PathBuf)> {
    let root = store_root.to_path_buf();
    let all = tokio::task::spawn_blocking(move || {
        walkdir::WalkDir::new(&root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(&root)
                    .ok()
                    .map(|rel| (rel.to_string_lossy().replace('\\', "/"), e.path().to_path_buf()))
            })
            .collect::<Vec<_>>()
    })
    .await
    .unwrap_or_default();

    all.into_iter().filter(|(key, _)| !uploaded.contains(key)).collect()
}
