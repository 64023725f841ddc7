use crate::config::{DropPolicy, SinkConfig};
use sim_fixture::{write_atomic, Sink, SinkEvent};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

struct State {
    buffer: Mutex<VecDeque<SinkEvent>>,
    buffer_bytes: AtomicUsize,
    config: SinkConfig,
    dropped_count: AtomicU64,
    emitted_seq: AtomicU64,
    durable_seq: AtomicU64,
    data_notify: Notify,
    drained_notify: Notify,
    closed: AtomicBool,
}

/// The local tier of the sink (spec C4): a bounded in-memory buffer guarded
/// by a single lock whose hold time is O(1), drained by one background
/// worker that performs the actual (atomic, write-then-rename) file I/O.
///
/// `emit` never blocks on storage latency. When a drop policy triggers, the
/// oldest/newest/a random buffered event is discarded and `dropped_count`
/// increments; the producer is never blocked waiting for room.
pub struct BufferedSink {
    state: Arc<State>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl BufferedSink {
    pub fn new(config: SinkConfig) -> Arc<BufferedSink> {
        let state = Arc::new(State {
            buffer: Mutex::new(VecDeque::new()),
            buffer_bytes: AtomicUsize::new(0),
            config,
            dropped_count: AtomicU64::new(0),
            emitted_seq: AtomicU64::new(0),
            durable_seq: AtomicU64::new(0),
            data_notify: Notify::new(),
            drained_notify: Notify::new(),
            closed: AtomicBool::new(false),
        });

        let worker_state = state.clone();
        let handle = tokio::spawn(async move { run_worker(worker_state).await });

        Arc::new(BufferedSink {
            state,
            worker: std::sync::Mutex::new(Some(handle)),
        })
    }

    pub fn dropped_count(&self) -> u64 {
        self.state.dropped_count.load(Ordering::Relaxed)
    }

    pub fn buffer_fill_bytes(&self) -> usize {
        self.state.buffer_bytes.load(Ordering::Relaxed)
    }

    pub fn buffer_fill_events(&self) -> usize {
        self.state.buffer.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Blocks until every event accepted before this call is durable.
    pub async fn flush(&self) {
        flush_to(&self.state, self.state.emitted_seq.load(Ordering::Acquire)).await;
    }

    /// Implies `flush()`, then stops the background worker.
    pub async fn close(&self) {
        self.flush().await;
        self.state.closed.store(true, Ordering::Release);
        self.state.data_notify.notify_one();
        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl Sink for BufferedSink {
    fn emit(&self, event: SinkEvent) {
        let event_len = event.payload.len();
        let mut buf = self.state.buffer.lock().unwrap_or_else(|e| e.into_inner());

        while (self.state.buffer_bytes.load(Ordering::Relaxed) + event_len
            > self.state.config.buffer_bytes_ceiling
            || buf.len() >= self.state.config.max_events)
            && !buf.is_empty()
        {
            let dropped = match self.state.config.drop_policy {
                DropPolicy::DropOldest => buf.pop_front(),
                DropPolicy::DropNewest => buf.pop_back(),
                DropPolicy::DropRandom => {
                    let idx = rand::random::<usize>() % buf.len();
                    buf.remove(idx)
                }
            };
            if let Some(dropped) = dropped {
                self.state
                    .buffer_bytes
                    .fetch_sub(dropped.payload.len(), Ordering::Relaxed);
                self.state.dropped_count.fetch_add(1, Ordering::Relaxed);
            }
        }

        if self.state.buffer_bytes.load(Ordering::Relaxed) + event_len
            > self.state.config.buffer_bytes_ceiling
        {
            // Buffer is empty but the single incoming event still doesn't
            // fit the ceiling: drop it rather than violate the ceiling.
            self.state.dropped_count.fetch_add(1, Ordering::Relaxed);
            return;
        }

        self.state.buffer_bytes.fetch_add(event_len, Ordering::Relaxed);
        buf.push_back(event);
        self.state.emitted_seq.fetch_add(1, Ordering::Release);
        let batch_reached = self.state.config.batch_size > 0
            && buf.len() % self.state.config.batch_size == 0;
        let batch = batch_reached.then(|| std::mem::take(&mut *buf));
        drop(buf);

        self.state.data_notify.notify_one();

        if let Some(batch) = batch {
            // Flushes synchronously within the producer, per spec §4.4:
            // "the sink flushes synchronously within the producer if
            // reached exactly at `emit`".
            persist_batch(&self.state, batch);
        }
    }
}

async fn run_worker(state: Arc<State>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(state.config.flush_interval) => {}
            _ = state.data_notify.notified() => {}
        }

        let batch = {
            let mut buf = state.buffer.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *buf)
        };
        if !batch.is_empty() {
            persist_batch(&state, batch);
        } else if state.closed.load(Ordering::Acquire) {
            return;
        }
    }
}

fn persist_batch(state: &Arc<State>, batch: VecDeque<SinkEvent>) {
    let count = batch.len() as u64;
    for event in batch {
        state
            .buffer_bytes
            .fetch_sub(event.payload.len(), Ordering::Relaxed);
        if let Err(err) = write_atomic(&event.path, &event.payload) {
            tracing::warn!(path = %event.path.display(), error = %err, "fixture persistence failed");
        }
    }
    state.durable_seq.fetch_add(count, Ordering::Release);
    state.drained_notify.notify_waiters();
}

async fn flush_to(state: &Arc<State>, target: u64) {
    loop {
        if state.durable_seq.load(Ordering::Acquire) >= target {
            return;
        }
        let notified = state.drained_notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if state.durable_seq.load(Ordering::Acquire) >= target {
            return;
        }
        state.data_notify.notify_one();
        notified.await;
    }
}
