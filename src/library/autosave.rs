//! Debounced library autosave
//!
//! `schedule` replaces the pending snapshot and restarts the quiet period;
//! only the newest snapshot is written (last writer wins). `flush` writes the
//! pending snapshot immediately.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::store::KeyValueStore;
use crate::course::Course;
use crate::models::AppError;

#[derive(Clone, Default)]
struct Pending {
    generation: u64,
    courses: Arc<Vec<Course>>,
}

struct Writer {
    store: Arc<dyn KeyValueStore>,
    key: String,
    written: AtomicU64,
    lock: Mutex<()>,
}

impl Writer {
    /// Persist the newest snapshot unless it is already on disk.
    async fn persist(&self, rx: &watch::Receiver<Pending>) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        let pending = rx.borrow().clone();
        if pending.generation <= self.written.load(Ordering::SeqCst) {
            return Ok(());
        }
        let json = serde_json::to_string(pending.courses.as_ref())?;
        self.store.save(&self.key, &json)?;
        self.written.store(pending.generation, Ordering::SeqCst);
        debug!(
            "[Library] autosaved {} courses (generation {})",
            pending.courses.len(),
            pending.generation
        );
        Ok(())
    }
}

pub struct Autosave {
    tx: watch::Sender<Pending>,
    rx: watch::Receiver<Pending>,
    writer: Arc<Writer>,
    worker: JoinHandle<()>,
}

impl Autosave {
    /// Start the background writer. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn KeyValueStore>, key: impl Into<String>, debounce: Duration) -> Self {
        let (tx, rx) = watch::channel(Pending::default());
        let writer = Arc::new(Writer {
            store,
            key: key.into(),
            written: AtomicU64::new(0),
            lock: Mutex::new(()),
        });
        let worker = tokio::spawn(run_worker(rx.clone(), writer.clone(), debounce));
        Self {
            tx,
            rx,
            writer,
            worker,
        }
    }

    pub fn schedule(&self, courses: Vec<Course>) {
        self.tx.send_modify(|pending| {
            pending.generation += 1;
            pending.courses = Arc::new(courses);
        });
    }

    pub fn has_pending(&self) -> bool {
        self.rx.borrow().generation > self.writer.written.load(Ordering::SeqCst)
    }

    pub async fn flush(&self) -> Result<(), AppError> {
        self.writer.persist(&self.rx).await
    }

    /// Flush and stop the background writer.
    pub async fn shutdown(self) -> Result<(), AppError> {
        let result = self.flush().await;
        self.worker.abort();
        result
    }

    /// Shut down, then hand back `outcome`. The pending snapshot is written
    /// even when `outcome` is an error; that error takes precedence.
    pub async fn finish<T>(self, outcome: Result<T, AppError>) -> Result<T, AppError> {
        let flushed = self.shutdown().await;
        if let (Err(e), Err(_)) = (&flushed, &outcome) {
            warn!("[Library] final autosave failed: {}", e);
        }
        let value = outcome?;
        flushed?;
        Ok(value)
    }
}

async fn run_worker(mut rx: watch::Receiver<Pending>, writer: Arc<Writer>, debounce: Duration) {
    loop {
        if rx.changed().await.is_err() {
            return;
        }
        // quiet period, restarted by every new snapshot
        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                _ = tokio::time::sleep(debounce) => break,
            }
        }
        if let Err(e) = writer.persist(&rx).await {
            warn!("[Library] autosave failed: {}", e);
        }
    }
}
