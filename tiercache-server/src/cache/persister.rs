//! Write-behind persister for the L2 tier
//!
//! A single background task drains one queue of disk operations, so they are
//! applied in the order they were enqueued. Callers never wait. Pending
//! writes are bounded: once `queue_capacity` writes are outstanding further
//! writes are dropped. Removals and sweeps are never dropped, so a deleted or
//! cleared key cannot be left behind on disk. Every failure is logged, counted
//! and reported to the optional hook, but never returned to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::compression::Compressor;
use crate::core::{CacheEntry, CacheError, Result};
use crate::metrics;

/// On-disk record: the entry plus the original key, which the sanitized
/// file name cannot recover
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedEntry {
    pub key: String,
    pub entry: CacheEntry,
}

/// Outcome of a background disk operation, delivered to the hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistEvent {
    Written { path: PathBuf, bytes: usize },
    Removed { path: PathBuf },
    Swept { directory: PathBuf, files: usize },
    Failed { operation: &'static str, path: PathBuf, error: String },
    Dropped { operation: &'static str, path: PathBuf },
}

/// Observability callback invoked from the background task
pub type PersistHook = Arc<dyn Fn(&PersistEvent) + Send + Sync>;

enum PersistOp {
    Write { path: PathBuf, record: PersistedEntry },
    Remove { path: PathBuf },
    Sweep { directory: PathBuf },
    Flush(oneshot::Sender<()>),
}

impl PersistOp {
    fn name(&self) -> &'static str {
        match self {
            Self::Write { .. } => "write",
            Self::Remove { .. } => "remove",
            Self::Sweep { .. } => "sweep",
            Self::Flush(_) => "flush",
        }
    }

    fn path(&self) -> PathBuf {
        match self {
            Self::Write { path, .. } | Self::Remove { path } => path.clone(),
            Self::Sweep { directory } => directory.clone(),
            Self::Flush(_) => PathBuf::new(),
        }
    }
}

/// Handle to the background write-behind task
#[derive(Clone)]
pub struct Persister {
    tx: mpsc::UnboundedSender<PersistOp>,
    pending_writes: Arc<AtomicUsize>,
    queue_capacity: usize,
    hook: Option<PersistHook>,
}

impl fmt::Debug for Persister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Persister")
            .field("queue_capacity", &self.queue_capacity)
            .field("pending_writes", &self.pending_writes.load(Ordering::Relaxed))
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

impl Persister {
    /// Spawn the background task. Must be called inside a tokio runtime.
    pub fn spawn(compressor: Compressor, queue_capacity: usize, hook: Option<PersistHook>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending_writes = Arc::new(AtomicUsize::new(0));
        tokio::spawn(Self::worker_loop(
            rx,
            compressor,
            Arc::clone(&pending_writes),
            hook.clone(),
        ));
        Self {
            tx,
            pending_writes,
            queue_capacity: queue_capacity.max(1),
            hook,
        }
    }

    /// Writes queued but not yet applied
    pub fn pending_writes(&self) -> usize {
        self.pending_writes.load(Ordering::Acquire)
    }

    /// Queue a serialized write of `entry` to `path`. Dropped when
    /// `queue_capacity` writes are already pending.
    pub fn write(&self, path: PathBuf, key: &str, entry: CacheEntry) {
        let reserved = self
            .pending_writes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.queue_capacity).then_some(n + 1)
            })
            .is_ok();
        if !reserved {
            self.report_dropped("write", path);
            return;
        }

        let record = PersistedEntry {
            key: key.to_string(),
            entry,
        };
        if !self.enqueue(PersistOp::Write { path, record }) {
            self.pending_writes.fetch_sub(1, Ordering::AcqRel);
        }
    }

    /// Queue a file removal; never dropped while the worker is alive
    pub fn remove(&self, path: PathBuf) {
        self.enqueue(PersistOp::Remove { path });
    }

    /// Queue a removal of every file in `directory`; never dropped while the
    /// worker is alive
    pub fn sweep(&self, directory: PathBuf) {
        self.enqueue(PersistOp::Sweep { directory });
    }

    /// Wait until every operation queued before this call has been applied
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(PersistOp::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }

    /// Send to the worker; false if it has stopped
    fn enqueue(&self, op: PersistOp) -> bool {
        match self.tx.send(op) {
            Ok(()) => true,
            Err(mpsc::error::SendError(op)) => {
                self.report_dropped(op.name(), op.path());
                false
            }
        }
    }

    fn report_dropped(&self, operation: &'static str, path: PathBuf) {
        warn!("L2 persist queue unavailable, dropping {} {:?}", operation, path);
        metrics::record_persist_op(operation, "dropped");
        notify(&self.hook, &PersistEvent::Dropped { operation, path });
    }

    async fn worker_loop(
        mut rx: mpsc::UnboundedReceiver<PersistOp>,
        compressor: Compressor,
        pending_writes: Arc<AtomicUsize>,
        hook: Option<PersistHook>,
    ) {
        while let Some(op) = rx.recv().await {
            let event = match op {
                PersistOp::Write { path, record } => {
                    let event = write_entry(&compressor, &path, &record).await;
                    pending_writes.fetch_sub(1, Ordering::AcqRel);
                    event
                }
                PersistOp::Remove { path } => remove_file(&path).await,
                PersistOp::Sweep { directory } => sweep_directory(&directory).await,
                PersistOp::Flush(done) => {
                    let _ = done.send(());
                    continue;
                }
            };

            match &event {
                PersistEvent::Failed {
                    operation,
                    path,
                    error,
                } => {
                    warn!("L2 {} failed for {:?}: {}", operation, path, error);
                    metrics::record_persist_op(operation, "error");
                }
                PersistEvent::Written { path, bytes } => {
                    debug!("L2 persisted {:?} ({} bytes)", path, bytes);
                    metrics::record_persist_op("write", "ok");
                }
                PersistEvent::Removed { .. } => metrics::record_persist_op("remove", "ok"),
                PersistEvent::Swept { directory, files } => {
                    debug!("L2 swept {} files from {:?}", files, directory);
                    metrics::record_persist_op("sweep", "ok");
                }
                PersistEvent::Dropped { .. } => {}
            }
            notify(&hook, &event);
        }

        debug!("L2 persister stopped");
    }
}

fn notify(hook: &Option<PersistHook>, event: &PersistEvent) {
    if let Some(hook) = hook {
        hook(event);
    }
}

/// Serialize a record to JSON and compress it if enabled
pub fn encode_blob(compressor: &Compressor, record: &PersistedEntry) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(record)?;
    compressor
        .compress(&json)
        .map_err(|e| CacheError::Compression(e.to_string()))
}

/// Inverse of [`encode_blob`]
pub fn decode_blob(compressor: &Compressor, blob: &[u8]) -> Result<PersistedEntry> {
    let json = compressor
        .decompress(blob)
        .map_err(|e| CacheError::Compression(e.to_string()))?;
    Ok(serde_json::from_slice(&json)?)
}

async fn write_entry(compressor: &Compressor, path: &Path, record: &PersistedEntry) -> PersistEvent {
    let result = match encode_blob(compressor, record) {
        Ok(blob) => tokio::fs::write(path, &blob)
            .await
            .map(|_| blob.len())
            .map_err(CacheError::from),
        Err(e) => Err(e),
    };

    match result {
        Ok(bytes) => PersistEvent::Written {
            path: path.to_path_buf(),
            bytes,
        },
        Err(e) => PersistEvent::Failed {
            operation: "write",
            path: path.to_path_buf(),
            error: e.to_string(),
        },
    }
}

async fn remove_file(path: &Path) -> PersistEvent {
    match tokio::fs::remove_file(path).await {
        Ok(()) => PersistEvent::Removed {
            path: path.to_path_buf(),
        },
        // Never written (dropped, failed or not yet persisted)
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => PersistEvent::Removed {
            path: path.to_path_buf(),
        },
        Err(e) => PersistEvent::Failed {
            operation: "remove",
            path: path.to_path_buf(),
            error: e.to_string(),
        },
    }
}

async fn sweep_directory(directory: &Path) -> PersistEvent {
    let mut entries = match tokio::fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return PersistEvent::Swept {
                directory: directory.to_path_buf(),
                files: 0,
            };
        }
        Err(e) => {
            return PersistEvent::Failed {
                operation: "sweep",
                path: directory.to_path_buf(),
                error: e.to_string(),
            };
        }
    };

    let mut files = 0;
    loop {
        let entry = match entries.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("L2 sweep stopped early in {:?}: {}", directory, e);
                break;
            }
        };

        let is_file = entry
            .file_type()
            .await
            .map(|t| t.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }

        match tokio::fs::remove_file(entry.path()).await {
            Ok(()) => files += 1,
            Err(e) => warn!("L2 sweep could not remove {:?}: {}", entry.path(), e),
        }
    }

    PersistEvent::Swept {
        directory: directory.to_path_buf(),
        files,
    }
}
