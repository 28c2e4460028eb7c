//! Offline scan queue: a client-resident durable buffer.
//!
//! Scans captured while disconnected land in an ordered JSON file and are
//! replayed FIFO against the scan ingestion endpoint once connectivity
//! returns. Each record is retried independently across flushes, but the
//! queue order never changes: scan order per package is semantically
//! meaningful under last-write-wins status projection.

mod http;


pub use http::HttpScanSink;

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::interfaces::ScanSink;
use crate::model::{QueueItemStatus, QueuedScan, ScanType};

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors from the local queue itself. Upstream failures are not errors
/// here; they just leave records queued.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("queue file I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("queue file corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// A scan to capture while offline.
#[derive(Debug, Clone)]
pub struct CaptureScan {
    pub code: String,
    pub scan_type: ScanType,
    pub location: Option<String>,
    pub operator_id: Option<String>,
}

/// Outcome of one flush pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Records the pass tried to submit.
    pub attempted: usize,
    /// Records the upstream acknowledged (removed from the queue).
    pub acknowledged: usize,
    /// Records still queued after the pass, in original order.
    pub remaining: usize,
    /// Another flush held the in-flight flag; this call did nothing.
    pub already_running: bool,
}

/// Durable FIFO queue of offline scans.
pub struct OfflineScanQueue {
    path: PathBuf,
    sink: Arc<dyn ScanSink>,
    // In-flight flag: concurrent flushes are coalesced, never interleaved,
    // so FIFO order holds.
    in_flight: Mutex<()>,
}

impl OfflineScanQueue {
    pub fn new(path: impl Into<PathBuf>, sink: Arc<dyn ScanSink>) -> Self {
        Self {
            path: path.into(),
            sink,
            in_flight: Mutex::new(()),
        }
    }

    /// Append one scan to the durable queue. Local-only: always succeeds
    /// unless the file itself cannot be written, and never touches the
    /// network. Duplicates are accepted; the scan history downstream is an
    /// audit trail and its status projection is idempotent to them.
    pub fn enqueue(&self, scan: CaptureScan) -> Result<QueuedScan> {
        let entry = QueuedScan {
            id: Uuid::new_v4(),
            code: scan.code,
            scan_type: scan.scan_type,
            location: scan.location,
            operator_id: scan.operator_id,
            created_at: Utc::now(),
            status: QueueItemStatus::Pending,
        };

        let mut items = load(&self.path)?;
        items.push(entry.clone());
        persist(&self.path, &items)?;

        debug!(code = %entry.code, queued = items.len(), "scan queued offline");
        Ok(entry)
    }

    /// Number of records still waiting for acknowledgment.
    pub fn len(&self) -> Result<usize> {
        Ok(load(&self.path)?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Replay queued scans against the sink, FIFO.
    ///
    /// No-op while the sink reports offline. Each acknowledged record is
    /// persisted out of the queue immediately, not in a final batch
    /// commit, so a crash mid-flush cannot resubmit it. A failed record
    /// stays queued in place and later records are still attempted.
    pub async fn flush(&self) -> Result<FlushReport> {
        let Ok(_guard) = self.in_flight.try_lock() else {
            debug!("flush already in flight, coalescing");
            return Ok(FlushReport {
                remaining: self.len()?,
                already_running: true,
                ..FlushReport::default()
            });
        };

        let mut items = load(&self.path)?;
        if items.is_empty() {
            return Ok(FlushReport::default());
        }

        if !self.sink.online() {
            debug!(queued = items.len(), "sink offline, skipping flush");
            return Ok(FlushReport {
                remaining: items.len(),
                ..FlushReport::default()
            });
        }

        let mut attempted = 0;
        let mut acknowledged = 0;

        for idx in 0..items.len() {
            if items[idx].status != QueueItemStatus::Pending {
                continue;
            }
            attempted += 1;

            let scan = items[idx].clone();
            match self.sink.submit(&scan).await {
                Ok(()) => {
                    items[idx].status = QueueItemStatus::Acknowledged;
                    acknowledged += 1;
                    persist(&self.path, &items)?;
                }
                Err(err) => {
                    warn!(id = %scan.id, code = %scan.code, error = %err, "scan replay failed, record stays queued");
                }
            }
        }

        let remaining = items
            .iter()
            .filter(|i| i.status == QueueItemStatus::Pending)
            .count();

        if acknowledged > 0 {
            info!(acknowledged, remaining, "offline scan queue flushed");
        }

        Ok(FlushReport {
            attempted,
            acknowledged,
            remaining,
            already_running: false,
        })
    }
}

fn load(path: &Path) -> Result<Vec<QueuedScan>> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err.into()),
    };
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&raw)?)
}

/// Persist the queue, dropping acknowledged records. Write-then-rename so
/// a crash mid-write cannot truncate the queue.
fn persist(path: &Path, items: &[QueuedScan]) -> Result<()> {
    let pending: Vec<&QueuedScan> = items
        .iter()
        .filter(|i| i.status == QueueItemStatus::Pending)
        .collect();
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, serde_json::to_vec(&pending)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
