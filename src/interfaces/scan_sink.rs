//! Remote scan ingestion interface.
//!
//! The offline queue replays captured scans through this seam. The real
//! implementation posts to the scan ingestion endpoint over HTTP; tests
//! script it.

use async_trait::async_trait;

use crate::model::QueuedScan;

/// Result type for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Errors from submitting a scan upstream.
///
/// Both variants leave the item queued for the next flush; the
/// distinction only matters for logging and for callers deciding whether
/// the queue is worth flushing again soon.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("upstream unavailable: {0}")]
    Unavailable(String),

    #[error("scan rejected upstream ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Where flushed scans go.
#[async_trait]
pub trait ScanSink: Send + Sync {
    /// Whether the client currently believes the upstream is reachable.
    /// A flush against an offline sink is a no-op.
    fn online(&self) -> bool {
        true
    }

    /// Submit one scan. Success means the upstream durably recorded it.
    async fn submit(&self, scan: &QueuedScan) -> Result<()>;
}
