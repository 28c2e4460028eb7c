//! Trait seams and error taxonomy.
//!
//! The engine talks to the outside world through two traits: `LedgerStore`
//! (persistence) and `ScanSink` (the remote ingestion endpoint the offline
//! queue replays into). Each seam carries its own error enum; operations
//! surface `LedgerError`, the caller-facing taxonomy.

pub mod scan_sink;
pub mod store;

pub use scan_sink::{ScanSink, SinkError};
pub use store::{LedgerStore, StorageError};

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Caller-facing failure taxonomy.
///
/// `NotFound` and `Validation` are terminal; the caller gets them back
/// unchanged and must not retry. `PartialWrite` means a multi-step
/// manifest build stopped mid-sequence; retrying with the same manifest
/// reference resumes it. Storage failures pass through as `Storage`.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("{entity} not found: {reference}")]
    NotFound {
        entity: &'static str,
        reference: String,
    },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("manifest {reference} partially written; retry with the same reference to resume")]
    PartialWrite { reference: String },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl LedgerError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::NotFound { .. } => "not_found",
            LedgerError::Validation(_) => "validation",
            LedgerError::PartialWrite { .. } => "partial_write",
            LedgerError::Storage(_) => "internal",
        }
    }
}
