//! Persistence interface.

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{
    Invoice, InvoiceStatus, Manifest, ManifestItem, Package, Payment, ScanEvent, ScanProjection,
    Shipment,
};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("row not found: {table}/{key}")]
    RowNotFound { table: &'static str, key: String },

    #[error("corrupt column {column}: {value}")]
    Corrupt { column: &'static str, value: String },

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Interface for the four logical collections the engine owns:
/// packages + scan_events, manifests + manifest_items, invoices + payments,
/// plus the shipments the consolidator reads weights from.
///
/// Append + projection pairs (`record_scan`, `record_payment`) must run
/// inside one storage transaction so concurrent writers to the same row
/// are serialized: the projection may be overwritten last-write-wins, but
/// the appended history row is never lost.
///
/// Implementations:
/// - `SqliteLedgerStore`: SQLite storage
/// - `MockLedgerStore`: In-memory mock for testing
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // -- packages & scans -------------------------------------------------

    async fn insert_package(&self, package: &Package) -> Result<()>;

    async fn find_package_by_code(&self, code: &str) -> Result<Option<Package>>;

    /// Resolve a batch of codes. Codes that match nothing are silently
    /// absent from the result; the caller decides whether that matters.
    async fn find_packages_by_codes(&self, codes: &[String]) -> Result<Vec<Package>>;

    /// Append one scan event and apply the derived projection to its
    /// package, atomically. Returns the package as projected.
    async fn record_scan(&self, event: &ScanEvent, projection: &ScanProjection)
        -> Result<Package>;

    /// All scan events for a package, oldest first.
    async fn scan_history(&self, package_id: Uuid) -> Result<Vec<ScanEvent>>;

    /// Point the scan events of the given packages at a manifest.
    /// Returns the number of rows touched.
    async fn assign_scans_to_manifest(
        &self,
        manifest_id: Uuid,
        package_ids: &[Uuid],
    ) -> Result<u64>;

    // -- shipments --------------------------------------------------------

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<()>;

    async fn find_shipments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Shipment>>;

    // -- manifests --------------------------------------------------------

    async fn insert_manifest(&self, manifest: &Manifest) -> Result<()>;

    async fn find_manifest_by_ref(&self, manifest_ref: &str) -> Result<Option<Manifest>>;

    async fn insert_manifest_items(&self, items: &[ManifestItem]) -> Result<()>;

    async fn list_manifest_items(&self, manifest_id: Uuid) -> Result<Vec<ManifestItem>>;

    /// Rewrite derived totals after a resumed build changed the item set.
    async fn update_manifest_totals(
        &self,
        manifest_id: Uuid,
        total_weight: f64,
        total_pieces: i64,
    ) -> Result<()>;

    // -- invoices & payments ----------------------------------------------

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()>;

    async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>>;

    /// Append one payment and return the new total paid across all
    /// payments for the invoice, atomically.
    async fn insert_payment(&self, payment: &Payment) -> Result<f64>;

    /// Payments for one invoice ordered by payment date.
    async fn list_payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>>;

    async fn update_invoice_status(&self, id: Uuid, status: &InvoiceStatus) -> Result<()>;

    async fn list_invoices(&self) -> Result<Vec<Invoice>>;

    /// Total paid per invoice across the whole payments table, for the
    /// AR aggregation pass. Invoices with no payments are absent.
    async fn payment_totals(&self) -> Result<Vec<(Uuid, f64)>>;
}
