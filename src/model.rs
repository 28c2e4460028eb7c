//! Domain records for the package-movement engine.
//!
//! Two families of rows exist: append-only history (`ScanEvent`, `Payment`)
//! and mutable projections derived from it (`Package.status`,
//! `Invoice.status`, manifest totals). History rows are never updated or
//! deleted once written; projections are recomputed on every write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current projected status of a package, derived from its latest scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageStatus {
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "in-transit")]
    InTransit,
    #[serde(rename = "scanned_for_manifest")]
    ScannedForManifest,
    #[serde(rename = "delivered")]
    Delivered,
}

impl PackageStatus {
    /// Project a scan type onto a package status.
    ///
    /// Total: every scan type maps to exactly one status. Scan types
    /// outside the two recognized transitions mean the package moved,
    /// so they project to `InTransit`.
    pub fn project(scan_type: &ScanType) -> Self {
        match scan_type {
            ScanType::ScannedForManifest => PackageStatus::ScannedForManifest,
            ScanType::Delivered => PackageStatus::Delivered,
            _ => PackageStatus::InTransit,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PackageStatus::Pending => "pending",
            PackageStatus::InTransit => "in-transit",
            PackageStatus::ScannedForManifest => "scanned_for_manifest",
            PackageStatus::Delivered => "delivered",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PackageStatus::Pending),
            "in-transit" => Some(PackageStatus::InTransit),
            "scanned_for_manifest" => Some(PackageStatus::ScannedForManifest),
            "delivered" => Some(PackageStatus::Delivered),
            _ => None,
        }
    }
}

/// Kind of physical scan. Scanners send free-form strings; the two
/// recognized transitions are kept as variants, everything else is
/// carried through verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScanType {
    Scan,
    ScannedForManifest,
    Delivered,
    Other(String),
}

impl ScanType {
    pub fn as_str(&self) -> &str {
        match self {
            ScanType::Scan => "scan",
            ScanType::ScannedForManifest => "scanned_for_manifest",
            ScanType::Delivered => "delivered",
            ScanType::Other(s) => s,
        }
    }
}

impl From<String> for ScanType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "scan" => ScanType::Scan,
            "scanned_for_manifest" => ScanType::ScannedForManifest,
            "delivered" => ScanType::Delivered,
            _ => ScanType::Other(s),
        }
    }
}

impl From<ScanType> for String {
    fn from(t: ScanType) -> Self {
        t.as_str().to_string()
    }
}

impl Default for ScanType {
    fn default() -> Self {
        ScanType::Scan
    }
}

/// A scannable barcode label. One row per physical label.
///
/// `status`, `last_scanned_at` and `last_scanned_location` are projections
/// of the scan history (last-write-wins); everything else is fixed at
/// creation. Rows are never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    pub code: String,
    pub shipment_id: Option<Uuid>,
    pub status: PackageStatus,
    pub last_scanned_at: Option<DateTime<Utc>>,
    pub last_scanned_location: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of one physical scan. Append-only audit trail;
/// `manifest_id` is the only column touched after insert (set once by the
/// consolidator to tie the scan batch to the manifest it produced).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanEvent {
    pub id: Uuid,
    pub package_id: Uuid,
    pub scan_type: ScanType,
    pub location: Option<String>,
    pub operator_id: Option<String>,
    pub manifest_id: Option<Uuid>,
    pub scanned_at: DateTime<Utc>,
}

/// Derived package fields applied together with a scan append.
/// Last-write-wins: a racing scan may overwrite these, but never the
/// event row they were derived from.
#[derive(Debug, Clone)]
pub struct ScanProjection {
    pub status: PackageStatus,
    pub last_scanned_at: DateTime<Utc>,
    pub last_scanned_location: Option<String>,
}

/// A shipment owning zero or more packages. Weight is the unit manifest
/// aggregation sums, once per shipment regardless of package count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub id: Uuid,
    pub reference: String,
    pub weight: Option<f64>,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestStatus {
    Scheduled,
    Departed,
    Arrived,
}

impl ManifestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ManifestStatus::Scheduled => "scheduled",
            ManifestStatus::Departed => "departed",
            ManifestStatus::Arrived => "arrived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(ManifestStatus::Scheduled),
            "departed" => Some(ManifestStatus::Departed),
            "arrived" => Some(ManifestStatus::Arrived),
            _ => None,
        }
    }
}

/// A consolidated batch of packages handed to a carrier.
///
/// `total_weight`/`total_pieces` are derived from the item rows and are
/// never set independently of item insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub id: Uuid,
    pub manifest_ref: String,
    pub origin_hub: String,
    pub destination: String,
    pub carrier_code: String,
    pub manifest_date: DateTime<Utc>,
    pub total_weight: f64,
    pub total_pieces: i64,
    pub status: ManifestStatus,
    pub created_by: Option<String>,
}

/// Join row tying one package into one manifest. Written atomically with
/// its batch, immutable afterwards. `weight` snapshots the owning
/// shipment's weight at consolidation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestItem {
    pub id: Uuid,
    pub manifest_id: Uuid,
    pub package_id: Uuid,
    pub shipment_id: Option<Uuid>,
    pub weight: Option<f64>,
}

/// Invoice status is a projection over the payment history, except for
/// `Overdue` which is set by an external dunning process and only
/// overwritten once money arrives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum InvoiceStatus {
    Pending,
    PartiallyPaid,
    Paid,
    Overdue,
    Other(String),
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Overdue => "overdue",
            InvoiceStatus::Other(s) => s,
        }
    }
}

impl From<String> for InvoiceStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => InvoiceStatus::Pending,
            "partially_paid" => InvoiceStatus::PartiallyPaid,
            "paid" => InvoiceStatus::Paid,
            "overdue" => InvoiceStatus::Overdue,
            _ => InvoiceStatus::Other(s),
        }
    }
}

impl From<InvoiceStatus> for String {
    fn from(s: InvoiceStatus) -> Self {
        s.as_str().to_string()
    }
}

/// An invoice. `amount` is fixed at creation; `status` is recomputed on
/// every payment write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: Uuid,
    pub reference: String,
    pub amount: f64,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
}

/// Immutable record of money received against an invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: f64,
    pub payment_date: DateTime<Utc>,
    pub payment_mode: String,
    pub reference: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Delivery state of one queued offline scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemStatus {
    Pending,
    Acknowledged,
}

/// One scan captured while the client was disconnected, waiting to be
/// replayed against the scan ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedScan {
    pub id: Uuid,
    pub code: String,
    pub scan_type: ScanType,
    pub location: Option<String>,
    pub operator_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub status: QueueItemStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_projection_is_total() {
        // Every scan type, including arbitrary strings, yields a status.
        assert_eq!(
            PackageStatus::project(&ScanType::ScannedForManifest),
            PackageStatus::ScannedForManifest
        );
        assert_eq!(
            PackageStatus::project(&ScanType::Delivered),
            PackageStatus::Delivered
        );
        assert_eq!(
            PackageStatus::project(&ScanType::Scan),
            PackageStatus::InTransit
        );
        assert_eq!(
            PackageStatus::project(&ScanType::Other("hub_arrival".into())),
            PackageStatus::InTransit
        );
    }

    #[test]
    fn test_scan_type_round_trip() {
        assert_eq!(ScanType::from("scan".to_string()), ScanType::Scan);
        assert_eq!(
            ScanType::from("customs_hold".to_string()),
            ScanType::Other("customs_hold".into())
        );
        assert_eq!(ScanType::Other("customs_hold".into()).as_str(), "customs_hold");
    }

    #[test]
    fn test_invoice_status_parse() {
        assert_eq!(
            InvoiceStatus::from("partially_paid".to_string()),
            InvoiceStatus::PartiallyPaid
        );
        assert_eq!(
            InvoiceStatus::from("written_off".to_string()),
            InvoiceStatus::Other("written_off".into())
        );
    }
}
