//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query
//! building, plus the DDL for the engine's tables.

use sea_query::Iden;

/// Packages (barcodes) table schema.
#[derive(Iden)]
pub enum Packages {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "code"]
    Code,
    #[iden = "shipment_id"]
    ShipmentId,
    #[iden = "status"]
    Status,
    #[iden = "last_scanned_at"]
    LastScannedAt,
    #[iden = "last_scanned_location"]
    LastScannedLocation,
    #[iden = "created_at"]
    CreatedAt,
}

/// Scan events table schema (append-only).
#[derive(Iden)]
pub enum ScanEvents {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "package_id"]
    PackageId,
    #[iden = "scan_type"]
    ScanType,
    #[iden = "location"]
    Location,
    #[iden = "operator_id"]
    OperatorId,
    #[iden = "manifest_id"]
    ManifestId,
    #[iden = "scanned_at"]
    ScannedAt,
}

/// Shipments table schema.
#[derive(Iden)]
pub enum Shipments {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "reference"]
    Reference,
    #[iden = "weight"]
    Weight,
    #[iden = "status"]
    Status,
}

/// Manifests table schema.
#[derive(Iden)]
pub enum Manifests {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "manifest_ref"]
    ManifestRef,
    #[iden = "origin_hub"]
    OriginHub,
    #[iden = "destination"]
    Destination,
    #[iden = "carrier_code"]
    CarrierCode,
    #[iden = "manifest_date"]
    ManifestDate,
    #[iden = "total_weight"]
    TotalWeight,
    #[iden = "total_pieces"]
    TotalPieces,
    #[iden = "status"]
    Status,
    #[iden = "created_by"]
    CreatedBy,
}

/// Manifest items table schema.
#[derive(Iden)]
pub enum ManifestItems {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "manifest_id"]
    ManifestId,
    #[iden = "package_id"]
    PackageId,
    #[iden = "shipment_id"]
    ShipmentId,
    #[iden = "weight"]
    Weight,
}

/// Invoices table schema.
#[derive(Iden)]
pub enum Invoices {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "reference"]
    Reference,
    #[iden = "amount"]
    Amount,
    #[iden = "status"]
    Status,
    #[iden = "created_at"]
    CreatedAt,
}

/// Payments table schema (append-only).
#[derive(Iden)]
pub enum Payments {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "invoice_id"]
    InvoiceId,
    #[iden = "amount"]
    Amount,
    #[iden = "payment_date"]
    PaymentDate,
    #[iden = "payment_mode"]
    PaymentMode,
    #[iden = "reference"]
    Reference,
    #[iden = "created_by"]
    CreatedBy,
    #[iden = "created_at"]
    CreatedAt,
}

/// SQL for creating the packages table.
pub const CREATE_PACKAGES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS packages (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    shipment_id TEXT,
    status TEXT NOT NULL DEFAULT 'pending',
    last_scanned_at TEXT,
    last_scanned_location TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_packages_code ON packages(code);
"#;

/// SQL for creating the scan_events table.
pub const CREATE_SCAN_EVENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS scan_events (
    id TEXT PRIMARY KEY,
    package_id TEXT NOT NULL,
    scan_type TEXT NOT NULL,
    location TEXT,
    operator_id TEXT,
    manifest_id TEXT,
    scanned_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_scan_events_package ON scan_events(package_id, scanned_at);
"#;

/// SQL for creating the shipments table.
pub const CREATE_SHIPMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS shipments (
    id TEXT PRIMARY KEY,
    reference TEXT NOT NULL,
    weight REAL,
    status TEXT NOT NULL DEFAULT 'created'
);
"#;

/// SQL for creating the manifests table.
pub const CREATE_MANIFESTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS manifests (
    id TEXT PRIMARY KEY,
    manifest_ref TEXT NOT NULL UNIQUE,
    origin_hub TEXT NOT NULL,
    destination TEXT NOT NULL,
    carrier_code TEXT NOT NULL,
    manifest_date TEXT NOT NULL,
    total_weight REAL NOT NULL DEFAULT 0,
    total_pieces INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'scheduled',
    created_by TEXT
);
"#;

/// SQL for creating the manifest_items table.
pub const CREATE_MANIFEST_ITEMS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS manifest_items (
    id TEXT PRIMARY KEY,
    manifest_id TEXT NOT NULL,
    package_id TEXT NOT NULL,
    shipment_id TEXT,
    weight REAL
);

CREATE INDEX IF NOT EXISTS idx_manifest_items_manifest ON manifest_items(manifest_id);
"#;

/// SQL for creating the invoices table.
pub const CREATE_INVOICES_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS invoices (
    id TEXT PRIMARY KEY,
    reference TEXT NOT NULL,
    amount REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    created_at TEXT NOT NULL
);
"#;

/// SQL for creating the payments table.
pub const CREATE_PAYMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS payments (
    id TEXT PRIMARY KEY,
    invoice_id TEXT NOT NULL,
    amount REAL NOT NULL,
    payment_date TEXT NOT NULL,
    payment_mode TEXT NOT NULL,
    reference TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_payments_invoice ON payments(invoice_id, payment_date);
"#;

/// All DDL statements in creation order.
pub const ALL_TABLES: &[&str] = &[
    CREATE_PACKAGES_TABLE,
    CREATE_SCAN_EVENTS_TABLE,
    CREATE_SHIPMENTS_TABLE,
    CREATE_MANIFESTS_TABLE,
    CREATE_MANIFEST_ITEMS_TABLE,
    CREATE_INVOICES_TABLE,
    CREATE_PAYMENTS_TABLE,
];
