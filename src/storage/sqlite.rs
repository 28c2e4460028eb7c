//! SQLite implementation of the ledger store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::{Acquire, Row, SqlitePool};
use sqlx::sqlite::SqliteRow;
use uuid::Uuid;

use crate::interfaces::store::{LedgerStore, Result, StorageError};
use crate::model::{
    Invoice, InvoiceStatus, Manifest, ManifestItem, ManifestStatus, Package, PackageStatus,
    Payment, ScanEvent, ScanProjection, ScanType, Shipment,
};

use super::schema::{
    Invoices, ManifestItems, Manifests, Packages, Payments, ScanEvents, Shipments, ALL_TABLES,
};

/// SQLite implementation of `LedgerStore`.
pub struct SqliteLedgerStore {
    pool: SqlitePool,
}

impl SqliteLedgerStore {
    /// Create a new SQLite ledger store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the database schema.
    pub async fn init(&self) -> Result<()> {
        for ddl in ALL_TABLES {
            sqlx::query(ddl).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn parse_uuid(value: &str, column: &'static str) -> Result<Uuid> {
    Uuid::parse_str(value).map_err(|_| StorageError::Corrupt {
        column,
        value: value.to_string(),
    })
}

fn parse_opt_uuid(value: Option<String>, column: &'static str) -> Result<Option<Uuid>> {
    value.as_deref().map(|v| parse_uuid(v, column)).transpose()
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| StorageError::InvalidTimestamp(value.to_string()))
}

fn parse_opt_ts(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_ts).transpose()
}

fn package_from_row(row: &SqliteRow) -> Result<Package> {
    let id: String = row.try_get("id")?;
    let shipment_id: Option<String> = row.try_get("shipment_id")?;
    let status: String = row.try_get("status")?;
    let last_scanned_at: Option<String> = row.try_get("last_scanned_at")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Package {
        id: parse_uuid(&id, "packages.id")?,
        code: row.try_get("code")?,
        shipment_id: parse_opt_uuid(shipment_id, "packages.shipment_id")?,
        status: PackageStatus::parse(&status).ok_or(StorageError::Corrupt {
            column: "packages.status",
            value: status.clone(),
        })?,
        last_scanned_at: parse_opt_ts(last_scanned_at)?,
        last_scanned_location: row.try_get("last_scanned_location")?,
        created_at: parse_ts(&created_at)?,
    })
}

fn scan_event_from_row(row: &SqliteRow) -> Result<ScanEvent> {
    let id: String = row.try_get("id")?;
    let package_id: String = row.try_get("package_id")?;
    let scan_type: String = row.try_get("scan_type")?;
    let manifest_id: Option<String> = row.try_get("manifest_id")?;
    let scanned_at: String = row.try_get("scanned_at")?;

    Ok(ScanEvent {
        id: parse_uuid(&id, "scan_events.id")?,
        package_id: parse_uuid(&package_id, "scan_events.package_id")?,
        scan_type: ScanType::from(scan_type),
        location: row.try_get("location")?,
        operator_id: row.try_get("operator_id")?,
        manifest_id: parse_opt_uuid(manifest_id, "scan_events.manifest_id")?,
        scanned_at: parse_ts(&scanned_at)?,
    })
}

fn shipment_from_row(row: &SqliteRow) -> Result<Shipment> {
    let id: String = row.try_get("id")?;
    Ok(Shipment {
        id: parse_uuid(&id, "shipments.id")?,
        reference: row.try_get("reference")?,
        weight: row.try_get("weight")?,
        status: row.try_get("status")?,
    })
}

fn manifest_from_row(row: &SqliteRow) -> Result<Manifest> {
    let id: String = row.try_get("id")?;
    let manifest_date: String = row.try_get("manifest_date")?;
    let status: String = row.try_get("status")?;

    Ok(Manifest {
        id: parse_uuid(&id, "manifests.id")?,
        manifest_ref: row.try_get("manifest_ref")?,
        origin_hub: row.try_get("origin_hub")?,
        destination: row.try_get("destination")?,
        carrier_code: row.try_get("carrier_code")?,
        manifest_date: parse_ts(&manifest_date)?,
        total_weight: row.try_get("total_weight")?,
        total_pieces: row.try_get("total_pieces")?,
        status: ManifestStatus::parse(&status).ok_or(StorageError::Corrupt {
            column: "manifests.status",
            value: status.clone(),
        })?,
        created_by: row.try_get("created_by")?,
    })
}

fn manifest_item_from_row(row: &SqliteRow) -> Result<ManifestItem> {
    let id: String = row.try_get("id")?;
    let manifest_id: String = row.try_get("manifest_id")?;
    let package_id: String = row.try_get("package_id")?;
    let shipment_id: Option<String> = row.try_get("shipment_id")?;

    Ok(ManifestItem {
        id: parse_uuid(&id, "manifest_items.id")?,
        manifest_id: parse_uuid(&manifest_id, "manifest_items.manifest_id")?,
        package_id: parse_uuid(&package_id, "manifest_items.package_id")?,
        shipment_id: parse_opt_uuid(shipment_id, "manifest_items.shipment_id")?,
        weight: row.try_get("weight")?,
    })
}

fn invoice_from_row(row: &SqliteRow) -> Result<Invoice> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Invoice {
        id: parse_uuid(&id, "invoices.id")?,
        reference: row.try_get("reference")?,
        amount: row.try_get("amount")?,
        status: InvoiceStatus::from(status),
        created_at: parse_ts(&created_at)?,
    })
}

fn payment_from_row(row: &SqliteRow) -> Result<Payment> {
    let id: String = row.try_get("id")?;
    let invoice_id: String = row.try_get("invoice_id")?;
    let payment_date: String = row.try_get("payment_date")?;
    let created_at: String = row.try_get("created_at")?;

    Ok(Payment {
        id: parse_uuid(&id, "payments.id")?,
        invoice_id: parse_uuid(&invoice_id, "payments.invoice_id")?,
        amount: row.try_get("amount")?,
        payment_date: parse_ts(&payment_date)?,
        payment_mode: row.try_get("payment_mode")?,
        reference: row.try_get("reference")?,
        created_by: row.try_get("created_by")?,
        created_at: parse_ts(&created_at)?,
    })
}

const PACKAGE_COLUMNS: [Packages; 7] = [
    Packages::Id,
    Packages::Code,
    Packages::ShipmentId,
    Packages::Status,
    Packages::LastScannedAt,
    Packages::LastScannedLocation,
    Packages::CreatedAt,
];

const SCAN_EVENT_COLUMNS: [ScanEvents; 7] = [
    ScanEvents::Id,
    ScanEvents::PackageId,
    ScanEvents::ScanType,
    ScanEvents::Location,
    ScanEvents::OperatorId,
    ScanEvents::ManifestId,
    ScanEvents::ScannedAt,
];

const MANIFEST_COLUMNS: [Manifests; 10] = [
    Manifests::Id,
    Manifests::ManifestRef,
    Manifests::OriginHub,
    Manifests::Destination,
    Manifests::CarrierCode,
    Manifests::ManifestDate,
    Manifests::TotalWeight,
    Manifests::TotalPieces,
    Manifests::Status,
    Manifests::CreatedBy,
];

#[async_trait]
impl LedgerStore for SqliteLedgerStore {
    async fn insert_package(&self, package: &Package) -> Result<()> {
        let query = Query::insert()
            .into_table(Packages::Table)
            .columns(PACKAGE_COLUMNS)
            .values_panic([
                package.id.to_string().into(),
                package.code.clone().into(),
                package.shipment_id.map(|id| id.to_string()).into(),
                package.status.as_str().into(),
                package.last_scanned_at.map(|ts| ts.to_rfc3339()).into(),
                package.last_scanned_location.clone().into(),
                package.created_at.to_rfc3339().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn find_package_by_code(&self, code: &str) -> Result<Option<Package>> {
        let query = Query::select()
            .columns(PACKAGE_COLUMNS)
            .from(Packages::Table)
            .and_where(Expr::col(Packages::Code).eq(code))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(package_from_row).transpose()
    }

    async fn find_packages_by_codes(&self, codes: &[String]) -> Result<Vec<Package>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::select()
            .columns(PACKAGE_COLUMNS)
            .from(Packages::Table)
            .and_where(Expr::col(Packages::Code).is_in(codes.iter().cloned()))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(package_from_row).collect()
    }

    async fn record_scan(
        &self,
        event: &ScanEvent,
        projection: &ScanProjection,
    ) -> Result<Package> {
        // One transaction: the appended event and the projected package
        // fields commit together, serialized against concurrent scanners.
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let insert = Query::insert()
            .into_table(ScanEvents::Table)
            .columns(SCAN_EVENT_COLUMNS)
            .values_panic([
                event.id.to_string().into(),
                event.package_id.to_string().into(),
                event.scan_type.as_str().into(),
                event.location.clone().into(),
                event.operator_id.clone().into(),
                event.manifest_id.map(|id| id.to_string()).into(),
                event.scanned_at.to_rfc3339().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&insert).execute(&mut *tx).await?;

        let update = Query::update()
            .table(Packages::Table)
            .values([
                (Packages::Status, projection.status.as_str().into()),
                (
                    Packages::LastScannedAt,
                    projection.last_scanned_at.to_rfc3339().into(),
                ),
                (
                    Packages::LastScannedLocation,
                    projection.last_scanned_location.clone().into(),
                ),
            ])
            .and_where(Expr::col(Packages::Id).eq(event.package_id.to_string()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&update).execute(&mut *tx).await?;

        let select = Query::select()
            .columns(PACKAGE_COLUMNS)
            .from(Packages::Table)
            .and_where(Expr::col(Packages::Id).eq(event.package_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&select)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(StorageError::RowNotFound {
                table: "packages",
                key: event.package_id.to_string(),
            })?;

        let package = package_from_row(&row)?;
        tx.commit().await?;
        Ok(package)
    }

    async fn scan_history(&self, package_id: Uuid) -> Result<Vec<ScanEvent>> {
        let query = Query::select()
            .columns(SCAN_EVENT_COLUMNS)
            .from(ScanEvents::Table)
            .and_where(Expr::col(ScanEvents::PackageId).eq(package_id.to_string()))
            .order_by(ScanEvents::ScannedAt, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(scan_event_from_row).collect()
    }

    async fn assign_scans_to_manifest(
        &self,
        manifest_id: Uuid,
        package_ids: &[Uuid],
    ) -> Result<u64> {
        if package_ids.is_empty() {
            return Ok(0);
        }

        let query = Query::update()
            .table(ScanEvents::Table)
            .values([(ScanEvents::ManifestId, manifest_id.to_string().into())])
            .and_where(
                Expr::col(ScanEvents::PackageId)
                    .is_in(package_ids.iter().map(|id| id.to_string())),
            )
            .to_string(SqliteQueryBuilder);

        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<()> {
        let query = Query::insert()
            .into_table(Shipments::Table)
            .columns([
                Shipments::Id,
                Shipments::Reference,
                Shipments::Weight,
                Shipments::Status,
            ])
            .values_panic([
                shipment.id.to_string().into(),
                shipment.reference.clone().into(),
                shipment.weight.into(),
                shipment.status.clone().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn find_shipments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Shipment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::select()
            .columns([
                Shipments::Id,
                Shipments::Reference,
                Shipments::Weight,
                Shipments::Status,
            ])
            .from(Shipments::Table)
            .and_where(Expr::col(Shipments::Id).is_in(ids.iter().map(|id| id.to_string())))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(shipment_from_row).collect()
    }

    async fn insert_manifest(&self, manifest: &Manifest) -> Result<()> {
        let query = Query::insert()
            .into_table(Manifests::Table)
            .columns(MANIFEST_COLUMNS)
            .values_panic([
                manifest.id.to_string().into(),
                manifest.manifest_ref.clone().into(),
                manifest.origin_hub.clone().into(),
                manifest.destination.clone().into(),
                manifest.carrier_code.clone().into(),
                manifest.manifest_date.to_rfc3339().into(),
                manifest.total_weight.into(),
                manifest.total_pieces.into(),
                manifest.status.as_str().into(),
                manifest.created_by.clone().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn find_manifest_by_ref(&self, manifest_ref: &str) -> Result<Option<Manifest>> {
        let query = Query::select()
            .columns(MANIFEST_COLUMNS)
            .from(Manifests::Table)
            .and_where(Expr::col(Manifests::ManifestRef).eq(manifest_ref))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(manifest_from_row).transpose()
    }

    async fn insert_manifest_items(&self, items: &[ManifestItem]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        let query = {
            let mut insert = Query::insert();
            insert.into_table(ManifestItems::Table).columns([
                ManifestItems::Id,
                ManifestItems::ManifestId,
                ManifestItems::PackageId,
                ManifestItems::ShipmentId,
                ManifestItems::Weight,
            ]);

            for item in items {
                insert.values_panic([
                    item.id.to_string().into(),
                    item.manifest_id.to_string().into(),
                    item.package_id.to_string().into(),
                    item.shipment_id.map(|id| id.to_string()).into(),
                    item.weight.into(),
                ]);
            }

            insert.to_string(SqliteQueryBuilder)
        };
        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_manifest_items(&self, manifest_id: Uuid) -> Result<Vec<ManifestItem>> {
        let query = Query::select()
            .columns([
                ManifestItems::Id,
                ManifestItems::ManifestId,
                ManifestItems::PackageId,
                ManifestItems::ShipmentId,
                ManifestItems::Weight,
            ])
            .from(ManifestItems::Table)
            .and_where(Expr::col(ManifestItems::ManifestId).eq(manifest_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(manifest_item_from_row).collect()
    }

    async fn update_manifest_totals(
        &self,
        manifest_id: Uuid,
        total_weight: f64,
        total_pieces: i64,
    ) -> Result<()> {
        let query = Query::update()
            .table(Manifests::Table)
            .values([
                (Manifests::TotalWeight, total_weight.into()),
                (Manifests::TotalPieces, total_pieces.into()),
            ])
            .and_where(Expr::col(Manifests::Id).eq(manifest_id.to_string()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()> {
        let query = Query::insert()
            .into_table(Invoices::Table)
            .columns([
                Invoices::Id,
                Invoices::Reference,
                Invoices::Amount,
                Invoices::Status,
                Invoices::CreatedAt,
            ])
            .values_panic([
                invoice.id.to_string().into(),
                invoice.reference.clone().into(),
                invoice.amount.into(),
                invoice.status.as_str().into(),
                invoice.created_at.to_rfc3339().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        let query = Query::select()
            .columns([
                Invoices::Id,
                Invoices::Reference,
                Invoices::Amount,
                Invoices::Status,
                Invoices::CreatedAt,
            ])
            .from(Invoices::Table)
            .and_where(Expr::col(Invoices::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(invoice_from_row).transpose()
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<f64> {
        // One transaction: append the payment and read back the running
        // total it is part of.
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        let insert = Query::insert()
            .into_table(Payments::Table)
            .columns([
                Payments::Id,
                Payments::InvoiceId,
                Payments::Amount,
                Payments::PaymentDate,
                Payments::PaymentMode,
                Payments::Reference,
                Payments::CreatedBy,
                Payments::CreatedAt,
            ])
            .values_panic([
                payment.id.to_string().into(),
                payment.invoice_id.to_string().into(),
                payment.amount.into(),
                payment.payment_date.to_rfc3339().into(),
                payment.payment_mode.clone().into(),
                payment.reference.clone().into(),
                payment.created_by.clone().into(),
                payment.created_at.to_rfc3339().into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&insert).execute(&mut *tx).await?;

        let sum = Query::select()
            .expr(Expr::col(Payments::Amount).sum())
            .from(Payments::Table)
            .and_where(Expr::col(Payments::InvoiceId).eq(payment.invoice_id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&sum).fetch_one(&mut *tx).await?;
        let total_paid: Option<f64> = row.try_get(0)?;

        tx.commit().await?;
        Ok(total_paid.unwrap_or(0.0))
    }

    async fn list_payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>> {
        let query = Query::select()
            .columns([
                Payments::Id,
                Payments::InvoiceId,
                Payments::Amount,
                Payments::PaymentDate,
                Payments::PaymentMode,
                Payments::Reference,
                Payments::CreatedBy,
                Payments::CreatedAt,
            ])
            .from(Payments::Table)
            .and_where(Expr::col(Payments::InvoiceId).eq(invoice_id.to_string()))
            .order_by(Payments::PaymentDate, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(payment_from_row).collect()
    }

    async fn update_invoice_status(&self, id: Uuid, status: &InvoiceStatus) -> Result<()> {
        let query = Query::update()
            .table(Invoices::Table)
            .values([(Invoices::Status, status.as_str().into())])
            .and_where(Expr::col(Invoices::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        let query = Query::select()
            .columns([
                Invoices::Id,
                Invoices::Reference,
                Invoices::Amount,
                Invoices::Status,
                Invoices::CreatedAt,
            ])
            .from(Invoices::Table)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(invoice_from_row).collect()
    }

    async fn payment_totals(&self) -> Result<Vec<(Uuid, f64)>> {
        let query = Query::select()
            .column(Payments::InvoiceId)
            .expr(Expr::col(Payments::Amount).sum())
            .from(Payments::Table)
            .group_by_col(Payments::InvoiceId)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| {
                let invoice_id: String = row.try_get(0)?;
                let total: Option<f64> = row.try_get(1)?;
                Ok((
                    parse_uuid(&invoice_id, "payments.invoice_id")?,
                    total.unwrap_or(0.0),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;

    async fn test_store() -> SqliteLedgerStore {
        // Single connection so the whole test shares one in-memory db.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteLedgerStore::new(pool);
        store.init().await.unwrap();
        store
    }

    fn package(code: &str, shipment_id: Option<Uuid>) -> Package {
        Package {
            id: Uuid::new_v4(),
            code: code.to_string(),
            shipment_id,
            status: PackageStatus::Pending,
            last_scanned_at: None,
            last_scanned_location: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_scan_appends_and_projects() {
        let store = test_store().await;
        let pkg = package("BC-100", None);
        store.insert_package(&pkg).await.unwrap();

        let event = ScanEvent {
            id: Uuid::new_v4(),
            package_id: pkg.id,
            scan_type: ScanType::Delivered,
            location: Some("BOM hub".to_string()),
            operator_id: None,
            manifest_id: None,
            scanned_at: Utc::now(),
        };
        let projection = ScanProjection {
            status: PackageStatus::Delivered,
            last_scanned_at: event.scanned_at,
            last_scanned_location: event.location.clone(),
        };

        let updated = store.record_scan(&event, &projection).await.unwrap();
        assert_eq!(updated.status, PackageStatus::Delivered);
        assert_eq!(updated.last_scanned_location.as_deref(), Some("BOM hub"));

        let history = store.scan_history(pkg.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].scan_type, ScanType::Delivered);
    }

    #[tokio::test]
    async fn test_find_packages_by_codes_skips_unknown() {
        let store = test_store().await;
        store.insert_package(&package("BC-1", None)).await.unwrap();
        store.insert_package(&package("BC-2", None)).await.unwrap();

        let found = store
            .find_packages_by_codes(&[
                "BC-1".to_string(),
                "BC-2".to_string(),
                "BC-MISSING".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
    }

    #[tokio::test]
    async fn test_insert_payment_returns_running_total() {
        let store = test_store().await;
        let invoice = Invoice {
            id: Uuid::new_v4(),
            reference: "INV-1".to_string(),
            amount: 1000.0,
            status: InvoiceStatus::Pending,
            created_at: Utc::now(),
        };
        store.insert_invoice(&invoice).await.unwrap();

        let mut payment = Payment {
            id: Uuid::new_v4(),
            invoice_id: invoice.id,
            amount: 400.0,
            payment_date: Utc::now(),
            payment_mode: "upi".to_string(),
            reference: None,
            created_by: None,
            created_at: Utc::now(),
        };
        assert_eq!(store.insert_payment(&payment).await.unwrap(), 400.0);

        payment.id = Uuid::new_v4();
        payment.amount = 700.0;
        assert_eq!(store.insert_payment(&payment).await.unwrap(), 1100.0);

        let payments = store.list_payments(invoice.id).await.unwrap();
        assert_eq!(payments.len(), 2);
    }

    #[tokio::test]
    async fn test_manifest_round_trip_with_items() {
        let store = test_store().await;
        let manifest = Manifest {
            id: Uuid::new_v4(),
            manifest_ref: "MAN-1".to_string(),
            origin_hub: "DEL".to_string(),
            destination: "DXB".to_string(),
            carrier_code: "EK".to_string(),
            manifest_date: Utc::now(),
            total_weight: 10.0,
            total_pieces: 2,
            status: ManifestStatus::Scheduled,
            created_by: None,
        };
        store.insert_manifest(&manifest).await.unwrap();

        let items: Vec<ManifestItem> = (0..2)
            .map(|_| ManifestItem {
                id: Uuid::new_v4(),
                manifest_id: manifest.id,
                package_id: Uuid::new_v4(),
                shipment_id: None,
                weight: Some(5.0),
            })
            .collect();
        store.insert_manifest_items(&items).await.unwrap();

        let found = store.find_manifest_by_ref("MAN-1").await.unwrap().unwrap();
        assert_eq!(found.total_pieces, 2);
        assert_eq!(store.list_manifest_items(manifest.id).await.unwrap().len(), 2);

        store
            .update_manifest_totals(manifest.id, 25.0, 3)
            .await
            .unwrap();
        let updated = store.find_manifest_by_ref("MAN-1").await.unwrap().unwrap();
        assert_eq!(updated.total_weight, 25.0);
        assert_eq!(updated.total_pieces, 3);
    }

    #[tokio::test]
    async fn test_assign_scans_to_manifest() {
        let store = test_store().await;
        let pkg = package("BC-9", None);
        store.insert_package(&pkg).await.unwrap();

        let event = ScanEvent {
            id: Uuid::new_v4(),
            package_id: pkg.id,
            scan_type: ScanType::ScannedForManifest,
            location: None,
            operator_id: None,
            manifest_id: None,
            scanned_at: Utc::now(),
        };
        let projection = ScanProjection {
            status: PackageStatus::ScannedForManifest,
            last_scanned_at: event.scanned_at,
            last_scanned_location: None,
        };
        store.record_scan(&event, &projection).await.unwrap();

        let manifest_id = Uuid::new_v4();
        let touched = store
            .assign_scans_to_manifest(manifest_id, &[pkg.id])
            .await
            .unwrap();
        assert_eq!(touched, 1);

        let history = store.scan_history(pkg.id).await.unwrap();
        assert_eq!(history[0].manifest_id, Some(manifest_id));
    }
}
