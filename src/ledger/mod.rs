//! Scan ledger: append-only scan history with a projected package status.
//!
//! Every physical scan appends one immutable `ScanEvent`; the package's
//! `status`/`last_scanned_at`/`last_scanned_location` are a projection of
//! that event, recomputed on every write. Concurrent scans of the same
//! code race on the projection (last-write-wins by commit order) but both
//! events are always durably recorded.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::interfaces::{LedgerError, LedgerStore, Result};
use crate::model::{Package, PackageStatus, ScanEvent, ScanProjection, ScanType};

/// One scan as reported by a scanner or the offline queue replay.
#[derive(Debug, Clone)]
pub struct RecordScan {
    pub code: String,
    pub scan_type: ScanType,
    pub location: Option<String>,
    pub operator_id: Option<String>,
}

/// What a recorded scan produced: the appended event and the package as
/// projected afterwards, so callers can act on the new state without a
/// second read.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub event: ScanEvent,
    pub package: Package,
}

/// The scan ledger service.
pub struct ScanLedger {
    store: Arc<dyn LedgerStore>,
}

impl ScanLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Record one scan against an existing package code.
    ///
    /// Unknown codes fail with `NotFound`; an empty code is a validation
    /// error. Duplicate scans are recorded as separate history events by
    /// design (audit trail); the projection is idempotent to them.
    pub async fn record_scan(&self, scan: RecordScan) -> Result<ScanOutcome> {
        if scan.code.trim().is_empty() {
            return Err(LedgerError::Validation("code must not be empty".into()));
        }

        let package = self
            .store
            .find_package_by_code(&scan.code)
            .await?
            .ok_or_else(|| LedgerError::NotFound {
                entity: "package",
                reference: scan.code.clone(),
            })?;

        let scanned_at = Utc::now();
        let event = ScanEvent {
            id: Uuid::new_v4(),
            package_id: package.id,
            scan_type: scan.scan_type.clone(),
            location: scan.location.clone(),
            operator_id: scan.operator_id,
            manifest_id: None,
            scanned_at,
        };
        let projection = ScanProjection {
            status: PackageStatus::project(&scan.scan_type),
            last_scanned_at: scanned_at,
            last_scanned_location: scan.location,
        };

        let package = self.store.record_scan(&event, &projection).await?;

        debug!(
            code = %package.code,
            scan_type = %event.scan_type.as_str(),
            status = %package.status.as_str(),
            "scan recorded"
        );

        Ok(ScanOutcome { event, package })
    }

    /// Full scan history for a code, oldest first.
    pub async fn history(&self, code: &str) -> Result<Vec<ScanEvent>> {
        let package = self
            .store
            .find_package_by_code(code)
            .await?
            .ok_or_else(|| LedgerError::NotFound {
                entity: "package",
                reference: code.to_string(),
            })?;
        Ok(self.store.scan_history(package.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use sqlx::sqlite::SqlitePoolOptions;

    use super::*;
    use crate::storage::{MockLedgerStore, SqliteLedgerStore};

    fn scan(code: &str, scan_type: ScanType) -> RecordScan {
        RecordScan {
            code: code.to_string(),
            scan_type,
            location: Some("DEL hub".to_string()),
            operator_id: None,
        }
    }

    async fn seeded_store() -> Arc<MockLedgerStore> {
        let store = Arc::new(MockLedgerStore::new());
        store
            .insert_package(&Package {
                id: Uuid::new_v4(),
                code: "BC-1".to_string(),
                shipment_id: None,
                status: PackageStatus::Pending,
                last_scanned_at: None,
                last_scanned_location: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_unknown_code_is_not_found() {
        let ledger = ScanLedger::new(seeded_store().await);
        let err = ledger
            .record_scan(scan("TG1", ScanType::Scan))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_empty_code_is_validation_error() {
        let ledger = ScanLedger::new(seeded_store().await);
        let err = ledger
            .record_scan(scan("  ", ScanType::Scan))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_status_projection_is_total() {
        // Every scan type resolves to a status; none leaves it unset.
        let cases = [
            (ScanType::Scan, PackageStatus::InTransit),
            (
                ScanType::ScannedForManifest,
                PackageStatus::ScannedForManifest,
            ),
            (ScanType::Delivered, PackageStatus::Delivered),
            (
                ScanType::Other("customs_hold".into()),
                PackageStatus::InTransit,
            ),
        ];

        for (scan_type, expected) in cases {
            let ledger = ScanLedger::new(seeded_store().await);
            let outcome = ledger.record_scan(scan("BC-1", scan_type)).await.unwrap();
            assert_eq!(outcome.package.status, expected);
            assert_eq!(outcome.package.last_scanned_at, Some(outcome.event.scanned_at));
        }
    }

    #[tokio::test]
    async fn test_duplicate_scans_both_recorded() {
        let store = seeded_store().await;
        let ledger = ScanLedger::new(store.clone());

        ledger.record_scan(scan("BC-1", ScanType::Scan)).await.unwrap();
        ledger.record_scan(scan("BC-1", ScanType::Scan)).await.unwrap();

        assert_eq!(store.scan_count().await, 2);
        assert_eq!(ledger.history("BC-1").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_scans_never_lose_history() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteLedgerStore::new(pool);
        store.init().await.unwrap();
        let store: Arc<dyn LedgerStore> = Arc::new(store);

        store
            .insert_package(&Package {
                id: Uuid::new_v4(),
                code: "BC-RACE".to_string(),
                shipment_id: None,
                status: PackageStatus::Pending,
                last_scanned_at: None,
                last_scanned_location: None,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let ledger = Arc::new(ScanLedger::new(store));
        let mut handles = Vec::new();
        for i in 0..8 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let scan_type = if i % 2 == 0 {
                    ScanType::Scan
                } else {
                    ScanType::Delivered
                };
                ledger.record_scan(scan("BC-RACE", scan_type)).await
            }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // All eight events survive; the projection matches one of them.
        let history = ledger.history("BC-RACE").await.unwrap();
        assert_eq!(history.len(), 8);
    }
}
