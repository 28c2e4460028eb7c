//! Mock LedgerStore implementation for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::interfaces::store::{LedgerStore, Result, StorageError};
use crate::model::{
    Invoice, InvoiceStatus, Manifest, ManifestItem, Package, Payment, ScanEvent, ScanProjection,
    Shipment,
};


#[derive(Default)]
struct State {
    packages: HashMap<Uuid, Package>,
    scans: Vec<ScanEvent>,
    shipments: HashMap<Uuid, Shipment>,
    manifests: HashMap<Uuid, Manifest>,
    manifest_items: Vec<ManifestItem>,
    invoices: HashMap<Uuid, Invoice>,
    payments: Vec<Payment>,
}

/// Mock ledger store that keeps everything in memory.
///
/// The `fail_on_*` toggles make one storage step fail, which is how the
/// manifest partial-write and resume paths get exercised.
#[derive(Default)]
pub struct MockLedgerStore {
    state: RwLock<State>,
    fail_on_manifest_items: RwLock<bool>,
    fail_on_scan_assign: RwLock<bool>,
}

impl MockLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_manifest_items(&self, fail: bool) {
        *self.fail_on_manifest_items.write().await = fail;
    }

    pub async fn set_fail_on_scan_assign(&self, fail: bool) {
        *self.fail_on_scan_assign.write().await = fail;
    }

    /// Number of scan events recorded across all packages.
    pub async fn scan_count(&self) -> usize {
        self.state.read().await.scans.len()
    }

    pub async fn manifest_count(&self) -> usize {
        self.state.read().await.manifests.len()
    }
}

fn unavailable(step: &str) -> StorageError {
    StorageError::Unavailable(format!("injected failure: {step}"))
}

#[async_trait]
impl LedgerStore for MockLedgerStore {
    async fn insert_package(&self, package: &Package) -> Result<()> {
        let mut state = self.state.write().await;
        state.packages.insert(package.id, package.clone());
        Ok(())
    }

    async fn find_package_by_code(&self, code: &str) -> Result<Option<Package>> {
        let state = self.state.read().await;
        Ok(state.packages.values().find(|p| p.code == code).cloned())
    }

    async fn find_packages_by_codes(&self, codes: &[String]) -> Result<Vec<Package>> {
        let state = self.state.read().await;
        Ok(state
            .packages
            .values()
            .filter(|p| codes.contains(&p.code))
            .cloned()
            .collect())
    }

    async fn record_scan(
        &self,
        event: &ScanEvent,
        projection: &ScanProjection,
    ) -> Result<Package> {
        let mut state = self.state.write().await;
        state.scans.push(event.clone());

        let package =
            state
                .packages
                .get_mut(&event.package_id)
                .ok_or(StorageError::RowNotFound {
                    table: "packages",
                    key: event.package_id.to_string(),
                })?;
        package.status = projection.status;
        package.last_scanned_at = Some(projection.last_scanned_at);
        package.last_scanned_location = projection.last_scanned_location.clone();
        Ok(package.clone())
    }

    async fn scan_history(&self, package_id: Uuid) -> Result<Vec<ScanEvent>> {
        let state = self.state.read().await;
        let mut scans: Vec<ScanEvent> = state
            .scans
            .iter()
            .filter(|s| s.package_id == package_id)
            .cloned()
            .collect();
        scans.sort_by_key(|s| s.scanned_at);
        Ok(scans)
    }

    async fn assign_scans_to_manifest(
        &self,
        manifest_id: Uuid,
        package_ids: &[Uuid],
    ) -> Result<u64> {
        if *self.fail_on_scan_assign.read().await {
            return Err(unavailable("assign_scans_to_manifest"));
        }
        let mut state = self.state.write().await;
        let mut touched = 0;
        for scan in state
            .scans
            .iter_mut()
            .filter(|s| package_ids.contains(&s.package_id))
        {
            scan.manifest_id = Some(manifest_id);
            touched += 1;
        }
        Ok(touched)
    }

    async fn insert_shipment(&self, shipment: &Shipment) -> Result<()> {
        let mut state = self.state.write().await;
        state.shipments.insert(shipment.id, shipment.clone());
        Ok(())
    }

    async fn find_shipments_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Shipment>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.shipments.get(id).cloned())
            .collect())
    }

    async fn insert_manifest(&self, manifest: &Manifest) -> Result<()> {
        let mut state = self.state.write().await;
        state.manifests.insert(manifest.id, manifest.clone());
        Ok(())
    }

    async fn find_manifest_by_ref(&self, manifest_ref: &str) -> Result<Option<Manifest>> {
        let state = self.state.read().await;
        Ok(state
            .manifests
            .values()
            .find(|m| m.manifest_ref == manifest_ref)
            .cloned())
    }

    async fn insert_manifest_items(&self, items: &[ManifestItem]) -> Result<()> {
        if *self.fail_on_manifest_items.read().await {
            return Err(unavailable("insert_manifest_items"));
        }
        let mut state = self.state.write().await;
        state.manifest_items.extend_from_slice(items);
        Ok(())
    }

    async fn list_manifest_items(&self, manifest_id: Uuid) -> Result<Vec<ManifestItem>> {
        let state = self.state.read().await;
        Ok(state
            .manifest_items
            .iter()
            .filter(|i| i.manifest_id == manifest_id)
            .cloned()
            .collect())
    }

    async fn update_manifest_totals(
        &self,
        manifest_id: Uuid,
        total_weight: f64,
        total_pieces: i64,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let manifest = state
            .manifests
            .get_mut(&manifest_id)
            .ok_or(StorageError::RowNotFound {
                table: "manifests",
                key: manifest_id.to_string(),
            })?;
        manifest.total_weight = total_weight;
        manifest.total_pieces = total_pieces;
        Ok(())
    }

    async fn insert_invoice(&self, invoice: &Invoice) -> Result<()> {
        let mut state = self.state.write().await;
        state.invoices.insert(invoice.id, invoice.clone());
        Ok(())
    }

    async fn find_invoice(&self, id: Uuid) -> Result<Option<Invoice>> {
        let state = self.state.read().await;
        Ok(state.invoices.get(&id).cloned())
    }

    async fn insert_payment(&self, payment: &Payment) -> Result<f64> {
        let mut state = self.state.write().await;
        state.payments.push(payment.clone());
        Ok(state
            .payments
            .iter()
            .filter(|p| p.invoice_id == payment.invoice_id)
            .map(|p| p.amount)
            .sum())
    }

    async fn list_payments(&self, invoice_id: Uuid) -> Result<Vec<Payment>> {
        let state = self.state.read().await;
        let mut payments: Vec<Payment> = state
            .payments
            .iter()
            .filter(|p| p.invoice_id == invoice_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| p.payment_date);
        Ok(payments)
    }

    async fn update_invoice_status(&self, id: Uuid, status: &InvoiceStatus) -> Result<()> {
        let mut state = self.state.write().await;
        let invoice = state.invoices.get_mut(&id).ok_or(StorageError::RowNotFound {
            table: "invoices",
            key: id.to_string(),
        })?;
        invoice.status = status.clone();
        Ok(())
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>> {
        let state = self.state.read().await;
        Ok(state.invoices.values().cloned().collect())
    }

    async fn payment_totals(&self) -> Result<Vec<(Uuid, f64)>> {
        let state = self.state.read().await;
        let mut totals: HashMap<Uuid, f64> = HashMap::new();
        for payment in &state.payments {
            *totals.entry(payment.invoice_id).or_insert(0.0) += payment.amount;
        }
        Ok(totals.into_iter().collect())
    }
}
