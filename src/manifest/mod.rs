//! Manifest consolidation: grouping scanned packages into a carrier batch.
//!
//! A build is a multi-step write across three collections (manifests,
//! manifest_items, scan_events) with no cross-collection transaction.
//! The manifest reference doubles as an idempotency key: retrying a build
//! with the same reference resumes a partially applied one instead of
//! creating a second manifest.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::interfaces::{LedgerError, LedgerStore, Result, StorageError};
use crate::model::{Manifest, ManifestItem, ManifestStatus, Package, Shipment};

/// A consolidation request: which packages, which lane, which carrier.
#[derive(Debug, Clone)]
pub struct BuildManifest {
    pub origin_hub: String,
    pub destination: String,
    pub carrier_code: String,
    pub package_codes: Vec<String>,
    pub manifest_ref: Option<String>,
    pub created_by: Option<String>,
}

/// The manifest consolidator service.
pub struct ManifestConsolidator {
    store: Arc<dyn LedgerStore>,
}

impl ManifestConsolidator {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Consolidate a batch of scanned packages into one manifest.
    ///
    /// Weight is summed once per distinct owning shipment (a shipment with
    /// several packages on the manifest counts once); pieces count every
    /// package. Codes that resolve to nothing are skipped; if none resolve
    /// the build fails with `NotFound`.
    ///
    /// A failure after the manifest row exists surfaces as `PartialWrite`
    /// carrying the reference; calling again with that reference finishes
    /// the item insertion and repairs the totals.
    pub async fn build_manifest(&self, request: BuildManifest) -> Result<Manifest> {
        validate(&request)?;

        let packages = self
            .store
            .find_packages_by_codes(&request.package_codes)
            .await?;
        if packages.is_empty() {
            return Err(LedgerError::NotFound {
                entity: "package",
                reference: request.package_codes.join(","),
            });
        }

        let shipments = self.fetch_shipments(&packages).await?;

        let manifest_ref = request
            .manifest_ref
            .clone()
            .unwrap_or_else(|| format!("MAN-{}", Utc::now().timestamp_millis()));

        if let Some(existing) = self.store.find_manifest_by_ref(&manifest_ref).await? {
            info!(manifest_ref = %manifest_ref, "manifest already exists, resuming build");
            return self.resume(existing, &packages, &shipments).await;
        }

        let total_weight = distinct_shipment_weight(&packages, &shipments);
        let total_pieces = packages.len() as i64;

        let manifest = Manifest {
            id: Uuid::new_v4(),
            manifest_ref: manifest_ref.clone(),
            origin_hub: request.origin_hub,
            destination: request.destination,
            carrier_code: request.carrier_code,
            manifest_date: Utc::now(),
            total_weight,
            total_pieces,
            status: ManifestStatus::Scheduled,
            created_by: request.created_by,
        };
        self.store.insert_manifest(&manifest).await?;

        // From here on the manifest row exists: any failure leaves a
        // partial build that the same reference can resume.
        let items = items_for(&manifest.id, &packages, &shipments, &HashSet::new());
        self.complete(&manifest, &packages, items).await?;

        info!(
            manifest_ref = %manifest.manifest_ref,
            total_weight = manifest.total_weight,
            total_pieces = manifest.total_pieces,
            "manifest built"
        );
        Ok(manifest)
    }

    /// Finish a build whose manifest row already exists: insert whatever
    /// items are missing, reassign scans, and recompute totals from the
    /// final item set.
    async fn resume(
        &self,
        manifest: Manifest,
        packages: &[Package],
        shipments: &HashMap<Uuid, Shipment>,
    ) -> Result<Manifest> {
        let existing = self
            .store
            .list_manifest_items(manifest.id)
            .await
            .map_err(|e| self.partial(&manifest.manifest_ref, e))?;
        let present: HashSet<Uuid> = existing.iter().map(|i| i.package_id).collect();

        let missing = items_for(&manifest.id, packages, shipments, &present);
        self.complete(&manifest, packages, missing).await?;

        // Totals are derived from the items actually present, which after
        // completion is the union of both attempts.
        let items = self
            .store
            .list_manifest_items(manifest.id)
            .await
            .map_err(|e| self.partial(&manifest.manifest_ref, e))?;
        let total_pieces = items.len() as i64;
        let total_weight = distinct_item_weight(&items);
        self.store
            .update_manifest_totals(manifest.id, total_weight, total_pieces)
            .await
            .map_err(|e| self.partial(&manifest.manifest_ref, e))?;

        info!(
            manifest_ref = %manifest.manifest_ref,
            total_pieces = total_pieces,
            "manifest build resumed"
        );
        Ok(Manifest {
            total_weight,
            total_pieces,
            ..manifest
        })
    }

    async fn complete(
        &self,
        manifest: &Manifest,
        packages: &[Package],
        items: Vec<ManifestItem>,
    ) -> Result<()> {
        self.store
            .insert_manifest_items(&items)
            .await
            .map_err(|e| self.partial(&manifest.manifest_ref, e))?;

        let package_ids: Vec<Uuid> = packages.iter().map(|p| p.id).collect();
        self.store
            .assign_scans_to_manifest(manifest.id, &package_ids)
            .await
            .map_err(|e| self.partial(&manifest.manifest_ref, e))?;
        Ok(())
    }

    async fn fetch_shipments(&self, packages: &[Package]) -> Result<HashMap<Uuid, Shipment>> {
        // One batched lookup for all distinct shipments, not one per package.
        let shipment_ids: Vec<Uuid> = packages
            .iter()
            .filter_map(|p| p.shipment_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let shipments = self.store.find_shipments_by_ids(&shipment_ids).await?;
        Ok(shipments.into_iter().map(|s| (s.id, s)).collect())
    }

    fn partial(&self, manifest_ref: &str, source: StorageError) -> LedgerError {
        warn!(
            manifest_ref = %manifest_ref,
            error = %source,
            "manifest build interrupted mid-sequence"
        );
        LedgerError::PartialWrite {
            reference: manifest_ref.to_string(),
        }
    }
}

fn validate(request: &BuildManifest) -> Result<()> {
    if request.origin_hub.trim().len() < 2 {
        return Err(LedgerError::Validation("originHub is too short".into()));
    }
    if request.destination.trim().len() < 2 {
        return Err(LedgerError::Validation("destination is too short".into()));
    }
    if request.carrier_code.trim().is_empty() {
        return Err(LedgerError::Validation("carrier code is required".into()));
    }
    if request.package_codes.is_empty() {
        return Err(LedgerError::Validation(
            "packageCodes must not be empty".into(),
        ));
    }
    Ok(())
}

/// Weight summed once per distinct shipment id among the packages.
fn distinct_shipment_weight(packages: &[Package], shipments: &HashMap<Uuid, Shipment>) -> f64 {
    let mut counted: HashSet<Uuid> = HashSet::new();
    let mut total = 0.0;
    for package in packages {
        if let Some(shipment_id) = package.shipment_id {
            if counted.insert(shipment_id) {
                if let Some(shipment) = shipments.get(&shipment_id) {
                    total += shipment.weight.unwrap_or(0.0);
                }
            }
        }
    }
    total
}

/// Same dedupe, but over item weight snapshots (used when repairing totals
/// on resume, where the shipments themselves need not be re-fetched).
fn distinct_item_weight(items: &[ManifestItem]) -> f64 {
    let mut counted: HashSet<Uuid> = HashSet::new();
    let mut total = 0.0;
    for item in items {
        if let Some(shipment_id) = item.shipment_id {
            if counted.insert(shipment_id) {
                total += item.weight.unwrap_or(0.0);
            }
        }
    }
    total
}

fn items_for(
    manifest_id: &Uuid,
    packages: &[Package],
    shipments: &HashMap<Uuid, Shipment>,
    already_present: &HashSet<Uuid>,
) -> Vec<ManifestItem> {
    packages
        .iter()
        .filter(|p| !already_present.contains(&p.id))
        .map(|p| ManifestItem {
            id: Uuid::new_v4(),
            manifest_id: *manifest_id,
            package_id: p.id,
            shipment_id: p.shipment_id,
            weight: p
                .shipment_id
                .and_then(|id| shipments.get(&id))
                .and_then(|s| s.weight),
        })
        .collect()
}
