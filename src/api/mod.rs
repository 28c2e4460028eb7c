//! HTTP surface: scan ingestion, manifest build, payments, AR summary.
//!
//! Thin JSON adapters over the services; all decisions live in the
//! service modules and errors map onto the stable code/status table in
//! `ApiError`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;
use uuid::Uuid;

use crate::finance::{ArSummary, InvoiceLedger, PaymentHistory, PaymentOutcome, RecordPayment};
use crate::interfaces::{LedgerError, StorageError};
use crate::ledger::{RecordScan, ScanLedger};
use crate::manifest::{BuildManifest, ManifestConsolidator};
use crate::model::{Manifest, Package, ScanEvent, ScanType};

/// Shared service handles for the router.
#[derive(Clone)]
pub struct AppState {
    pub scans: Arc<ScanLedger>,
    pub manifests: Arc<ManifestConsolidator>,
    pub finance: Arc<InvoiceLedger>,
}

impl AppState {
    pub fn new(store: Arc<dyn crate::interfaces::LedgerStore>) -> Self {
        Self {
            scans: Arc::new(ScanLedger::new(store.clone())),
            manifests: Arc::new(ManifestConsolidator::new(store.clone())),
            finance: Arc::new(InvoiceLedger::new(store)),
        }
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/scans", post(record_scan))
        .route("/api/manifests", post(build_manifest))
        .route("/api/payments", post(record_payment).get(payment_history))
        .route("/api/finance/ar", get(ar_summary))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// API failure with a stable machine code.
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "validation",
            message: message.into(),
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let (status, code) = match &err {
            LedgerError::NotFound { .. } => (StatusCode::NOT_FOUND, err.code()),
            LedgerError::Validation(_) => (StatusCode::BAD_REQUEST, err.code()),
            LedgerError::PartialWrite { .. } => (StatusCode::CONFLICT, err.code()),
            LedgerError::Storage(StorageError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
            }
            LedgerError::Storage(source) => {
                error!(error = %source, "storage failure surfaced to API");
                (StatusCode::INTERNAL_SERVER_ERROR, err.code())
            }
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.message,
            "code": self.code,
        });
        (self.status, Json(body)).into_response()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScanRequest {
    code: String,
    #[serde(default)]
    scan_type: ScanType,
    location: Option<String>,
    operator_id: Option<String>,
}

#[derive(Serialize)]
struct ScanResponse {
    scan: ScanEvent,
    package: Package,
}

async fn record_scan(
    State(state): State<AppState>,
    payload: Result<Json<ScanRequest>, JsonRejection>,
) -> Result<Json<ScanResponse>, ApiError> {
    let Json(request) = payload?;
    let outcome = state
        .scans
        .record_scan(RecordScan {
            code: request.code,
            scan_type: request.scan_type,
            location: request.location,
            operator_id: request.operator_id,
        })
        .await?;
    Ok(Json(ScanResponse {
        scan: outcome.event,
        package: outcome.package,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ManifestRequest {
    origin_hub: String,
    destination: String,
    airline_code: String,
    package_codes: Vec<String>,
    manifest_ref: Option<String>,
    created_by: Option<String>,
}

#[derive(Serialize)]
struct ManifestResponse {
    manifest: Manifest,
}

async fn build_manifest(
    State(state): State<AppState>,
    payload: Result<Json<ManifestRequest>, JsonRejection>,
) -> Result<Json<ManifestResponse>, ApiError> {
    let Json(request) = payload?;
    let manifest = state
        .manifests
        .build_manifest(BuildManifest {
            origin_hub: request.origin_hub,
            destination: request.destination,
            carrier_code: request.airline_code,
            package_codes: request.package_codes,
            manifest_ref: request.manifest_ref,
            created_by: request.created_by,
        })
        .await?;
    Ok(Json(ManifestResponse { manifest }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentRequest {
    invoice_id: Uuid,
    amount: f64,
    payment_date: Option<DateTime<Utc>>,
    payment_mode: String,
    reference: Option<String>,
    operator_id: Option<String>,
}

async fn record_payment(
    State(state): State<AppState>,
    payload: Result<Json<PaymentRequest>, JsonRejection>,
) -> Result<Json<PaymentOutcome>, ApiError> {
    let Json(request) = payload?;
    let outcome = state
        .finance
        .record_payment(RecordPayment {
            invoice_id: request.invoice_id,
            amount: request.amount,
            payment_date: request.payment_date,
            payment_mode: request.payment_mode,
            reference: request.reference,
            created_by: request.operator_id,
        })
        .await?;
    Ok(Json(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentHistoryParams {
    invoice_id: Option<Uuid>,
}

async fn payment_history(
    State(state): State<AppState>,
    Query(params): Query<PaymentHistoryParams>,
) -> Result<Json<PaymentHistory>, ApiError> {
    let invoice_id = params
        .invoice_id
        .ok_or_else(|| ApiError::validation("invoiceId is required"))?;
    let history = state.finance.payment_history(invoice_id).await?;
    Ok(Json(history))
}

async fn ar_summary(State(state): State<AppState>) -> Result<Json<ArSummary>, ApiError> {
    let summary = state.finance.summarize_ar().await?;
    Ok(Json(summary))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::interfaces::store::LedgerStore;
    use crate::model::{Invoice, InvoiceStatus, PackageStatus};
    use crate::storage::MockLedgerStore;

    async fn seeded_router() -> (Router, Arc<MockLedgerStore>) {
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
        let state = AppState::new(store.clone());
        (router(state), store)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_scan_known_code_returns_event_and_package() {
        let (router, _) = seeded_router().await;
        let response = router
            .oneshot(post_json(
                "/api/scans",
                json!({"code": "BC-1", "scanType": "delivered"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["package"]["status"], "delivered");
        assert_eq!(body["scan"]["scan_type"], "delivered");
    }

    #[tokio::test]
    async fn test_scan_unknown_code_is_404() {
        let (router, _) = seeded_router().await;
        let response = router
            .oneshot(post_json("/api/scans", json!({"code": "TG1"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn test_scan_missing_code_is_400() {
        let (router, _) = seeded_router().await;
        let response = router
            .oneshot(post_json("/api/scans", json!({"scanType": "scan"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_manifest_schema_violation_is_400() {
        let (router, _) = seeded_router().await;
        let response = router
            .oneshot(post_json(
                "/api/manifests",
                json!({
                    "originHub": "DEL",
                    "destination": "DXB",
                    "airlineCode": "EK",
                    "packageCodes": []
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], "validation");
    }

    #[tokio::test]
    async fn test_payment_flow_and_ar_summary() {
        let (router, store) = seeded_router().await;
        let invoice = Invoice {
            id: Uuid::new_v4(),
            reference: "INV-7".to_string(),
            amount: 1000.0,
            status: InvoiceStatus::Pending,
            created_at: Utc::now(),
        };
        store.insert_invoice(&invoice).await.unwrap();

        let response = router
            .clone()
            .oneshot(post_json(
                "/api/payments",
                json!({
                    "invoiceId": invoice.id,
                    "amount": 400.0,
                    "paymentMode": "upi"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["totals"]["outstanding"], 600.0);
        assert_eq!(body["totals"]["status"], "partially_paid");

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/finance/ar")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["totalOutstanding"], 600.0);
        assert_eq!(body["buckets"]["partially_paid"]["invoiceCount"], 1);
    }

    #[tokio::test]
    async fn test_payment_unknown_invoice_is_404() {
        let (router, _) = seeded_router().await;
        let response = router
            .oneshot(post_json(
                "/api/payments",
                json!({
                    "invoiceId": Uuid::new_v4(),
                    "amount": 100.0,
                    "paymentMode": "cash"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
