//! HTTP sink: replays queued scans into the scan ingestion endpoint.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use crate::interfaces::scan_sink::{Result, ScanSink, SinkError};
use crate::model::QueuedScan;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScanPayload<'a> {
    code: &'a str,
    scan_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operator_id: Option<&'a str>,
}

/// Posts scans to `POST {endpoint}` as the scan ingestion API expects.
///
/// Tracks an online flag (the `navigator.onLine` analog): callers toggle
/// it from their connectivity signal, and a transport-level failure flips
/// it off until somebody reports connectivity back.
pub struct HttpScanSink {
    client: reqwest::Client,
    endpoint: String,
    online: AtomicBool,
}

impl HttpScanSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            online: AtomicBool::new(true),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

#[async_trait]
impl ScanSink for HttpScanSink {
    fn online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }

    async fn submit(&self, scan: &QueuedScan) -> Result<()> {
        let payload = ScanPayload {
            code: &scan.code,
            scan_type: scan.scan_type.as_str(),
            location: scan.location.as_deref(),
            operator_id: scan.operator_id.as_deref(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|err| {
                self.online.store(false, Ordering::Relaxed);
                SinkError::Unavailable(err.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(code = %scan.code, "queued scan acknowledged upstream");
            return Ok(());
        }

        let message = response.text().await.unwrap_or_default();
        Err(SinkError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}
