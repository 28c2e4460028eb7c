//! waybill-server: the package-movement API.
//!
//! Hosts scan ingestion, manifest consolidation, payment recording and
//! the AR summary over SQLite storage.

use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use waybill::api::{self, AppState};
use waybill::config::{Config, LOG_ENV_VAR};
use waybill::storage::SqliteLedgerStore;

/// Initialize tracing with the WAYBILL_LOG environment variable.
///
/// Defaults to "info" level if WAYBILL_LOG is not set.
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV_VAR)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;
    info!(url = %config.storage.url, "connecting to storage");

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&config.storage.url)
        .await?;
    let store = SqliteLedgerStore::new(pool);
    store.init().await?;

    let state = AppState::new(Arc::new(store));
    let router = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "waybill server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("waybill server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to install ctrl-c handler");
    }
}
