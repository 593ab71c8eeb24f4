//! Shared setup for the `docvault` binary: tracing, store wiring and output.

use anyhow::Context;
use docvault_core::{Config, SystemClock};
use docvault_services::{create_storage, setup_database, DocumentStore, ReconciliationService};
use serde::Serialize;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "docvault=info";

/// Initialize tracing. Logs go to stderr so stdout carries only command output.
pub fn init_telemetry(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Open the metadata store and blob backend named by `config`.
pub async fn build_store(config: &Config) -> anyhow::Result<Arc<DocumentStore>> {
    let pool = setup_database(config)
        .await
        .context("Failed to set up metadata store")?;
    let storage = create_storage(config)
        .await
        .context("Failed to set up blob storage")?;

    tracing::info!(
        backend = %storage.backend_type(),
        environment = config.environment(),
        "Document store ready"
    );

    Ok(Arc::new(DocumentStore::new(
        pool,
        storage,
        Arc::new(SystemClock),
        config.store_settings(),
    )))
}

pub fn build_reconciliation(
    config: &Config,
    store: Arc<DocumentStore>,
) -> Arc<ReconciliationService> {
    Arc::new(ReconciliationService::new(
        store,
        config.reconciliation_settings(),
    ))
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

/// File name to record for an uploaded path.
pub fn upload_file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document.pdf".to_string())
}
