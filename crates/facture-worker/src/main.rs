//! facture-worker: invoice processing daemon.
//!
//! Claims uploaded invoices from the queue, extracts their line items,
//! matches them against the product catalog and records the outcome. Runs
//! until interrupted.

mod config;
mod executor;
mod mode;
mod notify_loop;
mod reader;

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use facture_db::Database;

use crate::config::WorkerConfig;
use crate::executor::JobExecutor;
use crate::notify_loop::NotifyLoop;
use crate::reader::PlainTextReader;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = WorkerConfig::from_env()?;
    info!(
        subsystem = "worker",
        component = "main",
        mode = %config.mode,
        poll_interval_secs = config.poll_interval.as_secs(),
        document_dir = %config.document_dir.display(),
        "Starting facture worker"
    );

    let db = Database::connect(&config.database_url).await?;

    let executor = Arc::new(JobExecutor::new(
        Arc::new(facture_db::PgInvoiceQueue::new(db.pool.clone())),
        Arc::new(facture_db::PgLineItemRepository::new(db.pool.clone())),
        Arc::new(facture_db::PgDictionaryRepository::new(db.pool.clone())),
        Arc::new(facture_db::PgCatalogRepository::new(db.pool.clone())),
        Arc::new(PlainTextReader::new(config.document_dir.clone())),
    ));

    let event_source = config
        .mode
        .is_push()
        .then(|| Arc::new(db.event_source()) as Arc<dyn facture_core::JobEventSource>);

    NotifyLoop::new(
        executor,
        event_source,
        config.mode,
        config.poll_interval,
    )
    .run()
    .await;

    Ok(())
}
