//! # facture-db
//!
//! PostgreSQL storage layer for facture.
//!
//! This crate provides:
//! - Connection pool management
//! - The invoice job queue with lock-and-skip claiming
//! - Repository implementations for line items, the category dictionary
//!   and the product catalog
//! - A LISTEN/NOTIFY event source for push-mode workers
//!
//! ## Example
//!
//! ```rust,ignore
//! use facture_db::Database;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/facture").await?;
//!
//!     if let Some(job) = db.invoices.claim_oldest_pending().await? {
//!         println!("Claimed invoice: {}", job.invoice_id);
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod dictionary;
pub mod invoices;
pub mod line_items;
pub mod listener;
pub mod pool;

// Re-export core types
pub use facture_core::*;

// Re-export repository implementations
pub use catalog::PgCatalogRepository;
pub use dictionary::PgDictionaryRepository;
pub use invoices::PgInvoiceQueue;
pub use line_items::PgLineItemRepository;
pub use listener::PgNotifyEventSource;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Aggregated database access: one pool, all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Invoice job queue.
    pub invoices: PgInvoiceQueue,
    /// Line-item repository for extraction and matching stages.
    pub line_items: PgLineItemRepository,
    /// Category-dictionary reference data.
    pub dictionary: PgDictionaryRepository,
    /// Read-only product catalog lookups.
    pub catalog: PgCatalogRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            invoices: PgInvoiceQueue::new(pool.clone()),
            line_items: PgLineItemRepository::new(pool.clone()),
            dictionary: PgDictionaryRepository::new(pool.clone()),
            catalog: PgCatalogRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect to the database and build all repositories.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with a custom pool configuration.
    pub async fn connect_with_config(database_url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(database_url, config).await?;
        Ok(Self::new(pool))
    }

    /// Build a push-mode event source sharing this database's pool.
    pub fn event_source(&self) -> PgNotifyEventSource {
        PgNotifyEventSource::new(self.pool.clone())
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Ok(())
    }
}
