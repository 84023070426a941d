//! Invoice queue repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use facture_core::{Error, InvoiceJob, InvoiceQueue, InvoiceStatus, Result};

/// PostgreSQL implementation of the invoice queue.
pub struct PgInvoiceQueue {
    pool: Pool<Postgres>,
}

impl PgInvoiceQueue {
    /// Create a new PgInvoiceQueue with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Parse an invoice row into an InvoiceJob.
    fn parse_invoice_row(row: sqlx::postgres::PgRow) -> InvoiceJob {
        InvoiceJob {
            invoice_id: row.get("invoice_id"),
            original_file_name: row.get("original_file_name"),
            file_type: row.get("file_type"),
            file_size: row.get("file_size"),
            source_ref: row.get("source_ref"),
            status: InvoiceStatus::parse(row.get("status")),
            error_message: row.get("error_message"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

#[async_trait]
impl InvoiceQueue for PgInvoiceQueue {
    async fn claim_oldest_pending(&self) -> Result<Option<InvoiceJob>> {
        let now = Utc::now();

        // FOR UPDATE SKIP LOCKED: concurrent claimers never block on each
        // other's candidate row, and no invoice is claimed twice.
        let row = sqlx::query(
            "UPDATE invoice
             SET status = 'PROCESSING', updated_at = $1
             WHERE invoice_id = (
                 SELECT invoice_id FROM invoice
                 WHERE status = 'PENDING'
                 ORDER BY created_at ASC
                 LIMIT 1
                 FOR UPDATE SKIP LOCKED
             )
             RETURNING invoice_id, original_file_name, file_type, file_size, source_ref,
                       status, error_message, created_at, updated_at",
        )
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_invoice_row))
    }

    async fn advance_status(
        &self,
        invoice_id: Uuid,
        status: InvoiceStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let result = sqlx::query(
            "UPDATE invoice
             SET status = $2, error_message = $3, updated_at = $4
             WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .bind(status.as_str())
        .bind(error_message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::InvoiceNotFound(invoice_id));
        }
        Ok(())
    }

    async fn get(&self, invoice_id: Uuid) -> Result<Option<InvoiceJob>> {
        let row = sqlx::query(
            "SELECT invoice_id, original_file_name, file_type, file_size, source_ref,
                    status, error_message, created_at, updated_at
             FROM invoice
             WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(Self::parse_invoice_row))
    }

    async fn pending_count(&self) -> Result<i64> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM invoice WHERE status = 'PENDING'")
                .fetch_one(&self.pool)
                .await
                .map_err(Error::Database)?;

        Ok(count.0)
    }
}
