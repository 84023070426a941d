//! Line-item repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use facture_core::{
    Error, ExtractionStatus, LineItem, LineItemRepository, MatchCandidate, MatchResult,
    NewLineItem, Result, ScoredKeyword,
};

/// PostgreSQL implementation of the line-item repository.
pub struct PgLineItemRepository {
    pool: Pool<Postgres>,
}

impl PgLineItemRepository {
    /// Create a new PgLineItemRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Parse a line_item row into a LineItem.
    fn parse_line_item_row(row: sqlx::postgres::PgRow) -> LineItem {
        LineItem {
            id: row.get("id"),
            invoice_id: row.get("invoice_id"),
            raw_name: row.get("raw_name"),
            normalized_name: row.get("normalized_name"),
            code: row.get("code"),
            barcode: row.get("barcode"),
            sku: row.get("sku"),
            quantity: row.get("quantity"),
            unit_price: row.get("unit_price"),
            currency: row.get("currency"),
            status: ExtractionStatus::parse(row.get("status")),
        }
    }
}

#[async_trait]
impl LineItemRepository for PgLineItemRepository {
    async fn insert_batch(&self, items: &[NewLineItem]) -> Result<Vec<LineItem>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let now = Utc::now();
        let mut stored = Vec::with_capacity(items.len());

        // Inserted one at a time inside the transaction so returned ids
        // keep input order.
        for item in items {
            let row = sqlx::query(
                "INSERT INTO line_item
                     (id, invoice_id, raw_name, code, barcode, sku, quantity,
                      unit_price, currency, status, created_at, updated_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
                 RETURNING id, invoice_id, raw_name, normalized_name, code, barcode, sku,
                           quantity, unit_price, currency, status",
            )
            .bind(Uuid::new_v4())
            .bind(item.invoice_id)
            .bind(&item.raw_name)
            .bind(&item.code)
            .bind(&item.barcode)
            .bind(&item.sku)
            .bind(item.quantity)
            .bind(item.unit_price)
            .bind(&item.currency)
            .bind(item.status.as_str())
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .map_err(Error::Database)?;

            stored.push(Self::parse_line_item_row(row));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(stored)
    }

    async fn persist_match_stage(
        &self,
        invoice_id: Uuid,
        results: &[MatchResult],
        keywords: &[ScoredKeyword],
        candidates: &[MatchCandidate],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let now = Utc::now();

        for result in results {
            let tiers = result.tiers.as_ref();
            sqlx::query(
                "UPDATE line_item
                 SET normalized_name = $2,
                     main_category = $3, main_category_ratio = $4,
                     second_category = $5, second_category_ratio = $6,
                     third_category = $7, third_category_ratio = $8,
                     matched_product_id = $9,
                     match_type = $10,
                     match_confidence = $11,
                     match_reason = $12,
                     status = $13,
                     updated_at = $14
                 WHERE id = $1",
            )
            .bind(result.line_item_id)
            .bind(&result.normalized_name)
            .bind(tiers.map(|t| t.main_category.as_str()))
            .bind(tiers.map(|t| t.main_ratio))
            .bind(tiers.and_then(|t| t.second_category.as_deref()))
            .bind(tiers.and_then(|t| t.second_ratio))
            .bind(tiers.and_then(|t| t.third_category.as_deref()))
            .bind(tiers.and_then(|t| t.third_ratio))
            .bind(result.matched_product_id)
            .bind(result.match_type.as_str())
            .bind(result.confidence)
            .bind(&result.match_reason)
            .bind(result.status.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        for keyword in keywords {
            sqlx::query(
                "INSERT INTO name_keyword (id, line_item_id, keyword, score, source, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 ON CONFLICT (line_item_id, keyword)
                 DO UPDATE SET score = EXCLUDED.score, source = EXCLUDED.source",
            )
            .bind(Uuid::new_v4())
            .bind(keyword.line_item_id)
            .bind(&keyword.keyword)
            .bind(keyword.score)
            .bind(keyword.source.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        for candidate in candidates {
            sqlx::query(
                "INSERT INTO match_candidate
                     (id, line_item_id, product_id, confidence, match_type, match_reason, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7)",
            )
            .bind(Uuid::new_v4())
            .bind(candidate.line_item_id)
            .bind(candidate.product_id)
            .bind(candidate.confidence)
            .bind(candidate.match_type.as_str())
            .bind(&candidate.match_reason)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        }

        // The invoice moves to MATCHED in the same transaction: a crash
        // anywhere above leaves it EXTRACTED with no partial match rows.
        let updated = sqlx::query(
            "UPDATE invoice
             SET status = 'MATCHED', error_message = NULL, updated_at = $2
             WHERE invoice_id = $1",
        )
        .bind(invoice_id)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        if updated.rows_affected() == 0 {
            return Err(Error::InvoiceNotFound(invoice_id));
        }

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn list_for_invoice(&self, invoice_id: Uuid) -> Result<Vec<LineItem>> {
        let rows = sqlx::query(
            "SELECT id, invoice_id, raw_name, normalized_name, code, barcode, sku,
                    quantity, unit_price, currency, status
             FROM line_item
             WHERE invoice_id = $1
             ORDER BY created_at ASC",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.into_iter().map(Self::parse_line_item_row).collect())
    }
}
