//! Catalog repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use facture_core::{CatalogProduct, CatalogRepository, Error, FuzzyCandidate, Result};

/// PostgreSQL implementation of read-only catalog lookups.
pub struct PgCatalogRepository {
    pool: Pool<Postgres>,
}

impl PgCatalogRepository {
    /// Create a new PgCatalogRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn by_identifiers(
        &self,
        codes: &[String],
        barcodes: &[String],
        skus: &[String],
    ) -> Result<Vec<CatalogProduct>> {
        if codes.is_empty() && barcodes.is_empty() && skus.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query(
            "SELECT id, name, code, barcode, sku
             FROM product
             WHERE code = ANY($1) OR barcode = ANY($2) OR sku = ANY($3)",
        )
        .bind(codes)
        .bind(barcodes)
        .bind(skus)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| CatalogProduct {
                id: row.get("id"),
                name: row.get("name"),
                code: row.get("code"),
                barcode: row.get("barcode"),
                sku: row.get("sku"),
            })
            .collect())
    }

    async fn by_categories(&self, category_codes: &[String]) -> Result<Vec<FuzzyCandidate>> {
        if category_codes.is_empty() {
            return Ok(Vec::new());
        }

        // A product belongs to the pool when any of its category tiers hits
        // one of the requested codes. Products without a name cannot be
        // fuzzy-matched and are excluded here rather than downstream.
        let rows = sqlx::query(
            "SELECT DISTINCT p.id, p.name
             FROM product p
             JOIN product_category pc ON pc.product_id = p.id
             WHERE p.name IS NOT NULL
               AND (pc.main_category = ANY($1)
                    OR pc.second_category = ANY($1)
                    OR pc.third_category = ANY($1))",
        )
        .bind(category_codes)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| FuzzyCandidate {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }
}
