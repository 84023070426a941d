//! Category-dictionary repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};

use facture_core::{DictionaryRepository, DictionaryRule, Error, KeywordType, Result};

/// PostgreSQL implementation of the category-dictionary repository.
pub struct PgDictionaryRepository {
    pool: Pool<Postgres>,
}

impl PgDictionaryRepository {
    /// Create a new PgDictionaryRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DictionaryRepository for PgDictionaryRepository {
    async fn all_active(&self) -> Result<Vec<DictionaryRule>> {
        let rows = sqlx::query(
            "SELECT id, category_code, category_name, keyword, weight, keyword_type, is_active
             FROM category_dictionary
             WHERE is_active = TRUE
             ORDER BY category_code, keyword",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .into_iter()
            .map(|row| DictionaryRule {
                id: row.get("id"),
                category_code: row.get("category_code"),
                category_name: row.get("category_name"),
                keyword: row.get("keyword"),
                weight: row.get("weight"),
                keyword_type: KeywordType::parse(row.get("keyword_type")),
                is_active: row.get("is_active"),
            })
            .collect())
    }
}
