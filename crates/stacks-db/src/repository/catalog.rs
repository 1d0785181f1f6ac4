//! # Catalog Repository
//!
//! Catalog entries are owned by the catalog service; circulation only needs
//! to look them up and to seed them in tests and demo databases.
//!
//! Counts are not columns here. [`CatalogRepository::summary`] computes them
//! from the copy and reservation tables on each call.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stacks_core::{CatalogEntry, CatalogSummary, CopyCounts};

const ENTRY_COLUMNS: &str = "isbn, title, author, publisher, published_year";

/// Repository for catalog entries.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Inserts a catalog entry.
    ///
    /// ## Returns
    /// * `Err(UniqueViolation)` - an entry with this ISBN already exists
    pub async fn insert(&self, entry: &CatalogEntry) -> DbResult<()> {
        debug!(isbn = %entry.isbn, title = %entry.title, "Inserting catalog entry");

        sqlx::query(
            "INSERT INTO catalog_entries (isbn, title, author, publisher, published_year)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&entry.isbn)
        .bind(&entry.title)
        .bind(&entry.author)
        .bind(&entry.publisher)
        .bind(entry.published_year)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: entry.isbn.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    /// Gets an entry by ISBN.
    pub async fn get(&self, isbn: &str) -> DbResult<Option<CatalogEntry>> {
        let entry = sqlx::query_as::<_, CatalogEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM catalog_entries WHERE isbn = ?1"
        ))
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(entry)
    }

    /// True if the ISBN is catalogued.
    pub async fn exists(&self, isbn: &str) -> DbResult<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM catalog_entries WHERE isbn = ?1")
                .bind(isbn)
                .fetch_optional(&self.pool)
                .await?;

        Ok(found.is_some())
    }

    /// Lists entries ordered by title.
    pub async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<CatalogEntry>> {
        let entries = sqlx::query_as::<_, CatalogEntry>(&format!(
            "SELECT {ENTRY_COLUMNS} FROM catalog_entries
             ORDER BY title, isbn
             LIMIT ?1 OFFSET ?2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// Number of catalogued titles.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Entry plus live counters and queue length, or `None` if not catalogued.
    pub async fn summary(&self, isbn: &str) -> DbResult<Option<CatalogSummary>> {
        let Some(entry) = self.get(isbn).await? else {
            return Ok(None);
        };

        let counts = sqlx::query_as::<_, CopyCounts>(
            r#"
            SELECT
                COUNT(*) AS total,
                COALESCE(SUM(CASE WHEN status = 'in_library' THEN 1 ELSE 0 END), 0) AS available,
                COALESCE(SUM(CASE WHEN status = 'reserved' THEN 1 ELSE 0 END), 0) AS reserved
            FROM copies
            WHERE isbn = ?1
            "#,
        )
        .bind(isbn)
        .fetch_one(&self.pool)
        .await?;

        let queue_length: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservation_records WHERE isbn = ?1 AND status = 'active'",
        )
        .bind(isbn)
        .fetch_one(&self.pool)
        .await?;

        Ok(Some(CatalogSummary {
            entry,
            counts,
            queue_length,
        }))
    }
}
