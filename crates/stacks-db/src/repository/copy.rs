//! # Copy Repository (Copy Registry)
//!
//! Owns the physical copies of each title and their individual status.
//!
//! ## Conditional Transitions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              Why transition() is a compare-and-swap                     │
//! │                                                                         │
//! │  Borrow A: find_available_copy → copy-7                                │
//! │  Borrow B: find_available_copy → copy-7   (same row, read in parallel) │
//! │                                                                         │
//! │  Borrow A: UPDATE copies SET status='borrowed'                         │
//! │            WHERE copy_id='copy-7' AND status='in_library'  → 1 row ✓   │
//! │  Borrow B: UPDATE copies SET status='borrowed'                         │
//! │            WHERE copy_id='copy-7' AND status='in_library'  → 0 rows ✗  │
//! │                                                                         │
//! │  B gets TransitionConflict instead of silently double-lending copy-7.  │
//! │  A read-then-write would have let both succeed.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Counts are aggregates over live rows, never a cached column.

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stacks_core::{BookCopy, CopyCounts, CopyStatus, CoreError};

const COPY_COLUMNS: &str = "copy_id, isbn, location, status";

/// Repository for physical copies.
#[derive(Debug, Clone)]
pub struct CopyRepository {
    pool: SqlitePool,
}

impl CopyRepository {
    /// Creates a new CopyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CopyRepository { pool }
    }

    /// Registers a new IN_LIBRARY copy for a catalog entry.
    ///
    /// ## Returns
    /// * `Err(Domain(CatalogEntryNotFound))` - no catalog entry for `isbn`
    pub async fn register(&self, isbn: &str, location: &str) -> DbResult<BookCopy> {
        let copy_id = generate_copy_id();

        debug!(copy_id = %copy_id, isbn = %isbn, "Registering copy");

        let result = sqlx::query_as::<_, BookCopy>(&format!(
            "INSERT INTO copies (copy_id, isbn, location, status)
             VALUES (?1, ?2, ?3, ?4)
             RETURNING {COPY_COLUMNS}"
        ))
        .bind(&copy_id)
        .bind(isbn)
        .bind(location)
        .bind(CopyStatus::InLibrary)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(copy) => Ok(copy),
            Err(err) => match DbError::from(err) {
                DbError::ForeignKeyViolation { .. } => Err(CoreError::CatalogEntryNotFound {
                    isbn: isbn.to_string(),
                }
                .into()),
                other => Err(other),
            },
        }
    }

    /// Gets a copy by id.
    pub async fn get(&self, copy_id: &str) -> DbResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>(&format!(
            "SELECT {COPY_COLUMNS} FROM copies WHERE copy_id = ?1"
        ))
        .bind(copy_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(copy)
    }

    /// Gets a copy by id, failing with `CopyNotFound` if absent.
    pub async fn require(&self, copy_id: &str) -> DbResult<BookCopy> {
        self.get(copy_id).await?.ok_or_else(|| {
            CoreError::CopyNotFound {
                copy_id: copy_id.to_string(),
            }
            .into()
        })
    }

    /// Lists all copies of a title.
    pub async fn list_by_isbn(&self, isbn: &str) -> DbResult<Vec<BookCopy>> {
        let copies = sqlx::query_as::<_, BookCopy>(&format!(
            "SELECT {COPY_COLUMNS} FROM copies WHERE isbn = ?1 ORDER BY copy_id"
        ))
        .bind(isbn)
        .fetch_all(&self.pool)
        .await?;

        Ok(copies)
    }

    /// Returns one IN_LIBRARY copy of the title, or `None`.
    ///
    /// Which copy is unspecified; callers must still win the
    /// [`transition`](Self::transition) to own it.
    pub async fn find_available_copy(&self, isbn: &str) -> DbResult<Option<BookCopy>> {
        let copy = sqlx::query_as::<_, BookCopy>(&format!(
            "SELECT {COPY_COLUMNS} FROM copies
             WHERE isbn = ?1 AND status = ?2
             ORDER BY copy_id
             LIMIT 1"
        ))
        .bind(isbn)
        .bind(CopyStatus::InLibrary)
        .fetch_optional(&self.pool)
        .await?;

        Ok(copy)
    }

    /// Conditionally moves a copy from `from` to `to`.
    ///
    /// ## Returns
    /// * `Ok(BookCopy)` - the updated copy
    /// * `Err(Domain(IllegalTransition))` - edge not in the transition table
    /// * `Err(Domain(TransitionConflict))` - current status was not `from`
    /// * `Err(Domain(CopyNotFound))` - no such copy
    pub async fn transition(
        &self,
        copy_id: &str,
        from: CopyStatus,
        to: CopyStatus,
    ) -> DbResult<BookCopy> {
        from.check_transition(to, copy_id)?;

        debug!(copy_id = %copy_id, from = %from, to = %to, "Transitioning copy");

        let updated = sqlx::query_as::<_, BookCopy>(&format!(
            "UPDATE copies SET status = ?3
             WHERE copy_id = ?1 AND status = ?2
             RETURNING {COPY_COLUMNS}"
        ))
        .bind(copy_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(copy) = updated {
            return Ok(copy);
        }

        let current = self.require(copy_id).await?;
        Err(CoreError::TransitionConflict {
            copy_id: copy_id.to_string(),
            expected: from.to_string(),
            actual: current.status.to_string(),
        }
        .into())
    }

    /// Administrative move to DAMAGED or LOST from whatever the copy is now.
    pub async fn withdraw(&self, copy_id: &str, to: CopyStatus) -> DbResult<BookCopy> {
        let current = self.require(copy_id).await?;
        if !to.is_withdrawn() {
            return Err(CoreError::illegal_transition("copy", copy_id, current.status, to).into());
        }
        self.transition(copy_id, current.status, to).await
    }

    /// Live aggregate for a title.
    pub async fn counts_by_isbn(&self, isbn: &str) -> DbResult<CopyCounts> {
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

        Ok(counts)
    }

    /// Number of copies of a title currently in `status`.
    pub async fn count_with_status(&self, isbn: &str, status: CopyStatus) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM copies WHERE isbn = ?1 AND status = ?2")
                .bind(isbn)
                .bind(status)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Helper to generate a new copy ID.
pub fn generate_copy_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{seed_title, test_db};

    #[tokio::test]
    async fn test_register_requires_catalog_entry() {
        let db = test_db().await;
        let err = db.copies().register("NOPE", "Stack 1").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CatalogEntryNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_find_available_copy() {
        let db = test_db().await;
        let copies = seed_title(&db, "B001", 2).await;

        let found = db.copies().find_available_copy("B001").await.unwrap().unwrap();
        assert!(copies.iter().any(|c| c.copy_id == found.copy_id));

        for copy in &copies {
            db.copies()
                .transition(&copy.copy_id, CopyStatus::InLibrary, CopyStatus::Borrowed)
                .await
                .unwrap();
        }
        assert!(db.copies().find_available_copy("B001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transition_is_conditional() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);
        let repo = db.copies();

        let updated = repo
            .transition(&copy.copy_id, CopyStatus::InLibrary, CopyStatus::Borrowed)
            .await
            .unwrap();
        assert_eq!(updated.status, CopyStatus::Borrowed);

        // Second borrower raced on a stale read
        let err = repo
            .transition(&copy.copy_id, CopyStatus::InLibrary, CopyStatus::Borrowed)
            .await
            .unwrap_err();
        match err {
            DbError::Domain(CoreError::TransitionConflict { expected, actual, .. }) => {
                assert_eq!(expected, "in_library");
                assert_eq!(actual, "borrowed");
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transition_rejects_edges_outside_table() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);

        db.copies().withdraw(&copy.copy_id, CopyStatus::Lost).await.unwrap();

        let err = db
            .copies()
            .transition(&copy.copy_id, CopyStatus::Lost, CopyStatus::InLibrary)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::IllegalTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_transition_unknown_copy() {
        let db = test_db().await;
        let err = db
            .copies()
            .transition("missing", CopyStatus::InLibrary, CopyStatus::Borrowed)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::CopyNotFound { .. })));
    }

    #[tokio::test]
    async fn test_counts_follow_live_rows() {
        let db = test_db().await;
        let copies = seed_title(&db, "B001", 3).await;
        let repo = db.copies();

        assert_eq!(
            repo.counts_by_isbn("B001").await.unwrap(),
            CopyCounts {
                total: 3,
                available: 3,
                reserved: 0
            }
        );

        repo.transition(&copies[0].copy_id, CopyStatus::InLibrary, CopyStatus::Borrowed)
            .await
            .unwrap();
        repo.transition(&copies[1].copy_id, CopyStatus::InLibrary, CopyStatus::Reserved)
            .await
            .unwrap();
        repo.withdraw(&copies[2].copy_id, CopyStatus::Damaged).await.unwrap();

        let counts = repo.counts_by_isbn("B001").await.unwrap();
        assert_eq!(counts.total, 3);
        assert_eq!(counts.available, 0);
        assert_eq!(counts.reserved, 1);
        assert_eq!(
            repo.count_with_status("B001", CopyStatus::Damaged).await.unwrap(),
            1
        );

        // Unknown ISBN aggregates to zero rather than erroring
        assert_eq!(repo.counts_by_isbn("NONE").await.unwrap(), CopyCounts::default());
    }
}
