//! # Borrow Repository (Borrow Ledger)
//!
//! One borrow record per checkout. Records are never deleted; closing a
//! record sets its return date and status.
//!
//! ## Record Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Borrow Record Lifecycle                           │
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── open() → BorrowRecord { status: Borrowed, due = date + period }│
//! │                                                                         │
//! │  2. (OPTIONAL) RENEW, any number of times                              │
//! │     └── renew() → due_date extended, renew_count + 1                   │
//! │                                                                         │
//! │  3. (OPTIONAL) OVERDUE SWEEP                                           │
//! │     └── mark_overdue(today) → status: Overdue (still open)             │
//! │                                                                         │
//! │  4. CLOSE                                                              │
//! │     └── close() → BorrowRecord { status: Returned, return_date }       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The store backs the one-open-record-per-copy rule with a partial unique
//! index, so a racing second `open` fails even if both passed the pre-check.

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stacks_core::{BorrowRecord, BorrowStatus, CoreError, LoanPolicy};

const RECORD_COLUMNS: &str =
    "record_id, user_id, copy_id, borrow_date, due_date, return_date, renew_count, status";

/// Repository for borrow records.
#[derive(Debug, Clone)]
pub struct BorrowRepository {
    pool: SqlitePool,
}

impl BorrowRepository {
    /// Creates a new BorrowRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BorrowRepository { pool }
    }

    /// Opens a BORROWED record. The caller derives `due_date` from its
    /// [`LoanPolicy`].
    ///
    /// ## Returns
    /// * `Err(Domain(AlreadyBorrowed))` - an open record exists for this copy
    pub async fn open(
        &self,
        user_id: &str,
        copy_id: &str,
        borrow_date: NaiveDate,
        due_date: NaiveDate,
    ) -> DbResult<BorrowRecord> {
        if let Some(existing) = self.find_open_by_copy(copy_id).await? {
            return Err(CoreError::AlreadyBorrowed {
                copy_id: copy_id.to_string(),
                record_id: existing.record_id,
            }
            .into());
        }

        let record_id = generate_record_id();

        debug!(
            record_id = %record_id,
            user_id = %user_id,
            copy_id = %copy_id,
            due_date = %due_date,
            "Opening borrow record"
        );

        let result = sqlx::query_as::<_, BorrowRecord>(&format!(
            "INSERT INTO borrow_records (
                record_id, user_id, copy_id, borrow_date, due_date, renew_count, status
             ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(&record_id)
        .bind(user_id)
        .bind(copy_id)
        .bind(borrow_date)
        .bind(due_date)
        .bind(BorrowStatus::Borrowed)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(record) => Ok(record),
            Err(err) => match DbError::from(err) {
                DbError::UniqueViolation { .. } => {
                    let record_id = self
                        .find_open_by_copy(copy_id)
                        .await?
                        .map(|r| r.record_id)
                        .unwrap_or_default();
                    Err(CoreError::AlreadyBorrowed {
                        copy_id: copy_id.to_string(),
                        record_id,
                    }
                    .into())
                }
                DbError::ForeignKeyViolation { .. } => Err(CoreError::CopyNotFound {
                    copy_id: copy_id.to_string(),
                }
                .into()),
                other => Err(other),
            },
        }
    }

    /// Closes an open record.
    ///
    /// ## Returns
    /// * `Err(Domain(BorrowRecordNotFound))` - no such record
    /// * `Err(Domain(AlreadyClosed))` - the record is RETURNED
    pub async fn close(&self, record_id: &str, return_date: NaiveDate) -> DbResult<BorrowRecord> {
        let current = self.require(record_id).await?;
        current.status.check_transition(BorrowStatus::Returned, record_id)?;

        debug!(record_id = %record_id, return_date = %return_date, "Closing borrow record");

        let closed = sqlx::query_as::<_, BorrowRecord>(&format!(
            "UPDATE borrow_records
             SET status = ?2, return_date = ?3
             WHERE record_id = ?1 AND status IN ('borrowed', 'overdue')
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(record_id)
        .bind(BorrowStatus::Returned)
        .bind(return_date)
        .fetch_optional(&self.pool)
        .await?;

        closed.ok_or_else(|| {
            CoreError::AlreadyClosed {
                record_id: record_id.to_string(),
            }
            .into()
        })
    }

    /// Compensation for a `close` applied earlier in the same operation.
    ///
    /// Restores the status the record had before closing and clears the
    /// return date.
    pub async fn reopen(&self, record_id: &str, previous: BorrowStatus) -> DbResult<BorrowRecord> {
        debug!(record_id = %record_id, status = %previous, "Reopening borrow record");

        let reopened = sqlx::query_as::<_, BorrowRecord>(&format!(
            "UPDATE borrow_records
             SET status = ?2, return_date = NULL
             WHERE record_id = ?1 AND status = 'returned'
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(record_id)
        .bind(previous)
        .fetch_optional(&self.pool)
        .await?;

        reopened.ok_or_else(|| DbError::not_found("Returned borrow record", record_id))
    }

    /// Extends the due date of an open record by the policy's renewal period
    /// and bumps its renew count.
    ///
    /// The update only applies if the record still has the status and renew
    /// count it was read with. On a miss the record is re-read and checked
    /// against the policy again, so concurrent renewals cannot exceed
    /// `max_renewals`.
    ///
    /// An OVERDUE record whose new due date is not before `today` goes back
    /// to BORROWED.
    ///
    /// ## Returns
    /// * `Err(Domain(BorrowRecordNotFound))` - no open record with this id
    /// * `Err(Domain(RenewalLimitReached))` - the policy cap is hit
    pub async fn renew(
        &self,
        record_id: &str,
        policy: &LoanPolicy,
        today: NaiveDate,
    ) -> DbResult<BorrowRecord> {
        loop {
            let current = self
                .get(record_id)
                .await?
                .filter(BorrowRecord::is_open)
                .ok_or_else(|| CoreError::BorrowRecordNotFound {
                    record_id: record_id.to_string(),
                })?;
            policy.check_renewal(&current)?;

            let new_due = policy.renewed_due_date(current.due_date);
            let new_status = if current.status == BorrowStatus::Overdue && new_due >= today {
                BorrowStatus::Borrowed
            } else {
                current.status
            };

            debug!(record_id = %record_id, due_date = %new_due, "Renewing borrow record");

            let renewed = sqlx::query_as::<_, BorrowRecord>(&format!(
                "UPDATE borrow_records
                 SET due_date = ?2, renew_count = renew_count + 1, status = ?3
                 WHERE record_id = ?1 AND status = ?4 AND renew_count = ?5
                 RETURNING {RECORD_COLUMNS}"
            ))
            .bind(record_id)
            .bind(new_due)
            .bind(new_status)
            .bind(current.status)
            .bind(current.renew_count)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(record) = renewed {
                return Ok(record);
            }
            debug!(record_id = %record_id, "Record changed during renewal, re-reading");
        }
    }

    /// Flips every BORROWED record due before `today` to OVERDUE.
    ///
    /// ## Returns
    /// Number of records marked.
    pub async fn mark_overdue(&self, today: NaiveDate) -> DbResult<u64> {
        let result = sqlx::query(
            "UPDATE borrow_records SET status = ?1 WHERE status = ?2 AND due_date < ?3",
        )
        .bind(BorrowStatus::Overdue)
        .bind(BorrowStatus::Borrowed)
        .bind(today)
        .execute(&self.pool)
        .await?;

        debug!(count = result.rows_affected(), today = %today, "Marked overdue records");
        Ok(result.rows_affected())
    }

    /// Gets a record by id.
    pub async fn get(&self, record_id: &str) -> DbResult<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM borrow_records WHERE record_id = ?1"
        ))
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Gets a record by id, failing with `BorrowRecordNotFound` if absent.
    pub async fn require(&self, record_id: &str) -> DbResult<BorrowRecord> {
        self.get(record_id).await?.ok_or_else(|| {
            CoreError::BorrowRecordNotFound {
                record_id: record_id.to_string(),
            }
            .into()
        })
    }

    /// The open record holding a copy, if any.
    pub async fn find_open_by_copy(&self, copy_id: &str) -> DbResult<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM borrow_records
             WHERE copy_id = ?1 AND status IN ('borrowed', 'overdue')"
        ))
        .bind(copy_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// The open record for this user and copy, if any.
    pub async fn find_open_by_user_and_copy(
        &self,
        user_id: &str,
        copy_id: &str,
    ) -> DbResult<Option<BorrowRecord>> {
        let record = sqlx::query_as::<_, BorrowRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM borrow_records
             WHERE user_id = ?1 AND copy_id = ?2 AND status IN ('borrowed', 'overdue')"
        ))
        .bind(user_id)
        .bind(copy_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// All open records for a user, soonest due first.
    pub async fn find_open_by_user(&self, user_id: &str) -> DbResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM borrow_records
             WHERE user_id = ?1 AND status IN ('borrowed', 'overdue')
             ORDER BY due_date, created_at"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Every record for a user, newest first.
    pub async fn history(&self, user_id: &str) -> DbResult<Vec<BorrowRecord>> {
        let records = sqlx::query_as::<_, BorrowRecord>(&format!(
            "SELECT {RECORD_COLUMNS} FROM borrow_records
             WHERE user_id = ?1
             ORDER BY borrow_date DESC, created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Number of open records across all copies of a title.
    pub async fn count_open_for_isbn(&self, isbn: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM borrow_records b
             JOIN copies c ON c.copy_id = b.copy_id
             WHERE c.isbn = ?1 AND b.status IN ('borrowed', 'overdue')",
        )
        .bind(isbn)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

/// Helper to generate a new borrow record ID.
pub fn generate_record_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{date, seed_title, test_db};

    async fn lend(
        ledger: &BorrowRepository,
        user_id: &str,
        copy_id: &str,
        on: NaiveDate,
    ) -> DbResult<BorrowRecord> {
        ledger
            .open(user_id, copy_id, on, LoanPolicy::default().due_date(on))
            .await
    }

    #[tokio::test]
    async fn test_open_sets_due_date() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);

        let record = lend(&db.borrows(), "alice", &copy.copy_id, date(2026, 3, 1))
            .await
            .unwrap();

        assert_eq!(record.status, BorrowStatus::Borrowed);
        assert_eq!(record.due_date, date(2026, 3, 15));
        assert_eq!(record.renew_count, 0);
        assert!(record.return_date.is_none());
    }

    #[tokio::test]
    async fn test_second_open_for_same_copy_is_rejected() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);
        let ledger = db.borrows();

        let first = lend(&ledger, "alice", &copy.copy_id, date(2026, 3, 1))
            .await
            .unwrap();
        let err = lend(&ledger, "bob", &copy.copy_id, date(2026, 3, 1))
            .await
            .unwrap_err();

        match err {
            DbError::Domain(CoreError::AlreadyBorrowed { record_id, .. }) => {
                assert_eq!(record_id, first.record_id)
            }
            other => panic!("expected AlreadyBorrowed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_close_then_close_again() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);
        let ledger = db.borrows();

        let record = lend(&ledger, "alice", &copy.copy_id, date(2026, 3, 1))
            .await
            .unwrap();
        let closed = ledger.close(&record.record_id, date(2026, 3, 10)).await.unwrap();
        assert_eq!(closed.status, BorrowStatus::Returned);
        assert_eq!(closed.return_date, Some(date(2026, 3, 10)));

        let err = ledger
            .close(&record.record_id, date(2026, 3, 11))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::AlreadyClosed { .. })));

        let err = ledger.close("missing", date(2026, 3, 11)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::BorrowRecordNotFound { .. })
        ));

        // Copy can be borrowed again once the record is closed
        assert!(lend(&ledger, "bob", &copy.copy_id, date(2026, 3, 12))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_reopen_restores_previous_status() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);
        let ledger = db.borrows();

        let record = lend(&ledger, "alice", &copy.copy_id, date(2026, 3, 1))
            .await
            .unwrap();
        ledger.close(&record.record_id, date(2026, 3, 2)).await.unwrap();

        let reopened = ledger
            .reopen(&record.record_id, BorrowStatus::Borrowed)
            .await
            .unwrap();
        assert_eq!(reopened.status, BorrowStatus::Borrowed);
        assert!(reopened.return_date.is_none());
    }

    #[tokio::test]
    async fn test_renew_extends_and_counts() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);
        let ledger = db.borrows();

        let record = lend(&ledger, "alice", &copy.copy_id, date(2026, 3, 1))
            .await
            .unwrap();
        let weekly = LoanPolicy::new(14, 7).unwrap();
        let renewed = ledger
            .renew(&record.record_id, &weekly, date(2026, 3, 10))
            .await
            .unwrap();
        let renewed = ledger
            .renew(&renewed.record_id, &weekly, date(2026, 3, 10))
            .await
            .unwrap();

        assert_eq!(renewed.renew_count, 2);
        assert_eq!(renewed.due_date, date(2026, 3, 29));

        ledger.close(&record.record_id, date(2026, 3, 20)).await.unwrap();
        let err = ledger
            .renew(&record.record_id, &weekly, date(2026, 3, 21))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::BorrowRecordNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_interleaved_renewals_respect_cap() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);
        let ledger = db.borrows();
        let capped = LoanPolicy::default().with_max_renewals(1);

        let record = lend(&ledger, "alice", &copy.copy_id, date(2026, 3, 1))
            .await
            .unwrap();

        let (first, second) = tokio::join!(
            ledger.renew(&record.record_id, &capped, date(2026, 3, 10)),
            ledger.renew(&record.record_id, &capped, date(2026, 3, 10)),
        );

        let outcomes = [first, second];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes.iter().any(|r| matches!(
            r,
            Err(DbError::Domain(CoreError::RenewalLimitReached { max: 1, .. }))
        )));

        let stored = ledger.require(&record.record_id).await.unwrap();
        assert_eq!(stored.renew_count, 1);
        assert_eq!(stored.due_date, date(2026, 3, 29));
    }

    #[tokio::test]
    async fn test_overdue_sweep_and_renewal_clears_it() {
        let db = test_db().await;
        let copies = seed_title(&db, "B001", 2).await;
        let ledger = db.borrows();

        let late = lend(&ledger, "alice", &copies[0].copy_id, date(2026, 3, 1))
            .await
            .unwrap();
        lend(&ledger, "bob", &copies[1].copy_id, date(2026, 3, 10))
            .await
            .unwrap();

        let marked = ledger.mark_overdue(date(2026, 3, 20)).await.unwrap();
        assert_eq!(marked, 1);

        let late = ledger.require(&late.record_id).await.unwrap();
        assert_eq!(late.status, BorrowStatus::Overdue);
        assert_eq!(ledger.count_open_for_isbn("B001").await.unwrap(), 2);

        // Overdue records are still open: the copy cannot be borrowed twice
        assert!(lend(&ledger, "carol", &copies[0].copy_id, date(2026, 3, 20))
            .await
            .is_err());

        let renewed = ledger
            .renew(&late.record_id, &LoanPolicy::default(), date(2026, 3, 20))
            .await
            .unwrap();
        assert_eq!(renewed.status, BorrowStatus::Borrowed);
        assert_eq!(renewed.due_date, date(2026, 3, 29));
    }

    #[tokio::test]
    async fn test_find_open_queries() {
        let db = test_db().await;
        let copies = seed_title(&db, "B001", 2).await;
        let ledger = db.borrows();

        let a = lend(&ledger, "alice", &copies[0].copy_id, date(2026, 3, 1))
            .await
            .unwrap();
        lend(&ledger, "alice", &copies[1].copy_id, date(2026, 3, 2))
            .await
            .unwrap();
        ledger.close(&a.record_id, date(2026, 3, 5)).await.unwrap();

        assert!(ledger
            .find_open_by_user_and_copy("alice", &copies[0].copy_id)
            .await
            .unwrap()
            .is_none());
        assert!(ledger
            .find_open_by_user_and_copy("alice", &copies[1].copy_id)
            .await
            .unwrap()
            .is_some());
        assert_eq!(ledger.find_open_by_user("alice").await.unwrap().len(), 1);

        let history = ledger.history("alice").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].borrow_date, date(2026, 3, 2));
    }
}
