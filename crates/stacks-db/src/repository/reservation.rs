//! # Reservation Repository (Reservation Queue)
//!
//! Per-ISBN FIFO queues of pending reservations.
//!
//! ## Queue Positions
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 Dense Positions Among ACTIVE Records                    │
//! │                                                                         │
//! │  enqueue(B)   enqueue(C)   enqueue(D)                                  │
//! │     │            │            │                                         │
//! │     ▼            ▼            ▼                                         │
//! │  [B:1]        [B:1 C:2]    [B:1 C:2 D:3]                               │
//! │                                                                         │
//! │  cancel(C)  → C leaves the queue, everything behind it moves up        │
//! │     └──────► [B:1 D:2]                                                 │
//! │                                                                         │
//! │  fulfill(B) → B leaves the queue with a copy, same renumbering rule    │
//! │     └──────► [D:1]                                                     │
//! │                                                                         │
//! │  Terminal records keep the position they left at (audit only).         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Atomicity
//! Leaving the queue and closing the gap run in one transaction whose first
//! statement is a write, so SQLite takes the write lock up front. Callers
//! additionally serialize queue mutations per ISBN (see `stacks-engine`).
//!
//! ## Holds
//! A FULFILLED reservation carries the copy set aside for it. The hold is
//! *claimable* until the holder borrows it ([`ReservationRepository::claim`])
//! or it is released to the next in line ([`ReservationRepository::expire_hold`]).

use chrono::NaiveDate;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stacks_core::{CoreError, ReservationRecord, ReservationStatus};

const RESERVATION_COLUMNS: &str = "reservation_id, user_id, isbn, reserve_date, status, \
     queue_position, notify_status, allocated_copy_id, claimed_date, hold_expired";

const CLAIMABLE: &str = "status = 'fulfilled' AND allocated_copy_id IS NOT NULL \
     AND claimed_date IS NULL AND hold_expired = 0";

/// Repository for reservation records.
#[derive(Debug, Clone)]
pub struct ReservationRepository {
    pool: SqlitePool,
}

impl ReservationRepository {
    /// Creates a new ReservationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReservationRepository { pool }
    }

    // =========================================================================
    // Queue Mutations
    // =========================================================================

    /// Appends an ACTIVE, PENDING reservation at the back of the queue.
    ///
    /// The position is computed inside the INSERT, so a single statement
    /// both counts the queue and joins it.
    ///
    /// ## Returns
    /// * `Err(Domain(AlreadyReserved))` - user already waits for this title
    /// * `Err(Domain(CatalogEntryNotFound))` - ISBN is not catalogued
    pub async fn enqueue(
        &self,
        user_id: &str,
        isbn: &str,
        reserve_date: NaiveDate,
    ) -> DbResult<ReservationRecord> {
        if let Some(existing) = self.find_active_by_user(user_id, isbn).await? {
            return Err(CoreError::AlreadyReserved {
                reservation_id: existing.reservation_id,
                user_id: user_id.to_string(),
                isbn: isbn.to_string(),
            }
            .into());
        }

        let reservation_id = generate_reservation_id();

        let result = sqlx::query_as::<_, ReservationRecord>(&format!(
            "INSERT INTO reservation_records (
                reservation_id, user_id, isbn, reserve_date,
                status, queue_position, notify_status
             )
             SELECT ?1, ?2, ?3, ?4, 'active', COUNT(*) + 1, 'pending'
             FROM reservation_records
             WHERE isbn = ?3 AND status = 'active'
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(&reservation_id)
        .bind(user_id)
        .bind(isbn)
        .bind(reserve_date)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(record) => {
                debug!(
                    reservation_id = %record.reservation_id,
                    isbn = %isbn,
                    position = record.queue_position,
                    "Enqueued reservation"
                );
                Ok(record)
            }
            Err(err) => match DbError::from(err) {
                DbError::ForeignKeyViolation { .. } => Err(CoreError::CatalogEntryNotFound {
                    isbn: isbn.to_string(),
                }
                .into()),
                other => Err(other),
            },
        }
    }

    /// The reservation at position 1 for the title, if any.
    ///
    /// Only reads: the head leaves the queue when it is fulfilled.
    pub async fn dequeue_head(&self, isbn: &str) -> DbResult<Option<ReservationRecord>> {
        let head = sqlx::query_as::<_, ReservationRecord>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservation_records
             WHERE isbn = ?1 AND status = 'active'
             ORDER BY queue_position, created_at
             LIMIT 1"
        ))
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(head)
    }

    /// Cancels an ACTIVE reservation and closes the gap behind it.
    ///
    /// ## Returns
    /// * `Err(Domain(ReservationNotFound))` - no such reservation
    /// * `Err(Domain(AlreadyFulfilled))` / `Err(Domain(AlreadyCancelled))`
    pub async fn cancel(&self, reservation_id: &str) -> DbResult<ReservationRecord> {
        let cancelled = self
            .leave_queue(reservation_id, ReservationStatus::Cancelled, None)
            .await?;
        debug!(
            reservation_id = %reservation_id,
            isbn = %cancelled.isbn,
            position = cancelled.queue_position,
            "Cancelled reservation"
        );
        Ok(cancelled)
    }

    /// Marks an ACTIVE reservation FULFILLED with `copy_id` set aside for it,
    /// closing the gap behind it.
    pub async fn fulfill(&self, reservation_id: &str, copy_id: &str) -> DbResult<ReservationRecord> {
        let fulfilled = self
            .leave_queue(reservation_id, ReservationStatus::Fulfilled, Some(copy_id))
            .await?;
        debug!(
            reservation_id = %reservation_id,
            copy_id = %copy_id,
            "Fulfilled reservation"
        );
        Ok(fulfilled)
    }

    async fn leave_queue(
        &self,
        reservation_id: &str,
        to: ReservationStatus,
        copy_id: Option<&str>,
    ) -> DbResult<ReservationRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let left = sqlx::query_as::<_, ReservationRecord>(&format!(
            "UPDATE reservation_records
             SET status = ?2, allocated_copy_id = COALESCE(?3, allocated_copy_id)
             WHERE reservation_id = ?1 AND status = 'active'
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id)
        .bind(to)
        .bind(copy_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(left) = left else {
            tx.rollback()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            let current = self.require(reservation_id).await?;
            current.status.check_transition(to, reservation_id)?;
            // Active again by now: a concurrent writer reinstated it.
            return Err(CoreError::illegal_transition(
                "reservation",
                reservation_id,
                current.status,
                to,
            )
            .into());
        };

        sqlx::query(
            "UPDATE reservation_records
             SET queue_position = queue_position - 1
             WHERE isbn = ?1 AND status = 'active' AND queue_position > ?2",
        )
        .bind(&left.isbn)
        .bind(left.queue_position)
        .execute(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(left)
    }

    /// Returns an unclaimed FULFILLED reservation to the queue, e.g. when
    /// its held copy is withdrawn or a hand-off is rolled back.
    ///
    /// The slot comes from the reservation's `(reserve_date, created_at)`
    /// among the ACTIVE records, not from the position it left at: other
    /// holds may have been fulfilled or reinstated since. Only records behind
    /// that slot move back. The allocated copy is cleared and the notify
    /// status goes back to PENDING.
    pub async fn reinstate(&self, reservation_id: &str) -> DbResult<ReservationRecord> {
        let current = self.require(reservation_id).await?;
        if current.status != ReservationStatus::Fulfilled || current.claimed_date.is_some() {
            return Err(CoreError::illegal_transition(
                "reservation",
                reservation_id,
                current.status,
                ReservationStatus::Active,
            )
            .into());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        // Ties on created_at fall back to insertion order.
        let slot: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) + 1
             FROM reservation_records r, reservation_records me
             WHERE me.reservation_id = ?1
               AND r.isbn = me.isbn AND r.status = 'active'
               AND (r.reserve_date, r.created_at, r.rowid)
                   < (me.reserve_date, me.created_at, me.rowid)",
        )
        .bind(reservation_id)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE reservation_records
             SET queue_position = queue_position + 1
             WHERE isbn = ?1 AND status = 'active' AND queue_position >= ?2",
        )
        .bind(&current.isbn)
        .bind(slot)
        .execute(&mut *tx)
        .await?;

        let reinstated = sqlx::query_as::<_, ReservationRecord>(&format!(
            "UPDATE reservation_records
             SET status = 'active', queue_position = ?2, notify_status = 'pending',
                 allocated_copy_id = NULL, hold_expired = 0
             WHERE reservation_id = ?1 AND status = 'fulfilled' AND claimed_date IS NULL
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id)
        .bind(slot)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(reinstated) = reinstated else {
            tx.rollback()
                .await
                .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
            let latest = self.require(reservation_id).await?;
            return Err(CoreError::illegal_transition(
                "reservation",
                reservation_id,
                latest.status,
                ReservationStatus::Active,
            )
            .into());
        };

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            reservation_id = %reservation_id,
            position = slot,
            "Reinstated reservation"
        );
        Ok(reinstated)
    }

    /// Sets notify status to NOTIFIED. Calling it again is a no-op.
    pub async fn mark_notified(&self, reservation_id: &str) -> DbResult<ReservationRecord> {
        let record = sqlx::query_as::<_, ReservationRecord>(&format!(
            "UPDATE reservation_records SET notify_status = 'notified'
             WHERE reservation_id = ?1
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or_else(|| {
            CoreError::ReservationNotFound {
                reservation_id: reservation_id.to_string(),
            }
            .into()
        })
    }

    // =========================================================================
    // Holds
    // =========================================================================

    /// Records that the holder borrowed the copy set aside for them.
    pub async fn claim(&self, reservation_id: &str, date: NaiveDate) -> DbResult<ReservationRecord> {
        let record = sqlx::query_as::<_, ReservationRecord>(&format!(
            "UPDATE reservation_records SET claimed_date = ?2
             WHERE reservation_id = ?1 AND {CLAIMABLE}
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or_else(|| {
            CoreError::ReservationNotFound {
                reservation_id: reservation_id.to_string(),
            }
            .into()
        })
    }

    /// Compensation for a `claim` applied earlier in the same operation.
    pub async fn unclaim(&self, reservation_id: &str) -> DbResult<ReservationRecord> {
        let record = sqlx::query_as::<_, ReservationRecord>(&format!(
            "UPDATE reservation_records SET claimed_date = NULL
             WHERE reservation_id = ?1 AND status = 'fulfilled'
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or_else(|| DbError::not_found("Fulfilled reservation", reservation_id))
    }

    /// Marks an unclaimed hold as released. The reservation stays FULFILLED.
    pub async fn expire_hold(&self, reservation_id: &str) -> DbResult<ReservationRecord> {
        let record = sqlx::query_as::<_, ReservationRecord>(&format!(
            "UPDATE reservation_records SET hold_expired = 1
             WHERE reservation_id = ?1 AND {CLAIMABLE}
             RETURNING {RESERVATION_COLUMNS}"
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        record.ok_or_else(|| {
            CoreError::ReservationNotFound {
                reservation_id: reservation_id.to_string(),
            }
            .into()
        })
    }

    /// The claimable hold this user has on some copy of the title, if the
    /// copy is still RESERVED.
    pub async fn find_held_copy(
        &self,
        user_id: &str,
        isbn: &str,
    ) -> DbResult<Option<ReservationRecord>> {
        let record = sqlx::query_as::<_, ReservationRecord>(
            "SELECT r.reservation_id, r.user_id, r.isbn, r.reserve_date, r.status,
                    r.queue_position, r.notify_status, r.allocated_copy_id,
                    r.claimed_date, r.hold_expired
             FROM reservation_records r
             JOIN copies c ON c.copy_id = r.allocated_copy_id
             WHERE r.user_id = ?1 AND r.isbn = ?2 AND c.status = 'reserved'
               AND r.status = 'fulfilled' AND r.claimed_date IS NULL AND r.hold_expired = 0
             ORDER BY r.created_at
             LIMIT 1",
        )
        .bind(user_id)
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// The claimable reservation a RESERVED copy is set aside for.
    pub async fn find_hold_for_copy(&self, copy_id: &str) -> DbResult<Option<ReservationRecord>> {
        let record = sqlx::query_as::<_, ReservationRecord>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservation_records
             WHERE allocated_copy_id = ?1 AND {CLAIMABLE}
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(copy_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Gets a reservation by id.
    pub async fn get(&self, reservation_id: &str) -> DbResult<Option<ReservationRecord>> {
        let record = sqlx::query_as::<_, ReservationRecord>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservation_records WHERE reservation_id = ?1"
        ))
        .bind(reservation_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Gets a reservation by id, failing with `ReservationNotFound` if absent.
    pub async fn require(&self, reservation_id: &str) -> DbResult<ReservationRecord> {
        self.get(reservation_id).await?.ok_or_else(|| {
            CoreError::ReservationNotFound {
                reservation_id: reservation_id.to_string(),
            }
            .into()
        })
    }

    /// The queue for a title, head first.
    pub async fn list_active(&self, isbn: &str) -> DbResult<Vec<ReservationRecord>> {
        let records = sqlx::query_as::<_, ReservationRecord>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservation_records
             WHERE isbn = ?1 AND status = 'active'
             ORDER BY queue_position"
        ))
        .bind(isbn)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Number of ACTIVE reservations for a title.
    pub async fn count_active(&self, isbn: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM reservation_records WHERE isbn = ?1 AND status = 'active'",
        )
        .bind(isbn)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// The user's ACTIVE reservation for a title, if any.
    pub async fn find_active_by_user(
        &self,
        user_id: &str,
        isbn: &str,
    ) -> DbResult<Option<ReservationRecord>> {
        let record = sqlx::query_as::<_, ReservationRecord>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservation_records
             WHERE user_id = ?1 AND isbn = ?2 AND status = 'active'"
        ))
        .bind(user_id)
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// The reservation a user would want to see for a title: the ACTIVE one
    /// if queued, otherwise the latest claimable hold.
    pub async fn find_for_user(
        &self,
        user_id: &str,
        isbn: &str,
    ) -> DbResult<Option<ReservationRecord>> {
        if let Some(active) = self.find_active_by_user(user_id, isbn).await? {
            return Ok(Some(active));
        }

        let held = sqlx::query_as::<_, ReservationRecord>(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservation_records
             WHERE user_id = ?1 AND isbn = ?2 AND {CLAIMABLE}
             ORDER BY created_at DESC
             LIMIT 1"
        ))
        .bind(user_id)
        .bind(isbn)
        .fetch_optional(&self.pool)
        .await?;

        Ok(held)
    }
}

/// Helper to generate a new reservation ID.
pub fn generate_reservation_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{date, seed_title, test_db};
    use stacks_core::{CopyStatus, NotifyStatus};

    async fn positions(repo: &ReservationRepository, isbn: &str) -> Vec<(String, i64)> {
        repo.list_active(isbn)
            .await
            .unwrap()
            .into_iter()
            .map(|r| (r.user_id, r.queue_position))
            .collect()
    }

    #[tokio::test]
    async fn test_enqueue_appends() {
        let db = test_db().await;
        seed_title(&db, "B001", 1).await;
        let queue = db.reservations();

        let b = queue.enqueue("bob", "B001", date(2026, 3, 2)).await.unwrap();
        let c = queue.enqueue("carol", "B001", date(2026, 3, 3)).await.unwrap();

        assert_eq!(b.queue_position, 1);
        assert_eq!(c.queue_position, 2);
        assert_eq!(b.status, ReservationStatus::Active);
        assert_eq!(b.notify_status, NotifyStatus::Pending);
        assert_eq!(queue.count_active("B001").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_enqueue_rejects_duplicate_and_unknown_isbn() {
        let db = test_db().await;
        seed_title(&db, "B001", 1).await;
        let queue = db.reservations();

        queue.enqueue("bob", "B001", date(2026, 3, 2)).await.unwrap();
        let err = queue.enqueue("bob", "B001", date(2026, 3, 2)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AlreadyReserved { .. })
        ));

        let err = queue.enqueue("bob", "NONE", date(2026, 3, 2)).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::CatalogEntryNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_renumbers_behind() {
        let db = test_db().await;
        seed_title(&db, "B001", 1).await;
        let queue = db.reservations();

        queue.enqueue("bob", "B001", date(2026, 3, 2)).await.unwrap();
        let c = queue.enqueue("carol", "B001", date(2026, 3, 2)).await.unwrap();
        queue.enqueue("dave", "B001", date(2026, 3, 2)).await.unwrap();

        let cancelled = queue.cancel(&c.reservation_id).await.unwrap();
        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
        assert_eq!(cancelled.queue_position, 2);

        assert_eq!(
            positions(&queue, "B001").await,
            vec![("bob".to_string(), 1), ("dave".to_string(), 2)]
        );

        // Next enqueue fills position 3, not 4
        let e = queue.enqueue("erin", "B001", date(2026, 3, 3)).await.unwrap();
        assert_eq!(e.queue_position, 3);
    }

    #[tokio::test]
    async fn test_cancel_lifecycle_errors() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);
        let queue = db.reservations();

        let b = queue.enqueue("bob", "B001", date(2026, 3, 2)).await.unwrap();
        let c = queue.enqueue("carol", "B001", date(2026, 3, 2)).await.unwrap();

        queue.cancel(&b.reservation_id).await.unwrap();
        let err = queue.cancel(&b.reservation_id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AlreadyCancelled { .. })
        ));

        queue.fulfill(&c.reservation_id, &copy.copy_id).await.unwrap();
        let err = queue.cancel(&c.reservation_id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::AlreadyFulfilled { .. })
        ));

        let err = queue.cancel("missing").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ReservationNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_queue_stays_dense_through_mixed_operations() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);
        let queue = db.reservations();

        let mut ids = Vec::new();
        for user in ["u1", "u2", "u3", "u4", "u5", "u6"] {
            ids.push(
                queue
                    .enqueue(user, "B001", date(2026, 3, 2))
                    .await
                    .unwrap()
                    .reservation_id,
            );
        }

        queue.cancel(&ids[3]).await.unwrap();
        queue.fulfill(&ids[0], &copy.copy_id).await.unwrap();
        queue.cancel(&ids[5]).await.unwrap();
        queue.enqueue("u7", "B001", date(2026, 3, 4)).await.unwrap();
        queue.cancel(&ids[1]).await.unwrap();

        let active = positions(&queue, "B001").await;
        let numbers: Vec<i64> = active.iter().map(|(_, p)| *p).collect();
        assert_eq!(numbers, (1..=active.len() as i64).collect::<Vec<_>>());
        let users: Vec<&str> = active.iter().map(|(u, _)| u.as_str()).collect();
        assert_eq!(users, vec!["u3", "u5", "u7"]);
    }

    #[tokio::test]
    async fn test_dequeue_head_does_not_mutate() {
        let db = test_db().await;
        seed_title(&db, "B001", 1).await;
        let queue = db.reservations();

        assert!(queue.dequeue_head("B001").await.unwrap().is_none());

        queue.enqueue("bob", "B001", date(2026, 3, 2)).await.unwrap();
        queue.enqueue("carol", "B001", date(2026, 3, 2)).await.unwrap();

        let head = queue.dequeue_head("B001").await.unwrap().unwrap();
        assert_eq!(head.user_id, "bob");
        let again = queue.dequeue_head("B001").await.unwrap().unwrap();
        assert_eq!(again.reservation_id, head.reservation_id);
        assert_eq!(again.status, ReservationStatus::Active);
    }

    #[tokio::test]
    async fn test_mark_notified_is_idempotent() {
        let db = test_db().await;
        seed_title(&db, "B001", 1).await;
        let queue = db.reservations();

        let b = queue.enqueue("bob", "B001", date(2026, 3, 2)).await.unwrap();
        let first = queue.mark_notified(&b.reservation_id).await.unwrap();
        let second = queue.mark_notified(&b.reservation_id).await.unwrap();

        assert_eq!(first.notify_status, NotifyStatus::Notified);
        assert_eq!(first, second);

        let err = queue.mark_notified("missing").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::ReservationNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_reinstate_restores_position() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);
        let queue = db.reservations();

        let b = queue.enqueue("bob", "B001", date(2026, 3, 2)).await.unwrap();
        queue.enqueue("carol", "B001", date(2026, 3, 2)).await.unwrap();

        queue.fulfill(&b.reservation_id, &copy.copy_id).await.unwrap();
        assert_eq!(positions(&queue, "B001").await, vec![("carol".to_string(), 1)]);

        let back = queue.reinstate(&b.reservation_id).await.unwrap();
        assert_eq!(back.status, ReservationStatus::Active);
        assert!(back.allocated_copy_id.is_none());
        assert_eq!(
            positions(&queue, "B001").await,
            vec![("bob".to_string(), 1), ("carol".to_string(), 2)]
        );
    }

    #[tokio::test]
    async fn test_reinstated_holds_rejoin_in_reserve_order() {
        let db = test_db().await;
        let copies = seed_title(&db, "B001", 2).await;
        let queue = db.reservations();

        let a = queue.enqueue("amy", "B001", date(2026, 3, 1)).await.unwrap();
        let b = queue.enqueue("ben", "B001", date(2026, 3, 2)).await.unwrap();
        queue.enqueue("cat", "B001", date(2026, 3, 3)).await.unwrap();

        queue.fulfill(&a.reservation_id, &copies[0].copy_id).await.unwrap();
        queue.fulfill(&b.reservation_id, &copies[1].copy_id).await.unwrap();
        queue.mark_notified(&a.reservation_id).await.unwrap();

        // Earlier reserver comes back second and still goes first
        let back_b = queue.reinstate(&b.reservation_id).await.unwrap();
        assert_eq!(back_b.queue_position, 1);
        let back_a = queue.reinstate(&a.reservation_id).await.unwrap();
        assert_eq!(back_a.queue_position, 1);
        assert_eq!(back_a.notify_status, NotifyStatus::Pending);

        assert_eq!(
            positions(&queue, "B001").await,
            vec![
                ("amy".to_string(), 1),
                ("ben".to_string(), 2),
                ("cat".to_string(), 3)
            ]
        );

        let err = queue.reinstate(&a.reservation_id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::IllegalTransition { .. })
        ));
    }

    #[tokio::test]
    async fn test_hold_claim_and_release() {
        let db = test_db().await;
        let copy = seed_title(&db, "B001", 1).await.remove(0);
        let queue = db.reservations();

        let b = queue.enqueue("bob", "B001", date(2026, 3, 2)).await.unwrap();
        db.copies()
            .transition(&copy.copy_id, CopyStatus::InLibrary, CopyStatus::Reserved)
            .await
            .unwrap();
        queue.fulfill(&b.reservation_id, &copy.copy_id).await.unwrap();

        let held = queue.find_held_copy("bob", "B001").await.unwrap().unwrap();
        assert_eq!(held.allocated_copy_id.as_deref(), Some(copy.copy_id.as_str()));
        assert!(queue.find_held_copy("carol", "B001").await.unwrap().is_none());
        assert_eq!(
            queue
                .find_hold_for_copy(&copy.copy_id)
                .await
                .unwrap()
                .unwrap()
                .reservation_id,
            b.reservation_id
        );
        assert_eq!(
            queue.find_for_user("bob", "B001").await.unwrap().unwrap().reservation_id,
            b.reservation_id
        );

        let claimed = queue.claim(&b.reservation_id, date(2026, 3, 5)).await.unwrap();
        assert_eq!(claimed.claimed_date, Some(date(2026, 3, 5)));
        assert!(!claimed.is_claimable());
        assert!(queue.claim(&b.reservation_id, date(2026, 3, 6)).await.is_err());

        let unclaimed = queue.unclaim(&b.reservation_id).await.unwrap();
        assert!(unclaimed.is_claimable());

        let expired = queue.expire_hold(&b.reservation_id).await.unwrap();
        assert!(expired.hold_expired);
        assert!(queue.find_hold_for_copy(&copy.copy_id).await.unwrap().is_none());
        assert!(queue.find_for_user("bob", "B001").await.unwrap().is_none());
    }
}
