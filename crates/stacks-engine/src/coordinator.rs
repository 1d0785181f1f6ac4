//! # Circulation Coordinator
//!
//! The only component that mutates more than one of copies, borrow records
//! and reservations in a single operation.
//!
//! ## Return Hand-off
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         return_copy(record, copy)                       │
//! │                                                                         │
//! │  lock queue[isbn] → lock copies[isbn]                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ledger.close(record)                                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  queue.dequeue_head(isbn)                                               │
//! │       │                                                                 │
//! │       ├── head ──► copy BORROWED → RESERVED                            │
//! │       │            queue.fulfill(head, copy)    (queue closes up)       │
//! │       │            queue.mark_notified(head)                            │
//! │       │            ⇒ HeldForReservation                                 │
//! │       │                                                                 │
//! │       └── none ──► copy BORROWED → IN_LIBRARY                          │
//! │                    ⇒ Restocked                                          │
//! │                                                                         │
//! │  Any step failing undoes the earlier ones in reverse order.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The holder later calls [`CirculationCoordinator::borrow`], which finds
//! the hold and takes the RESERVED copy. A hold that is never claimed stays
//! RESERVED until [`CirculationCoordinator::release_hold`] is called.
//!
//! ## Compensation
//! Each operation is a sequence of single-row conditional writes. When a
//! later write fails, the earlier ones are reversed before the error is
//! returned, so callers never observe a half-applied operation. A failed
//! reversal is logged at `error` level and the original error is returned.

use std::future::Future;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info, warn};

use stacks_core::validation::{validate_isbn, validate_location, validate_record_id, validate_user_id};
use stacks_core::{
    BookCopy, BorrowReceipt, BorrowRecord, CatalogSummary, CopyCounts, CopyStatus,
    CoreError, LoanPolicy, ReservationReceipt, ReservationRecord, ReturnOutcome,
};
use stacks_db::{Database, DbResult};

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::CirculationResult;
use crate::locks::KeyedLocks;

/// Attempts at claiming an available copy before surfacing `Contention`.
const BORROW_ATTEMPTS: usize = 2;

/// Orchestrates the Copy Registry, Borrow Ledger and Reservation Queue.
#[derive(Debug)]
pub struct CirculationCoordinator {
    db: Database,
    policy: LoanPolicy,
    clock: Arc<dyn Clock>,
    queue_locks: KeyedLocks,
    copy_locks: KeyedLocks,
}

impl CirculationCoordinator {
    pub fn new(db: Database, policy: LoanPolicy, clock: Arc<dyn Clock>) -> Self {
        CirculationCoordinator {
            db,
            policy,
            clock,
            queue_locks: KeyedLocks::new("queue"),
            copy_locks: KeyedLocks::new("copies"),
        }
    }

    /// Opens the configured database and builds a coordinator on the
    /// system clock.
    pub async fn from_config(config: &EngineConfig) -> CirculationResult<Self> {
        let policy = config.loan_policy()?;
        let db = Database::new(config.db_config()).await?;
        Ok(Self::new(db, policy, Arc::new(SystemClock)))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn policy(&self) -> &LoanPolicy {
        &self.policy
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    // =========================================================================
    // Borrow
    // =========================================================================

    /// Lends a copy of `isbn` to `user_id`.
    ///
    /// A user with a claimable hold on the title receives the copy set aside
    /// for them. Anyone else gets an IN_LIBRARY copy, or `NoCopyAvailable`.
    ///
    /// ## Errors
    /// * `NoCopyAvailable` - nothing on the shelf
    /// * `Contention` - lost the race for a copy twice
    /// * `CatalogEntryNotFound` - unknown ISBN
    pub async fn borrow(&self, user_id: &str, isbn: &str) -> CirculationResult<BorrowReceipt> {
        validate_user_id(user_id)?;
        validate_isbn(isbn)?;
        self.require_catalogued(isbn).await?;

        if self
            .db
            .reservations()
            .find_held_copy(user_id, isbn)
            .await?
            .is_some()
        {
            if let Some(receipt) = self.borrow_held(user_id, isbn).await? {
                return Ok(receipt);
            }
        }

        self.borrow_available(user_id, isbn).await
    }

    /// Claims the user's hold. `None` if the hold vanished before the locks
    /// were taken.
    async fn borrow_held(
        &self,
        user_id: &str,
        isbn: &str,
    ) -> CirculationResult<Option<BorrowReceipt>> {
        let _locks = self.lock_title(isbn).await;
        let reservations = self.db.reservations();

        let Some(hold) = reservations.find_held_copy(user_id, isbn).await? else {
            return Ok(None);
        };
        let Some(copy_id) = hold.allocated_copy_id.clone() else {
            return Ok(None);
        };
        let today = self.today();

        reservations.claim(&hold.reservation_id, today).await?;

        if let Err(err) = self
            .db
            .copies()
            .transition(&copy_id, CopyStatus::Reserved, CopyStatus::Borrowed)
            .await
        {
            self.compensate("unclaim reservation", reservations.unclaim(&hold.reservation_id))
                .await;
            return Err(err.into());
        }

        let record = match self.open_record(user_id, &copy_id, today).await {
            Ok(record) => record,
            Err(err) => {
                self.compensate(
                    "restore reserved copy",
                    self.db
                        .copies()
                        .transition(&copy_id, CopyStatus::Borrowed, CopyStatus::Reserved),
                )
                .await;
                self.compensate("unclaim reservation", reservations.unclaim(&hold.reservation_id))
                    .await;
                return Err(err.into());
            }
        };

        let counts = self.counts_after_commit(isbn).await;

        info!(
            user_id = %user_id,
            isbn = %isbn,
            copy_id = %copy_id,
            reservation_id = %hold.reservation_id,
            "Borrowed held copy"
        );

        Ok(Some(BorrowReceipt {
            record_id: record.record_id,
            copy_id,
            isbn: isbn.to_string(),
            due_date: record.due_date,
            reservation_id: Some(hold.reservation_id),
            counts,
        }))
    }

    async fn borrow_available(&self, user_id: &str, isbn: &str) -> CirculationResult<BorrowReceipt> {
        let _copies = self.copy_locks.lock(isbn).await;
        let copies = self.db.copies();
        let mut contended = None;

        for attempt in 1..=BORROW_ATTEMPTS {
            let Some(copy) = copies.find_available_copy(isbn).await? else {
                return Err(CoreError::NoCopyAvailable {
                    isbn: isbn.to_string(),
                }
                .into());
            };

            match copies
                .transition(&copy.copy_id, CopyStatus::InLibrary, CopyStatus::Borrowed)
                .await
            {
                Ok(_) => {}
                Err(err) if err.is_transition_conflict() => {
                    warn!(isbn = %isbn, copy_id = %copy.copy_id, attempt, "Lost race for copy");
                    contended = Some(copy.copy_id);
                    continue;
                }
                Err(err) => return Err(err.into()),
            }

            let today = self.today();
            let record = match self.open_record(user_id, &copy.copy_id, today).await {
                Ok(record) => record,
                Err(err) => {
                    self.compensate(
                        "restock copy",
                        copies.transition(&copy.copy_id, CopyStatus::Borrowed, CopyStatus::InLibrary),
                    )
                    .await;
                    return Err(err.into());
                }
            };

            let counts = self.counts_after_commit(isbn).await;

            info!(
                user_id = %user_id,
                isbn = %isbn,
                copy_id = %copy.copy_id,
                due_date = %record.due_date,
                available = counts.available,
                "Borrowed copy"
            );

            return Ok(BorrowReceipt {
                record_id: record.record_id,
                copy_id: copy.copy_id,
                isbn: isbn.to_string(),
                due_date: record.due_date,
                reservation_id: None,
                counts,
            });
        }

        Err(CoreError::Contention {
            isbn: isbn.to_string(),
            copy_id: contended.unwrap_or_default(),
        }
        .into())
    }

    async fn open_record(
        &self,
        user_id: &str,
        copy_id: &str,
        today: NaiveDate,
    ) -> DbResult<BorrowRecord> {
        self.db
            .borrows()
            .open(user_id, copy_id, today, self.policy.due_date(today))
            .await
    }

    // =========================================================================
    // Return
    // =========================================================================

    /// Closes a borrow record and decides where the copy goes next.
    ///
    /// ## Errors
    /// * `BorrowRecordNotFound` / `AlreadyClosed`
    /// * `CopyMismatch` - `copy_id` is not the record's copy
    pub async fn return_copy(
        &self,
        record_id: &str,
        copy_id: &str,
        isbn: &str,
    ) -> CirculationResult<ReturnOutcome> {
        validate_record_id("record_id", record_id)?;
        validate_record_id("copy_id", copy_id)?;
        validate_isbn(isbn)?;

        let _locks = self.lock_title(isbn).await;
        let borrows = self.db.borrows();
        let copies = self.db.copies();
        let reservations = self.db.reservations();

        let record = borrows.require(record_id).await?;
        if record.copy_id != copy_id {
            return Err(CoreError::CopyMismatch {
                record_id: record_id.to_string(),
                expected: record.copy_id,
                actual: copy_id.to_string(),
            }
            .into());
        }
        let copy = copies.require(copy_id).await?;
        if copy.isbn != isbn {
            return Err(stacks_core::ValidationError::InvalidFormat {
                field: "isbn".to_string(),
                reason: format!("copy {} belongs to {}", copy_id, copy.isbn),
            }
            .into());
        }

        let previous = record.status;
        borrows.close(record_id, self.today()).await?;

        let head = match reservations.dequeue_head(isbn).await {
            Ok(head) => head,
            Err(err) => {
                self.compensate("reopen record", borrows.reopen(record_id, previous))
                    .await;
                return Err(err.into());
            }
        };

        let Some(head) = head else {
            if let Err(err) = copies
                .transition(copy_id, CopyStatus::Borrowed, CopyStatus::InLibrary)
                .await
            {
                self.compensate("reopen record", borrows.reopen(record_id, previous))
                    .await;
                return Err(err.into());
            }

            let counts = self.counts_after_commit(isbn).await;
            info!(record_id = %record_id, copy_id = %copy_id, "Returned copy to shelf");
            return Ok(ReturnOutcome::Restocked { counts });
        };

        if let Err(err) = self
            .hand_to_reservation(copy_id, CopyStatus::Borrowed, &head)
            .await
        {
            self.compensate("reopen record", borrows.reopen(record_id, previous))
                .await;
            return Err(err);
        }

        let counts = self.counts_after_commit(isbn).await;
        info!(
            record_id = %record_id,
            copy_id = %copy_id,
            reservation_id = %head.reservation_id,
            user_id = %head.user_id,
            "Returned copy held for reservation"
        );

        Ok(ReturnOutcome::HeldForReservation {
            reservation_id: head.reservation_id,
            user_id: head.user_id,
            counts,
        })
    }

    /// Marks the copy RESERVED (unless it already is), fulfils `head` with it
    /// and notifies the holder. Undoes its own steps on failure.
    ///
    /// Callers hold both title locks.
    async fn hand_to_reservation(
        &self,
        copy_id: &str,
        from: CopyStatus,
        head: &ReservationRecord,
    ) -> CirculationResult<()> {
        let copies = self.db.copies();
        let reservations = self.db.reservations();

        if from != CopyStatus::Reserved {
            copies.transition(copy_id, from, CopyStatus::Reserved).await?;
        }

        if let Err(err) = reservations.fulfill(&head.reservation_id, copy_id).await {
            self.restore_copy_status(copy_id, from).await;
            return Err(err.into());
        }

        if let Err(err) = reservations.mark_notified(&head.reservation_id).await {
            self.compensate("reinstate reservation", reservations.reinstate(&head.reservation_id))
                .await;
            self.restore_copy_status(copy_id, from).await;
            return Err(err.into());
        }

        Ok(())
    }

    async fn restore_copy_status(&self, copy_id: &str, from: CopyStatus) {
        if from != CopyStatus::Reserved {
            self.compensate(
                "restore copy status",
                self.db.copies().transition(copy_id, CopyStatus::Reserved, from),
            )
            .await;
        }
    }

    // =========================================================================
    // Reserve / Cancel
    // =========================================================================

    /// Joins the queue for a title that has no copy on the shelf.
    ///
    /// ## Errors
    /// * `CopyAvailable` - a copy can be borrowed right now
    /// * `AlreadyReserved` - the user is queued or has an unclaimed hold
    pub async fn reserve(&self, user_id: &str, isbn: &str) -> CirculationResult<ReservationReceipt> {
        validate_user_id(user_id)?;
        validate_isbn(isbn)?;
        self.require_catalogued(isbn).await?;

        let _queue = self.queue_locks.lock(isbn).await;
        let reservations = self.db.reservations();

        let counts = self.db.copies().counts_by_isbn(isbn).await?;
        if counts.available > 0 {
            return Err(CoreError::CopyAvailable {
                isbn: isbn.to_string(),
                available: counts.available,
            }
            .into());
        }

        if let Some(hold) = reservations.find_held_copy(user_id, isbn).await? {
            return Err(CoreError::AlreadyReserved {
                reservation_id: hold.reservation_id,
                user_id: user_id.to_string(),
                isbn: isbn.to_string(),
            }
            .into());
        }

        let record = reservations.enqueue(user_id, isbn, self.today()).await?;

        info!(
            user_id = %user_id,
            isbn = %isbn,
            reservation_id = %record.reservation_id,
            position = record.queue_position,
            "Reserved title"
        );

        Ok(ReservationReceipt {
            reservation_id: record.reservation_id,
            queue_position: record.queue_position,
        })
    }

    /// Leaves the queue. Fulfilled reservations cannot be cancelled.
    pub async fn cancel_reservation(&self, reservation_id: &str) -> CirculationResult<()> {
        validate_record_id("reservation_id", reservation_id)?;

        let reservations = self.db.reservations();
        let existing = reservations.require(reservation_id).await?;

        let _queue = self.queue_locks.lock(&existing.isbn).await;
        let cancelled = reservations.cancel(reservation_id).await?;

        info!(
            reservation_id = %reservation_id,
            isbn = %cancelled.isbn,
            position = cancelled.queue_position,
            "Cancelled reservation"
        );
        Ok(())
    }

    // =========================================================================
    // Renewals and Overdue
    // =========================================================================

    /// Extends an open loan by the configured renewal period.
    ///
    /// ## Errors
    /// * `AlreadyClosed` - the record was returned
    /// * `RenewalLimitReached` - the policy cap is hit
    /// * `ReservationsPending` - someone is queued for the title
    pub async fn renew(&self, record_id: &str) -> CirculationResult<BorrowRecord> {
        validate_record_id("record_id", record_id)?;

        let borrows = self.db.borrows();
        let record = borrows.require(record_id).await?;
        let copy = self.db.copies().require(&record.copy_id).await?;
        let _queue = self.queue_locks.lock(&copy.isbn).await;

        // Re-read under the lock; a concurrent renewal may have bumped the count.
        let record = borrows.require(record_id).await?;
        self.policy.check_renewal(&record)?;

        let queued = self.db.reservations().count_active(&copy.isbn).await?;
        if queued > 0 {
            return Err(CoreError::ReservationsPending {
                isbn: copy.isbn,
                queued,
            }
            .into());
        }

        let renewed = borrows.renew(record_id, &self.policy, self.today()).await?;

        info!(
            record_id = %record_id,
            due_date = %renewed.due_date,
            renew_count = renewed.renew_count,
            "Renewed loan"
        );
        Ok(renewed)
    }

    /// Flips every BORROWED record past its due date to OVERDUE.
    pub async fn mark_overdue(&self) -> CirculationResult<u64> {
        let today = self.today();
        let marked = self.db.borrows().mark_overdue(today).await?;
        info!(count = marked, today = %today, "Overdue sweep complete");
        Ok(marked)
    }

    // =========================================================================
    // Holds
    // =========================================================================

    /// Releases an unclaimed hold on a RESERVED copy.
    ///
    /// The copy goes to the next ACTIVE reservation if there is one, or back
    /// to the shelf. When to call this is up to the caller.
    pub async fn release_hold(&self, copy_id: &str) -> CirculationResult<ReturnOutcome> {
        validate_record_id("copy_id", copy_id)?;

        let copy = self.db.copies().require(copy_id).await?;
        let isbn = copy.isbn.clone();
        let _locks = self.lock_title(&isbn).await;

        let copies = self.db.copies();
        let reservations = self.db.reservations();

        let copy = copies.require(copy_id).await?;
        if copy.status != CopyStatus::Reserved {
            return Err(CoreError::TransitionConflict {
                copy_id: copy_id.to_string(),
                expected: CopyStatus::Reserved.to_string(),
                actual: copy.status.to_string(),
            }
            .into());
        }

        let current = reservations.find_hold_for_copy(copy_id).await?;
        let next = reservations.dequeue_head(&isbn).await?;

        let outcome = match &next {
            Some(head) => {
                self.hand_to_reservation(copy_id, CopyStatus::Reserved, head)
                    .await?;
                ReturnOutcome::HeldForReservation {
                    reservation_id: head.reservation_id.clone(),
                    user_id: head.user_id.clone(),
                    counts: CopyCounts::default(),
                }
            }
            None => {
                copies
                    .transition(copy_id, CopyStatus::Reserved, CopyStatus::InLibrary)
                    .await?;
                ReturnOutcome::Restocked {
                    counts: CopyCounts::default(),
                }
            }
        };

        if let Some(hold) = &current {
            if let Err(err) = reservations.expire_hold(&hold.reservation_id).await {
                match &next {
                    Some(head) => {
                        self.compensate(
                            "reinstate reservation",
                            reservations.reinstate(&head.reservation_id),
                        )
                        .await
                    }
                    None => {
                        self.compensate(
                            "restore reserved copy",
                            copies.transition(copy_id, CopyStatus::InLibrary, CopyStatus::Reserved),
                        )
                        .await
                    }
                }
                return Err(err.into());
            }
        }

        let counts = self.counts_after_commit(&isbn).await;
        info!(
            copy_id = %copy_id,
            released = ?current.as_ref().map(|r| r.reservation_id.as_str()),
            "Released hold"
        );

        Ok(match outcome {
            ReturnOutcome::HeldForReservation {
                reservation_id,
                user_id,
                ..
            } => ReturnOutcome::HeldForReservation {
                reservation_id,
                user_id,
                counts,
            },
            ReturnOutcome::Restocked { .. } => ReturnOutcome::Restocked { counts },
        })
    }

    // =========================================================================
    // Copy Administration
    // =========================================================================

    /// Adds a copy. If readers are queued, the new copy goes straight to the
    /// head of the queue instead of the shelf.
    ///
    /// The copy exists once registration succeeds. If the hand-off to the
    /// queue fails it is undone and the copy is returned IN_LIBRARY.
    pub async fn register_copy(&self, isbn: &str, location: &str) -> CirculationResult<BookCopy> {
        validate_isbn(isbn)?;
        validate_location(location)?;

        let _locks = self.lock_title(isbn).await;
        let copies = self.db.copies();

        let copy = copies.register(isbn, location).await?;

        let head = match self.db.reservations().dequeue_head(isbn).await {
            Ok(head) => head,
            Err(err) => {
                warn!(
                    copy_id = %copy.copy_id,
                    error = %err,
                    "Registered copy without checking the queue"
                );
                return Ok(copy);
            }
        };

        let Some(head) = head else {
            info!(copy_id = %copy.copy_id, isbn = %isbn, "Registered copy");
            return Ok(copy);
        };

        if let Err(err) = self
            .hand_to_reservation(&copy.copy_id, CopyStatus::InLibrary, &head)
            .await
        {
            warn!(
                copy_id = %copy.copy_id,
                reservation_id = %head.reservation_id,
                error = %err,
                "Registered copy but could not hold it; left on the shelf"
            );
            return Ok(copies.require(&copy.copy_id).await.unwrap_or(copy));
        }

        info!(
            copy_id = %copy.copy_id,
            isbn = %isbn,
            reservation_id = %head.reservation_id,
            "Registered copy held for reservation"
        );
        Ok(BookCopy {
            status: CopyStatus::Reserved,
            ..copy
        })
    }

    pub async fn mark_damaged(&self, copy_id: &str) -> CirculationResult<BookCopy> {
        self.withdraw(copy_id, CopyStatus::Damaged).await
    }

    pub async fn mark_lost(&self, copy_id: &str) -> CirculationResult<BookCopy> {
        self.withdraw(copy_id, CopyStatus::Lost).await
    }

    /// Takes a copy out of circulation. A copy on loan must be returned
    /// first; a held copy gives its reservation back its place in the queue.
    async fn withdraw(&self, copy_id: &str, to: CopyStatus) -> CirculationResult<BookCopy> {
        validate_record_id("copy_id", copy_id)?;

        let copy = self.db.copies().require(copy_id).await?;
        let _locks = self.lock_title(&copy.isbn).await;

        let copies = self.db.copies();
        let reservations = self.db.reservations();

        if let Some(open) = self.db.borrows().find_open_by_copy(copy_id).await? {
            return Err(CoreError::CopyOnLoan {
                copy_id: copy_id.to_string(),
                record_id: open.record_id,
            }
            .into());
        }

        let hold = reservations.find_hold_for_copy(copy_id).await?;
        if let Some(hold) = &hold {
            reservations.reinstate(&hold.reservation_id).await?;
        }

        match copies.withdraw(copy_id, to).await {
            Ok(updated) => {
                info!(copy_id = %copy_id, status = %to, "Withdrew copy");
                Ok(updated)
            }
            Err(err) => {
                if let Some(hold) = &hold {
                    self.compensate(
                        "restore hold",
                        reservations.fulfill(&hold.reservation_id, copy_id),
                    )
                    .await;
                }
                Err(err.into())
            }
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Live counters for a title.
    pub async fn get_copy_counts(&self, isbn: &str) -> CirculationResult<CopyCounts> {
        validate_isbn(isbn)?;
        self.require_catalogued(isbn).await?;
        Ok(self.db.copies().counts_by_isbn(isbn).await?)
    }

    /// Catalog entry enriched with counters and queue length.
    pub async fn get_catalog_entry(&self, isbn: &str) -> CirculationResult<CatalogSummary> {
        validate_isbn(isbn)?;
        self.db.catalog().summary(isbn).await?.ok_or_else(|| {
            CoreError::CatalogEntryNotFound {
                isbn: isbn.to_string(),
            }
            .into()
        })
    }

    pub async fn get_open_borrows(&self, user_id: &str) -> CirculationResult<Vec<BorrowRecord>> {
        validate_user_id(user_id)?;
        Ok(self.db.borrows().find_open_by_user(user_id).await?)
    }

    pub async fn get_borrow_history(&self, user_id: &str) -> CirculationResult<Vec<BorrowRecord>> {
        validate_user_id(user_id)?;
        Ok(self.db.borrows().history(user_id).await?)
    }

    /// The user's queued reservation for the title, or their claimable hold.
    pub async fn get_my_reservation(
        &self,
        user_id: &str,
        isbn: &str,
    ) -> CirculationResult<ReservationRecord> {
        validate_user_id(user_id)?;
        validate_isbn(isbn)?;

        self.db
            .reservations()
            .find_for_user(user_id, isbn)
            .await?
            .ok_or_else(|| {
                CoreError::ReservationNotFound {
                    reservation_id: format!("{user_id}:{isbn}"),
                }
                .into()
            })
    }

    /// The ACTIVE queue for a title, head first.
    pub async fn list_queue(&self, isbn: &str) -> CirculationResult<Vec<ReservationRecord>> {
        validate_isbn(isbn)?;
        Ok(self.db.reservations().list_active(isbn).await?)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn require_catalogued(&self, isbn: &str) -> CirculationResult<()> {
        if self.db.catalog().exists(isbn).await? {
            Ok(())
        } else {
            Err(CoreError::CatalogEntryNotFound {
                isbn: isbn.to_string(),
            }
            .into())
        }
    }

    /// Both title locks, queue first.
    async fn lock_title(&self, isbn: &str) -> (OwnedMutexGuard<()>, OwnedMutexGuard<()>) {
        let queue = self.queue_locks.lock(isbn).await;
        let copies = self.copy_locks.lock(isbn).await;
        (queue, copies)
    }

    /// Counters read once an operation has committed. A failed read is
    /// logged and reported as zeroes rather than failing the operation.
    async fn counts_after_commit(&self, isbn: &str) -> CopyCounts {
        match self.db.copies().counts_by_isbn(isbn).await {
            Ok(counts) => counts,
            Err(err) => {
                warn!(isbn = %isbn, error = %err, "Could not read copy counts after commit");
                CopyCounts::default()
            }
        }
    }

    async fn compensate<T>(&self, step: &'static str, undo: impl Future<Output = DbResult<T>>) {
        match undo.await {
            Ok(_) => warn!(step, "Rolled back partial operation"),
            Err(err) => error!(step, error = %err, "Rollback failed; manual repair needed"),
        }
    }
}
