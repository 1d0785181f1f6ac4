//! # Domain Types
//!
//! Records used throughout the circulation engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │  CatalogEntry   │   │    BookCopy     │   │    BorrowRecord     │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  isbn (key)     │◄──│  isbn (FK)      │◄──│  copy_id (FK)       │   │
//! │  │  title, author  │   │  copy_id        │   │  user_id            │   │
//! │  │                 │   │  status         │   │  due_date, status   │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! │          ▲                                                              │
//! │          │             ┌──────────────────────┐                         │
//! │          └─────────────│  ReservationRecord   │                         │
//! │                        │  isbn (title-level)  │                         │
//! │                        │  queue_position      │                         │
//! │                        └──────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Aggregate counts ([`CopyCounts`]) are never stored; they are computed
//! from live copy rows on every read.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::status::{BorrowStatus, CopyStatus, NotifyStatus, ReservationStatus};

// =============================================================================
// Catalog
// =============================================================================

/// One title, keyed by ISBN. Owned by the catalog; read-only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CatalogEntry {
    pub isbn: String,
    pub title: String,
    pub author: String,
    pub publisher: Option<String>,
    pub published_year: Option<i64>,
}

/// Derived per-ISBN counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CopyCounts {
    /// Every copy registered for the ISBN, including withdrawn ones.
    pub total: i64,
    /// Copies with status IN_LIBRARY.
    pub available: i64,
    /// Copies with status RESERVED.
    pub reserved: i64,
}

/// A catalog entry together with its counters, computed at read time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogSummary {
    #[serde(flatten)]
    pub entry: CatalogEntry,
    pub counts: CopyCounts,
    /// ACTIVE reservations waiting for this title.
    pub queue_length: i64,
}

// =============================================================================
// Copy
// =============================================================================

/// One physical, individually trackable copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BookCopy {
    pub copy_id: String,
    pub isbn: String,
    /// Shelf mark or branch location.
    pub location: String,
    pub status: CopyStatus,
}

impl BookCopy {
    #[inline]
    pub fn is_available(&self) -> bool {
        self.status == CopyStatus::InLibrary
    }
}

// =============================================================================
// Borrow Record
// =============================================================================

/// One checkout. Never deleted: the ledger is the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BorrowRecord {
    pub record_id: String,
    pub user_id: String,
    pub copy_id: String,
    #[ts(as = "String")]
    pub borrow_date: NaiveDate,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    #[ts(as = "Option<String>")]
    pub return_date: Option<NaiveDate>,
    pub renew_count: i64,
    pub status: BorrowStatus,
}

impl BorrowRecord {
    /// BORROWED or OVERDUE.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// True if the record is still open and its due date has passed.
    pub fn is_past_due(&self, today: NaiveDate) -> bool {
        self.is_open() && self.due_date < today
    }
}

// =============================================================================
// Reservation Record
// =============================================================================

/// A place in the FIFO queue for a title (not a specific copy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReservationRecord {
    pub reservation_id: String,
    pub user_id: String,
    pub isbn: String,
    #[ts(as = "String")]
    pub reserve_date: NaiveDate,
    pub status: ReservationStatus,
    /// 1-based; dense among ACTIVE records of the same ISBN.
    /// Terminal records keep the position they left the queue at.
    pub queue_position: i64,
    pub notify_status: NotifyStatus,
    /// Copy set aside for this reservation at fulfillment.
    pub allocated_copy_id: Option<String>,
    /// When the holder borrowed the allocated copy.
    #[ts(as = "Option<String>")]
    pub claimed_date: Option<NaiveDate>,
    /// Set when an unclaimed hold was released to the next in line.
    pub hold_expired: bool,
}

impl ReservationRecord {
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    /// Fulfilled, not yet borrowed and not released.
    pub fn is_claimable(&self) -> bool {
        self.status == ReservationStatus::Fulfilled
            && self.allocated_copy_id.is_some()
            && self.claimed_date.is_none()
            && !self.hold_expired
    }
}

// =============================================================================
// Operation Results
// =============================================================================

/// Result of a successful borrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct BorrowReceipt {
    pub record_id: String,
    pub copy_id: String,
    pub isbn: String,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    /// Set when the borrow consumed a reservation hold.
    pub reservation_id: Option<String>,
    pub counts: CopyCounts,
}

/// Result of a successful reserve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReservationReceipt {
    pub reservation_id: String,
    pub queue_position: i64,
}

/// What happened to a copy when it came back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReturnOutcome {
    /// Back on the shelf.
    Restocked { counts: CopyCounts },
    /// Set aside for the head of the queue.
    HeldForReservation {
        reservation_id: String,
        user_id: String,
        counts: CopyCounts,
    },
}

impl ReturnOutcome {
    pub fn counts(&self) -> CopyCounts {
        match self {
            ReturnOutcome::Restocked { counts } => *counts,
            ReturnOutcome::HeldForReservation { counts, .. } => *counts,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(status: BorrowStatus) -> BorrowRecord {
        BorrowRecord {
            record_id: "rec-1".into(),
            user_id: "alice".into(),
            copy_id: "copy-1".into(),
            borrow_date: date(2026, 3, 1),
            due_date: date(2026, 3, 15),
            return_date: None,
            renew_count: 0,
            status,
        }
    }

    #[test]
    fn test_past_due_only_when_open() {
        let today = date(2026, 3, 16);
        assert!(record(BorrowStatus::Borrowed).is_past_due(today));
        assert!(!record(BorrowStatus::Returned).is_past_due(today));
        assert!(!record(BorrowStatus::Borrowed).is_past_due(date(2026, 3, 15)));
    }

    #[test]
    fn test_claimable_reservation() {
        let mut res = ReservationRecord {
            reservation_id: "res-1".into(),
            user_id: "bob".into(),
            isbn: "B001".into(),
            reserve_date: date(2026, 3, 2),
            status: ReservationStatus::Fulfilled,
            queue_position: 1,
            notify_status: NotifyStatus::Notified,
            allocated_copy_id: Some("copy-1".into()),
            claimed_date: None,
            hold_expired: false,
        };
        assert!(res.is_claimable());

        res.hold_expired = true;
        assert!(!res.is_claimable());
    }

    #[test]
    fn test_return_outcome_serializes_with_kind_tag() {
        let outcome = ReturnOutcome::Restocked {
            counts: CopyCounts {
                total: 1,
                available: 1,
                reserved: 0,
            },
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["kind"], "restocked");
        assert_eq!(outcome.counts().available, 1);
    }
}
