//! # Status Types
//!
//! Closed status enums for copies, borrow records and reservations, each
//! with an explicit transition table. Any edge not listed is rejected with
//! [`CoreError::IllegalTransition`].
//!
//! ## Copy Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Copy Status Edges                               │
//! │                                                                         │
//! │                 borrow                                                  │
//! │   IN_LIBRARY ───────────────► BORROWED                                  │
//! │      ▲  │  ◄───────────────    │                                        │
//! │      │  │       return         │ return with queued reservation         │
//! │      │  │ hold                 ▼                                        │
//! │      │  └─────────────────► RESERVED ───────► BORROWED (holder claims)  │
//! │      └──────────────────────── │                                        │
//! │              hold released                                              │
//! │                                                                         │
//! │   any ──► DAMAGED / LOST  (administrative)                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

// =============================================================================
// Copy Status
// =============================================================================

/// Status of one physical copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CopyStatus {
    /// On the shelf, can be borrowed by anyone.
    InLibrary,
    /// Checked out under an open borrow record.
    Borrowed,
    /// Held for the head of the reservation queue.
    Reserved,
    /// Withdrawn for repair.
    Damaged,
    /// Missing.
    Lost,
}

impl CopyStatus {
    pub const ALL: [CopyStatus; 5] = [
        CopyStatus::InLibrary,
        CopyStatus::Borrowed,
        CopyStatus::Reserved,
        CopyStatus::Damaged,
        CopyStatus::Lost,
    ];

    /// Returns true if `self → to` is a legal edge.
    ///
    /// `BORROWED → RESERVED` is the return hand-off edge: a returned copy
    /// goes straight to the next reservation without touching the shelf.
    pub const fn can_transition_to(self, to: CopyStatus) -> bool {
        use CopyStatus::*;
        match (self, to) {
            (InLibrary, Borrowed) | (InLibrary, Reserved) => true,
            (Borrowed, InLibrary) | (Borrowed, Reserved) => true,
            (Reserved, InLibrary) | (Reserved, Borrowed) => true,
            (Damaged, Damaged) | (Lost, Lost) => false,
            (_, Damaged) | (_, Lost) => true,
            _ => false,
        }
    }

    /// Validates the edge, returning an error naming the copy on failure.
    pub fn check_transition(self, to: CopyStatus, copy_id: &str) -> CoreResult<()> {
        if self.can_transition_to(to) {
            Ok(())
        } else {
            Err(CoreError::illegal_transition("copy", copy_id, self, to))
        }
    }

    /// Administrative statuses are out of circulation.
    pub const fn is_withdrawn(self) -> bool {
        matches!(self, CopyStatus::Damaged | CopyStatus::Lost)
    }

    /// Storage representation (matches the sqlx encoding).
    pub const fn as_str(self) -> &'static str {
        match self {
            CopyStatus::InLibrary => "in_library",
            CopyStatus::Borrowed => "borrowed",
            CopyStatus::Reserved => "reserved",
            CopyStatus::Damaged => "damaged",
            CopyStatus::Lost => "lost",
        }
    }
}

impl fmt::Display for CopyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CopyStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in_library" | "available" => Ok(CopyStatus::InLibrary),
            "borrowed" => Ok(CopyStatus::Borrowed),
            "reserved" => Ok(CopyStatus::Reserved),
            "damaged" => Ok(CopyStatus::Damaged),
            "lost" => Ok(CopyStatus::Lost),
            other => Err(CoreError::UnknownStatus {
                kind: "copy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// Borrow Status
// =============================================================================

/// Status of a borrow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BorrowStatus {
    Borrowed,
    Returned,
    Overdue,
}

impl BorrowStatus {
    /// Open records still hold their copy.
    pub const fn is_open(self) -> bool {
        matches!(self, BorrowStatus::Borrowed | BorrowStatus::Overdue)
    }

    /// `OVERDUE → BORROWED` is taken by a renewal that moves the due date
    /// back into the future.
    pub const fn can_transition_to(self, to: BorrowStatus) -> bool {
        use BorrowStatus::*;
        matches!(
            (self, to),
            (Borrowed, Returned) | (Borrowed, Overdue) | (Overdue, Returned) | (Overdue, Borrowed)
        )
    }

    pub fn check_transition(self, to: BorrowStatus, record_id: &str) -> CoreResult<()> {
        if self.can_transition_to(to) {
            return Ok(());
        }
        if self == BorrowStatus::Returned {
            return Err(CoreError::AlreadyClosed {
                record_id: record_id.to_string(),
            });
        }
        Err(CoreError::illegal_transition("borrow record", record_id, self, to))
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BorrowStatus::Borrowed => "borrowed",
            BorrowStatus::Returned => "returned",
            BorrowStatus::Overdue => "overdue",
        }
    }
}

impl fmt::Display for BorrowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Reservation Status
// =============================================================================

/// Status of a reservation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    /// Waiting in the queue.
    Active,
    /// Withdrawn by the user. Terminal.
    Cancelled,
    /// A copy was allocated to this reservation. Terminal.
    Fulfilled,
}

impl ReservationStatus {
    pub const fn can_transition_to(self, to: ReservationStatus) -> bool {
        matches!(
            (self, to),
            (ReservationStatus::Active, ReservationStatus::Cancelled)
                | (ReservationStatus::Active, ReservationStatus::Fulfilled)
        )
    }

    /// Maps a rejected edge to the lifecycle error callers expect.
    pub fn check_transition(self, to: ReservationStatus, reservation_id: &str) -> CoreResult<()> {
        let reservation_id = reservation_id.to_string();
        match self {
            _ if self.can_transition_to(to) => Ok(()),
            ReservationStatus::Fulfilled => Err(CoreError::AlreadyFulfilled { reservation_id }),
            ReservationStatus::Cancelled => Err(CoreError::AlreadyCancelled { reservation_id }),
            ReservationStatus::Active => Err(CoreError::illegal_transition(
                "reservation",
                &reservation_id,
                self,
                to,
            )),
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ReservationStatus::Active => "active",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Fulfilled => "fulfilled",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Notify Status
// =============================================================================

/// Whether the holder has been told a copy is waiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotifyStatus {
    #[default]
    Pending,
    Notified,
}

impl NotifyStatus {
    /// Notification is idempotent: NOTIFIED → NOTIFIED is allowed.
    pub const fn can_transition_to(self, to: NotifyStatus) -> bool {
        matches!(to, NotifyStatus::Notified)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            NotifyStatus::Pending => "pending",
            NotifyStatus::Notified => "notified",
        }
    }
}

impl fmt::Display for NotifyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_edges_match_table() {
        use CopyStatus::*;
        let allowed = [
            (InLibrary, Borrowed),
            (InLibrary, Reserved),
            (Borrowed, InLibrary),
            (Borrowed, Reserved),
            (Reserved, InLibrary),
            (Reserved, Borrowed),
        ];

        for from in CopyStatus::ALL {
            for to in CopyStatus::ALL {
                let expected = allowed.contains(&(from, to))
                    || (to.is_withdrawn() && from != to);
                assert_eq!(
                    from.can_transition_to(to),
                    expected,
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn test_withdrawn_copies_never_return_to_circulation() {
        for to in [CopyStatus::InLibrary, CopyStatus::Borrowed, CopyStatus::Reserved] {
            assert!(!CopyStatus::Damaged.can_transition_to(to));
            assert!(!CopyStatus::Lost.can_transition_to(to));
        }
    }

    #[test]
    fn test_copy_check_transition_error() {
        let err = CopyStatus::Lost
            .check_transition(CopyStatus::Borrowed, "copy-1")
            .unwrap_err();
        assert!(matches!(err, CoreError::IllegalTransition { .. }));
        assert!(err.to_string().contains("copy-1"));
    }

    #[test]
    fn test_copy_status_parse() {
        assert_eq!("IN_LIBRARY".parse::<CopyStatus>().unwrap(), CopyStatus::InLibrary);
        assert_eq!("reserved".parse::<CopyStatus>().unwrap(), CopyStatus::Reserved);
        assert!("shelved".parse::<CopyStatus>().is_err());
    }

    #[test]
    fn test_borrow_close_twice_is_already_closed() {
        let err = BorrowStatus::Returned
            .check_transition(BorrowStatus::Returned, "rec-1")
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyClosed { .. }));
        assert!(BorrowStatus::Overdue.check_transition(BorrowStatus::Returned, "rec-1").is_ok());
    }

    #[test]
    fn test_renewal_can_clear_overdue() {
        assert!(BorrowStatus::Overdue.can_transition_to(BorrowStatus::Borrowed));
        assert!(!BorrowStatus::Returned.can_transition_to(BorrowStatus::Borrowed));
        assert!(!BorrowStatus::Borrowed.can_transition_to(BorrowStatus::Borrowed));
    }

    #[test]
    fn test_reservation_terminal_states() {
        let err = ReservationStatus::Fulfilled
            .check_transition(ReservationStatus::Cancelled, "res-1")
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyFulfilled { .. }));

        let err = ReservationStatus::Cancelled
            .check_transition(ReservationStatus::Cancelled, "res-1")
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyCancelled { .. }));
    }

    #[test]
    fn test_notify_is_idempotent() {
        assert!(NotifyStatus::Pending.can_transition_to(NotifyStatus::Notified));
        assert!(NotifyStatus::Notified.can_transition_to(NotifyStatus::Notified));
        assert!(!NotifyStatus::Notified.can_transition_to(NotifyStatus::Pending));
    }

    #[test]
    fn test_serde_uses_screaming_case() {
        let json = serde_json::to_string(&CopyStatus::InLibrary).unwrap();
        assert_eq!(json, "\"IN_LIBRARY\"");
    }
}
