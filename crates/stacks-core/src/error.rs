//! # Error Types
//!
//! Domain-specific error types for stacks-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stacks-core errors (this file)                                        │
//! │  ├── CoreError        - Circulation rule violations                    │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stacks-db errors (separate crate)                                     │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  stacks-engine errors                                                  │
//! │  └── CirculationError - What callers of the coordinator see            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → CirculationError        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Every variant carries the ids and statuses a caller needs to decide
//!    whether to retry, pick another copy or fall back to reserving
//! 2. Errors are enum variants, never String

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Circulation rule violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// No catalog entry for this ISBN.
    #[error("Catalog entry not found: {isbn}")]
    CatalogEntryNotFound { isbn: String },

    #[error("Copy not found: {copy_id}")]
    CopyNotFound { copy_id: String },

    #[error("Borrow record not found: {record_id}")]
    BorrowRecordNotFound { record_id: String },

    #[error("Reservation not found: {reservation_id}")]
    ReservationNotFound { reservation_id: String },

    /// No IN_LIBRARY copy exists for a borrow attempt.
    ///
    /// ## User Workflow
    /// ```text
    /// Borrow(isbn)
    ///      │
    ///      ▼
    /// find_available_copy → none
    ///      │
    ///      ▼
    /// NoCopyAvailable { isbn }
    ///      │
    ///      ▼
    /// Caller offers Reserve instead
    /// ```
    #[error("No copy of {isbn} is available to borrow")]
    NoCopyAvailable { isbn: String },

    /// Lost the race for a copy twice in a row.
    #[error("Contention on {isbn}: copy {copy_id} was claimed concurrently")]
    Contention { isbn: String, copy_id: String },

    /// Conditional copy update found a different status than expected.
    #[error("Copy {copy_id} is {actual}, expected {expected}")]
    TransitionConflict {
        copy_id: String,
        expected: String,
        actual: String,
    },

    /// An edge outside the transition table was requested.
    #[error("Illegal {entity} transition for {id}: {from} -> {to}")]
    IllegalTransition {
        entity: String,
        id: String,
        from: String,
        to: String,
    },

    /// An open borrow record already exists for this copy.
    #[error("Copy {copy_id} is already borrowed under record {record_id}")]
    AlreadyBorrowed { copy_id: String, record_id: String },

    #[error("Borrow record {record_id} is already closed")]
    AlreadyClosed { record_id: String },

    /// Return was called with a copy that the record does not reference.
    #[error("Borrow record {record_id} is for copy {expected}, not {actual}")]
    CopyMismatch {
        record_id: String,
        expected: String,
        actual: String,
    },

    /// Administrative withdrawal of a copy that is still on loan.
    #[error("Copy {copy_id} is on loan under record {record_id}")]
    CopyOnLoan { copy_id: String, record_id: String },

    /// Reservations are only accepted while nothing is borrowable.
    #[error("{available} copies of {isbn} are available; borrow instead of reserving")]
    CopyAvailable { isbn: String, available: i64 },

    #[error("User {user_id} already holds reservation {reservation_id} for {isbn}")]
    AlreadyReserved {
        reservation_id: String,
        user_id: String,
        isbn: String,
    },

    #[error("Reservation {reservation_id} is already fulfilled")]
    AlreadyFulfilled { reservation_id: String },

    #[error("Reservation {reservation_id} is already cancelled")]
    AlreadyCancelled { reservation_id: String },

    #[error("Borrow record {record_id} reached the renewal limit ({max})")]
    RenewalLimitReached { record_id: String, max: u32 },

    /// Renewing would hold the copy back from a waiting queue.
    #[error("Cannot renew: {queued} reservations are waiting for {isbn}")]
    ReservationsPending { isbn: String, queued: i64 },

    /// A persisted status string outside the known set.
    #[error("Unknown {kind} status: {value}")]
    UnknownStatus { kind: String, value: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Builds an `IllegalTransition` from any displayable status pair.
    pub fn illegal_transition(
        entity: &str,
        id: &str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        CoreError::IllegalTransition {
            entity: entity.to_string(),
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns true for any of the not-found variants.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::CatalogEntryNotFound { .. }
                | CoreError::CopyNotFound { .. }
                | CoreError::BorrowRecordNotFound { .. }
                | CoreError::ReservationNotFound { .. }
        )
    }

    /// Stable identifier for callers that branch on the error kind.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::CatalogEntryNotFound { .. }
            | CoreError::CopyNotFound { .. }
            | CoreError::BorrowRecordNotFound { .. }
            | CoreError::ReservationNotFound { .. } => "NOT_FOUND",
            CoreError::NoCopyAvailable { .. } => "NO_COPY_AVAILABLE",
            CoreError::Contention { .. } => "CONTENTION",
            CoreError::TransitionConflict { .. } => "CONFLICT",
            CoreError::IllegalTransition { .. } => "ILLEGAL_TRANSITION",
            CoreError::AlreadyBorrowed { .. } => "ALREADY_BORROWED",
            CoreError::AlreadyClosed { .. } => "ALREADY_CLOSED",
            CoreError::CopyMismatch { .. } => "COPY_MISMATCH",
            CoreError::CopyOnLoan { .. } => "COPY_ON_LOAN",
            CoreError::CopyAvailable { .. } => "COPY_AVAILABLE",
            CoreError::AlreadyReserved { .. } => "ALREADY_RESERVED",
            CoreError::AlreadyFulfilled { .. } => "ALREADY_FULFILLED",
            CoreError::AlreadyCancelled { .. } => "ALREADY_CANCELLED",
            CoreError::RenewalLimitReached { .. } => "RENEWAL_LIMIT_REACHED",
            CoreError::ReservationsPending { .. } => "RESERVATIONS_PENDING",
            CoreError::UnknownStatus { .. } => "UNKNOWN_STATUS",
            CoreError::Validation(_) => "VALIDATION",
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller input doesn't meet requirements.
/// Used for early validation before any record is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., unexpected characters in an ISBN).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::CopyAvailable {
            isbn: "B001".to_string(),
            available: 2,
        };
        assert_eq!(
            err.to_string(),
            "2 copies of B001 are available; borrow instead of reserving"
        );

        let err = CoreError::TransitionConflict {
            copy_id: "c-1".to_string(),
            expected: "in_library".to_string(),
            actual: "borrowed".to_string(),
        };
        assert_eq!(err.to_string(), "Copy c-1 is borrowed, expected in_library");
    }

    #[test]
    fn test_not_found_family() {
        assert!(CoreError::CopyNotFound {
            copy_id: "x".into()
        }
        .is_not_found());
        assert!(!CoreError::NoCopyAvailable { isbn: "x".into() }.is_not_found());
    }

    #[test]
    fn test_codes() {
        let err = CoreError::ReservationNotFound {
            reservation_id: "r".into(),
        };
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(
            CoreError::Contention {
                isbn: "i".into(),
                copy_id: "c".into()
            }
            .code(),
            "CONTENTION"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "isbn".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.code(), "VALIDATION");
    }
}
