//! # stacks-core: Pure Circulation Rules
//!
//! This crate holds the domain model of the Stacks circulation engine:
//! the records that describe physical copies, borrow records and
//! reservations, and the rules that govern how their statuses may change.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stacks Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               stacks-engine (Circulation Coordinator)           │   │
//! │  │    borrow, return_copy, reserve, cancel_reservation, renew      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stacks-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  status   │  │  policy   │  │ validation│  │   │
//! │  │   │ BookCopy  │  │ CopyStatus│  │ LoanPolicy│  │   isbn    │  │   │
//! │  │   │  Borrow   │  │  edges    │  │ due dates │  │  user id  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stacks-db (Database Layer)                   │   │
//! │  │      copies, borrow_records, reservation_records (SQLite)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Records (BookCopy, BorrowRecord, ReservationRecord, ...)
//! - [`status`] - Closed status enums with explicit transition tables
//! - [`policy`] - Loan period and renewal rules
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use stacks_core::CopyStatus;
//!
//! assert!(CopyStatus::InLibrary.can_transition_to(CopyStatus::Borrowed));
//! assert!(!CopyStatus::Lost.can_transition_to(CopyStatus::InLibrary));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod policy;
pub mod status;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use policy::LoanPolicy;
pub use status::{BorrowStatus, CopyStatus, NotifyStatus, ReservationStatus};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default loan period in days when no configuration overrides it.
pub const DEFAULT_LOAN_PERIOD_DAYS: u32 = 14;

/// Default renewal extension in days.
pub const DEFAULT_RENEWAL_DAYS: u32 = 14;

/// Upper bound accepted for any configured period.
///
/// ## Business Reason
/// Guards against typos like 1400 instead of 14 in the config file.
pub const MAX_PERIOD_DAYS: u32 = 365;
