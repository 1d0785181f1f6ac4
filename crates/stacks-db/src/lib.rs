//! # stacks-db: Database Layer for the Circulation Engine
//!
//! This crate provides storage for copies, borrow records and reservations.
//! It uses SQLite for durable storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stacks Data Flow                                 │
//! │                                                                         │
//! │  CirculationCoordinator::borrow(user_id, isbn)                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     stacks-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ CopyRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ BorrowRepo    │    │ 001_circ...  │  │   │
//! │  │   │ WAL, FKs on   │    │ ReservationRep│    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (stacks.db)                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Catalog, Copy Registry, Borrow Ledger and Reservation Queue
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stacks_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stacks.db")).await?;
//!
//! let counts = db.copies().counts_by_isbn("9780262033848").await?;
//! let queue = db.reservations().list_active("9780262033848").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use migrations::MigrationStatus;
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::borrow::BorrowRepository;
pub use repository::catalog::CatalogRepository;
pub use repository::copy::CopyRepository;
pub use repository::reservation::ReservationRepository;
