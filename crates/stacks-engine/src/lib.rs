//! # stacks-engine: Circulation Coordinator for Stacks
//!
//! Turns the three storage components into the operations a library desk
//! performs: borrow, return, reserve and cancel, plus renewals, overdue
//! sweeps and copy administration.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Stacks Layering                                │
//! │                                                                         │
//! │   caller (desk UI, admin CLI, HTTP layer)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 stacks-engine (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   CirculationCoordinator ──► KeyedLocks (queue, copies)         │   │
//! │  │          │                   Clock (system / fixed)             │   │
//! │  │          │                   EngineConfig (TOML + env)          │   │
//! │  └──────────┼──────────────────────────────────────────────────────┘   │
//! │             ▼                                                           │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │  stacks-db: CopyRepository  BorrowRepository                    │   │
//! │  │             ReservationRepository  CatalogRepository            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │             │                                                           │
//! │             ▼                                                           │
//! │  stacks-core: records, status tables, LoanPolicy, CoreError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`coordinator`] - `CirculationCoordinator` and its compensation logic
//! - [`locks`] - Per-ISBN async mutex registry
//! - [`clock`] - Injectable source of "today"
//! - [`config`] - Engine configuration (file, environment, defaults)
//! - [`error`] - Coordinator error type
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stacks_engine::{CirculationCoordinator, EngineConfig};
//!
//! let config = EngineConfig::load(None)?;
//! let engine = CirculationCoordinator::from_config(&config).await?;
//!
//! let receipt = engine.borrow("alice", "9780262033848").await?;
//! println!("Due back {}", receipt.due_date);
//!
//! engine
//!     .return_copy(&receipt.record_id, &receipt.copy_id, "9780262033848")
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod locks;

// =============================================================================
// Re-exports
// =============================================================================

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{DatabaseSettings, EngineConfig, PolicySettings};
pub use coordinator::CirculationCoordinator;
pub use error::{CirculationError, CirculationResult};
pub use locks::KeyedLocks;
