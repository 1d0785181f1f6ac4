//! # Repository Module
//!
//! Database repository implementations for the circulation engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    One Repository per Component                         │
//! │                                                                         │
//! │  CirculationCoordinator (stacks-engine)                                │
//! │       │                                                                 │
//! │       │  db.copies().transition(copy_id, InLibrary, Borrowed)          │
//! │       │  db.borrows().open(user_id, copy_id, today, due_date)          │
//! │       ▼                                                                 │
//! │  CopyRepository ─── BorrowRepository ─── ReservationRepository         │
//! │       │                    │                       │                    │
//! │       └────────────────────┼───────────────────────┘                    │
//! │                            ▼                                            │
//! │                     SQLite Database                                     │
//! │                                                                         │
//! │  Repositories never call each other. Anything touching two tables     │
//! │  in one logical step belongs to the coordinator.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CatalogRepository`](catalog::CatalogRepository) - Catalog lookups and summaries
//! - [`CopyRepository`](copy::CopyRepository) - Copy Registry
//! - [`BorrowRepository`](borrow::BorrowRepository) - Borrow Ledger
//! - [`ReservationRepository`](reservation::ReservationRepository) - Reservation Queue

pub mod borrow;
pub mod catalog;
pub mod copy;
pub mod reservation;

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use stacks_core::{BookCopy, CatalogEntry};

    use crate::pool::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn entry(isbn: &str) -> CatalogEntry {
        CatalogEntry {
            isbn: isbn.to_string(),
            title: format!("Title {isbn}"),
            author: "Test Author".to_string(),
            publisher: None,
            published_year: Some(2020),
        }
    }

    /// Catalogues `isbn` and registers `copies` IN_LIBRARY copies of it.
    pub async fn seed_title(db: &Database, isbn: &str, copies: usize) -> Vec<BookCopy> {
        db.catalog().insert(&entry(isbn)).await.unwrap();

        let mut registered = Vec::with_capacity(copies);
        for i in 0..copies {
            registered.push(
                db.copies()
                    .register(isbn, &format!("Stack {}", i + 1))
                    .await
                    .unwrap(),
            );
        }
        registered
    }
}
