//! # Clock
//!
//! Source of "today" for borrow, due, return and reserve dates. The
//! coordinator never reads the system time directly, so tests can pin and
//! advance the date.

use std::fmt::Debug;
use std::sync::Mutex;

use chrono::{Days, NaiveDate, Utc};

/// Supplies the current calendar date.
pub trait Clock: Send + Sync + Debug {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock date in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A date that only moves when told to.
///
/// ## Usage
/// ```rust,ignore
/// let clock = Arc::new(FixedClock::new(date(2026, 3, 1)));
/// let engine = CirculationCoordinator::new(db, policy, clock.clone());
///
/// engine.borrow("alice", "B001").await?;  // due 2026-03-15
/// clock.advance(20);
/// engine.mark_overdue().await?;           // flips alice's record
/// ```
#[derive(Debug)]
pub struct FixedClock {
    date: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        FixedClock {
            date: Mutex::new(date),
        }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.date.lock().unwrap_or_else(|e| e.into_inner()) = date;
    }

    /// Moves the date forward by `days`.
    pub fn advance(&self, days: u64) {
        let mut date = self.date.lock().unwrap_or_else(|e| e.into_inner());
        *date = date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.date.lock().unwrap_or_else(|e| e.into_inner())
    }
}
