//! # Loan Policy
//!
//! Date math for loans and renewals. The periods are configuration, never
//! hard-coded in the coordinator; the engine crate builds a [`LoanPolicy`]
//! from its config file.
//!
//! Renewal count is unbounded unless `max_renewals` is set.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::BorrowRecord;
use crate::{DEFAULT_LOAN_PERIOD_DAYS, DEFAULT_RENEWAL_DAYS, MAX_PERIOD_DAYS};

/// Loan period and renewal rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanPolicy {
    /// Days from borrow date to due date.
    pub loan_period_days: u32,
    /// Days added to the due date per renewal.
    pub renewal_days: u32,
    /// Optional cap on renewals per borrow record.
    pub max_renewals: Option<u32>,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        LoanPolicy {
            loan_period_days: DEFAULT_LOAN_PERIOD_DAYS,
            renewal_days: DEFAULT_RENEWAL_DAYS,
            max_renewals: None,
        }
    }
}

impl LoanPolicy {
    /// Creates a policy, validating both periods.
    pub fn new(loan_period_days: u32, renewal_days: u32) -> CoreResult<Self> {
        let policy = LoanPolicy {
            loan_period_days,
            renewal_days,
            max_renewals: None,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Caps the number of renewals.
    pub fn with_max_renewals(mut self, max: u32) -> Self {
        self.max_renewals = Some(max);
        self
    }

    /// Both periods must lie in `1..=MAX_PERIOD_DAYS`.
    pub fn validate(&self) -> CoreResult<()> {
        for (field, value) in [
            ("loan_period_days", self.loan_period_days),
            ("renewal_days", self.renewal_days),
        ] {
            if value == 0 || value > MAX_PERIOD_DAYS {
                return Err(ValidationError::OutOfRange {
                    field: field.to_string(),
                    min: 1,
                    max: MAX_PERIOD_DAYS as i64,
                }
                .into());
            }
        }
        Ok(())
    }

    /// `borrow_date + loan_period`.
    pub fn due_date(&self, borrow_date: NaiveDate) -> NaiveDate {
        add_days(borrow_date, self.loan_period_days)
    }

    /// Due date after one more renewal.
    pub fn renewed_due_date(&self, current_due: NaiveDate) -> NaiveDate {
        add_days(current_due, self.renewal_days)
    }

    /// Rejects renewal of closed records and records at the cap.
    pub fn check_renewal(&self, record: &BorrowRecord) -> CoreResult<()> {
        if !record.is_open() {
            return Err(CoreError::AlreadyClosed {
                record_id: record.record_id.clone(),
            });
        }

        if let Some(max) = self.max_renewals {
            if record.renew_count >= i64::from(max) {
                return Err(CoreError::RenewalLimitReached {
                    record_id: record.record_id.clone(),
                    max,
                });
            }
        }

        Ok(())
    }
}

fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    // Saturates at chrono's max date rather than panicking.
    date.checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::BorrowStatus;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn open_record(renew_count: i64) -> BorrowRecord {
        BorrowRecord {
            record_id: "rec-1".into(),
            user_id: "alice".into(),
            copy_id: "copy-1".into(),
            borrow_date: date(2026, 1, 1),
            due_date: date(2026, 1, 15),
            return_date: None,
            renew_count,
            status: BorrowStatus::Borrowed,
        }
    }

    #[test]
    fn test_due_date_crosses_month() {
        let policy = LoanPolicy::new(14, 7).unwrap();
        assert_eq!(policy.due_date(date(2026, 1, 25)), date(2026, 2, 8));
        assert_eq!(policy.renewed_due_date(date(2026, 2, 8)), date(2026, 2, 15));
    }

    #[test]
    fn test_rejects_zero_and_oversized_periods() {
        assert!(LoanPolicy::new(0, 7).is_err());
        assert!(LoanPolicy::new(14, MAX_PERIOD_DAYS + 1).is_err());
        assert!(LoanPolicy::default().validate().is_ok());
    }

    #[test]
    fn test_renewal_unbounded_by_default() {
        let policy = LoanPolicy::default();
        assert!(policy.check_renewal(&open_record(50)).is_ok());
    }

    #[test]
    fn test_renewal_cap() {
        let policy = LoanPolicy::default().with_max_renewals(2);
        assert!(policy.check_renewal(&open_record(1)).is_ok());

        let err = policy.check_renewal(&open_record(2)).unwrap_err();
        assert!(matches!(err, CoreError::RenewalLimitReached { max: 2, .. }));
    }

    #[test]
    fn test_closed_record_cannot_renew() {
        let mut record = open_record(0);
        record.status = BorrowStatus::Returned;
        let err = LoanPolicy::default().check_renewal(&record).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyClosed { .. }));
    }
}
