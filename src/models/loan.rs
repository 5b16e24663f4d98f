//! Loan (lending record) model and state machine types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Effective state of a loan. `Overdue` is a derived view of an active loan
/// past its due date; it is never stored, so it cannot drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Active,
    Overdue,
    Returned,
}

/// Loan record as stored. Status is not a column: it is computed from
/// `returned_at` and `due_at` via [`Loan::effective_status`].
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Loan {
    pub id: Uuid,
    pub borrower_id: Uuid,
    pub book_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub due_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Loan {
    /// Single source of truth for a loan's state. A recorded return takes
    /// precedence over the due date.
    pub fn effective_status(&self, now: DateTime<Utc>) -> LoanStatus {
        if self.returned_at.is_some() {
            LoanStatus::Returned
        } else if now > self.due_at {
            LoanStatus::Overdue
        } else {
            LoanStatus::Active
        }
    }
}

/// Loan with its computed status, as returned by listings
#[derive(Debug, Clone, Serialize)]
pub struct LoanDetails {
    #[serde(flatten)]
    pub loan: Loan,
    pub status: LoanStatus,
}

impl LoanDetails {
    pub fn at(loan: Loan, now: DateTime<Utc>) -> Self {
        let status = loan.effective_status(now);
        Self { loan, status }
    }
}

/// Issue loan request
#[derive(Debug, Deserialize)]
pub struct IssueLoan {
    pub borrower_id: Uuid,
    pub book_id: Uuid,
    /// Defaults to the configured loan period when absent.
    pub due_at: Option<DateTime<Utc>>,
}

/// Outcome of a return call. Returning an already-returned loan is a no-op
/// reported as such, not an error and not a second mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReturnOutcome {
    Returned { loan: Loan },
    AlreadyReturned { loan: Loan },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn loan(due_in: Duration, returned: Option<DateTime<Utc>>) -> Loan {
        let now = Utc::now();
        Loan {
            id: Uuid::new_v4(),
            borrower_id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            issued_at: now - Duration::days(1),
            due_at: now + due_in,
            returned_at: returned,
        }
    }

    #[test]
    fn loan_within_due_date_is_active() {
        let l = loan(Duration::days(7), None);
        assert_eq!(l.effective_status(Utc::now()), LoanStatus::Active);
    }

    #[test]
    fn loan_past_due_date_is_overdue() {
        let l = loan(Duration::days(7), None);
        let later = l.due_at + Duration::days(1);
        assert_eq!(l.effective_status(later), LoanStatus::Overdue);
    }

    #[test]
    fn exactly_at_due_date_is_still_active() {
        let l = loan(Duration::days(7), None);
        assert_eq!(l.effective_status(l.due_at), LoanStatus::Active);
    }

    #[test]
    fn return_takes_precedence_over_due_date() {
        let mut l = loan(Duration::days(7), None);
        let past_due = l.due_at + Duration::days(1);
        assert_eq!(l.effective_status(past_due), LoanStatus::Overdue);

        l.returned_at = Some(past_due);
        assert_eq!(l.effective_status(past_due), LoanStatus::Returned);
    }
}
