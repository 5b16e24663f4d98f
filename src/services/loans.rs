//! Lending engine
//!
//! The repository guarantees atomicity; this layer adds the default loan
//! period, the derived-status view, and the ownership rules for reads.

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::LoansConfig,
    error::AppResult,
    models::{
        loan::{IssueLoan, Loan, LoanDetails, ReturnOutcome},
        principal::Principal,
    },
    repository::Repository,
    services::authz::{authorize, Action},
};

#[derive(Clone)]
pub struct LoansService {
    repository: Repository,
    config: LoansConfig,
}

impl LoansService {
    pub fn new(repository: Repository, config: LoansConfig) -> Self {
        Self { repository, config }
    }

    /// Issue a loan. The due date defaults to the configured loan period
    /// from now when the request leaves it out.
    pub async fn issue(&self, principal: &Principal, request: IssueLoan) -> AppResult<LoanDetails> {
        authorize(principal, Action::IssueLoan, None)?;

        let due_at = request
            .due_at
            .unwrap_or_else(|| Utc::now() + Duration::days(self.config.default_period_days));

        let loan = self
            .repository
            .loans
            .issue(request.borrower_id, request.book_id, due_at)
            .await?;

        tracing::info!(
            loan_id = %loan.id,
            borrower_id = %loan.borrower_id,
            book_id = %loan.book_id,
            "loan issued"
        );

        Ok(LoanDetails::at(loan, Utc::now()))
    }

    /// Return a loan. Idempotent: a second return reports the no-op rather
    /// than failing or mutating.
    pub async fn return_loan(&self, principal: &Principal, id: Uuid) -> AppResult<ReturnOutcome> {
        authorize(principal, Action::ReturnLoan, None)?;

        let outcome = self.repository.loans.return_loan(id).await?;
        if let ReturnOutcome::Returned { loan } = &outcome {
            tracing::info!(loan_id = %loan.id, book_id = %loan.book_id, "loan returned");
        }
        Ok(outcome)
    }

    /// A loan, with its status computed against the current instant.
    /// Members may view their own loans; staff may view any.
    pub async fn get(&self, principal: &Principal, id: Uuid) -> AppResult<LoanDetails> {
        let loan = self.repository.loans.get_by_id(id).await?;
        authorize(principal, Action::ViewLoan, Some(loan.borrower_id))?;
        Ok(LoanDetails::at(loan, Utc::now()))
    }

    pub async fn list(&self, principal: &Principal) -> AppResult<Vec<LoanDetails>> {
        authorize(principal, Action::ListLoans, None)?;
        Ok(with_status(self.repository.loans.list().await?))
    }

    /// Open loans only (active or overdue).
    pub async fn list_open(&self, principal: &Principal) -> AppResult<Vec<LoanDetails>> {
        authorize(principal, Action::ListLoans, None)?;
        Ok(with_status(self.repository.loans.list_open().await?))
    }

    /// Overdue loans, computed at read time.
    pub async fn list_overdue(&self, principal: &Principal) -> AppResult<Vec<LoanDetails>> {
        authorize(principal, Action::ListLoans, None)?;
        let now = Utc::now();
        Ok(self
            .repository
            .loans
            .list_overdue(now)
            .await?
            .into_iter()
            .map(|loan| LoanDetails::at(loan, now))
            .collect())
    }

    /// A book's lending history (staff only).
    pub async fn list_for_book(
        &self,
        principal: &Principal,
        book_id: Uuid,
    ) -> AppResult<Vec<LoanDetails>> {
        authorize(principal, Action::ListLoans, None)?;
        Ok(with_status(
            self.repository.loans.list_for_book(book_id).await?,
        ))
    }

    /// A borrower's loan history. Owner-or-staff scoped.
    pub async fn list_for_borrower(
        &self,
        principal: &Principal,
        borrower_id: Uuid,
    ) -> AppResult<Vec<LoanDetails>> {
        authorize(principal, Action::ViewLoan, Some(borrower_id))?;
        Ok(with_status(
            self.repository.loans.list_for_borrower(borrower_id).await?,
        ))
    }

    /// Administrative hard delete of a lending record.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> AppResult<()> {
        authorize(principal, Action::DeleteLoan, None)?;
        self.repository.loans.delete(id).await
    }
}

fn with_status(loans: Vec<Loan>) -> Vec<LoanDetails> {
    let now = Utc::now();
    loans
        .into_iter()
        .map(|loan| LoanDetails::at(loan, now))
        .collect()
}
