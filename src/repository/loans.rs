//! Loans repository: the persistence half of the lending engine
//!
//! Issue and return are single atomic units with respect to concurrent
//! calls on the same borrower or book. Issue runs in a transaction that
//! locks the borrower row, so the limit check cannot race another issue;
//! the partial unique index on `loans(book_id) WHERE returned_at IS NULL`
//! makes double-lending impossible regardless of interleaving. Return is a
//! single conditional update whose matched count distinguishes a real
//! return from an already-returned no-op.

use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::{map_unique_violation, AppError, AppResult},
    models::loan::{Loan, ReturnOutcome},
};

#[derive(Clone)]
pub struct LoansRepository {
    pool: Pool<Postgres>,
}

impl LoansRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get loan by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Loan> {
        sqlx::query_as::<_, Loan>("SELECT * FROM loans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loan with id {} not found", id)))
    }

    /// Issue a new loan. All preconditions are checked and the row written
    /// inside one transaction; nothing is observable on failure.
    pub async fn issue(
        &self,
        borrower_id: Uuid,
        book_id: Uuid,
        due_at: DateTime<Utc>,
    ) -> AppResult<Loan> {
        let mut tx = self.pool.begin().await?;

        // Lock the borrower row so two concurrent issues for the same
        // borrower serialize on the limit check.
        let borrower = sqlx::query(
            "SELECT status, borrowing_limit FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(borrower_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", borrower_id)))?;

        let status: String = borrower.get("status");
        if status != "active" {
            return Err(AppError::BusinessRule(
                "BORROWER_INACTIVE",
                format!("Borrower account is {}", status),
            ));
        }

        let limit: i32 = borrower.get("borrowing_limit");
        let open_loans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM loans WHERE borrower_id = $1 AND returned_at IS NULL",
        )
        .bind(borrower_id)
        .fetch_one(&mut *tx)
        .await?;

        // Active-or-overdue both count against the limit; effective status
        // collapses to `returned_at IS NULL` here.
        if open_loans >= limit as i64 {
            return Err(AppError::BusinessRule(
                "BORROWING_LIMIT_REACHED",
                format!("Borrowing limit reached ({}/{})", open_loans, limit),
            ));
        }

        // The partial unique index rejects a second open loan for the book.
        let loan = sqlx::query_as::<_, Loan>(
            r#"
            INSERT INTO loans (id, borrower_id, book_id, issued_at, due_at)
            VALUES ($1, $2, $3, NOW(), $4)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(borrower_id)
        .bind(book_id)
        .bind(due_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        tx.commit().await?;
        Ok(loan)
    }

    /// Return a loan. The conditional update only matches a still-open loan,
    /// so a second call cannot mutate anything.
    pub async fn return_loan(&self, id: Uuid) -> AppResult<ReturnOutcome> {
        let returned = sqlx::query_as::<_, Loan>(
            r#"
            UPDATE loans SET returned_at = NOW()
            WHERE id = $1 AND returned_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(loan) = returned {
            return Ok(ReturnOutcome::Returned { loan });
        }

        // Zero rows matched: either already returned or missing.
        let loan = self.get_by_id(id).await?;
        Ok(ReturnOutcome::AlreadyReturned { loan })
    }

    /// List all loans
    pub async fn list(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>("SELECT * FROM loans ORDER BY issued_at DESC")
            .fetch_all(&self.pool)
            .await?;
        Ok(loans)
    }

    /// Open loans (active or overdue)
    pub async fn list_open(&self) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE returned_at IS NULL ORDER BY due_at",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Overdue loans, computed at read time against the given instant.
    pub async fn list_overdue(&self, now: DateTime<Utc>) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE returned_at IS NULL AND due_at < $1 ORDER BY due_at",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    pub async fn list_for_book(&self, book_id: Uuid) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE book_id = $1 ORDER BY issued_at DESC",
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    pub async fn list_for_borrower(&self, borrower_id: Uuid) -> AppResult<Vec<Loan>> {
        let loans = sqlx::query_as::<_, Loan>(
            "SELECT * FROM loans WHERE borrower_id = $1 ORDER BY issued_at DESC",
        )
        .bind(borrower_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(loans)
    }

    /// Administrative hard delete. Not part of the loan lifecycle.
    pub async fn delete(&self, id: Uuid) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM loans WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Loan with id {} not found", id)));
        }
        Ok(())
    }
}
