//! Lending endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::loan::{IssueLoan, LoanDetails, ReturnOutcome},
    AppState,
};

use super::AuthPrincipal;

/// Issue a loan (staff only)
pub async fn create_loan(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(request): Json<IssueLoan>,
) -> AppResult<(StatusCode, Json<LoanDetails>)> {
    let loan = state.services.loans.issue(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// Return a loan (staff only). Idempotent: returning twice reports the
/// no-op with a 200 instead of failing.
pub async fn return_loan(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ReturnOutcome>> {
    let outcome = state.services.loans.return_loan(&principal, id).await?;
    Ok(Json(outcome))
}

/// All loans, with computed status (staff only)
pub async fn list_loans(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list(&principal).await?;
    Ok(Json(loans))
}

/// Open loans only, active or overdue (staff only)
pub async fn list_active_loans(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_open(&principal).await?;
    Ok(Json(loans))
}

/// Overdue loans, computed at read time (staff only)
pub async fn list_overdue_loans(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_overdue(&principal).await?;
    Ok(Json(loans))
}

/// A single loan (owner or staff)
pub async fn get_loan(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanDetails>> {
    let loan = state.services.loans.get(&principal, id).await?;
    Ok(Json(loan))
}

/// A book's lending history (staff only)
pub async fn get_book_loans(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(book_id): Path<Uuid>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_for_book(&principal, book_id).await?;
    Ok(Json(loans))
}

/// A member's loan history (owner or staff)
pub async fn get_user_loans(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Vec<LoanDetails>>> {
    let loans = state.services.loans.list_for_borrower(&principal, id).await?;
    Ok(Json(loans))
}

/// Administrative hard delete of a lending record (admin only)
pub async fn delete_loan(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.loans.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
