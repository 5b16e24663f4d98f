//! Staff management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::staff::{CreateStaff, Staff, UpdateStaff},
    AppState,
};

use super::AuthPrincipal;

/// Create a staff account (admin only)
pub async fn create_staff(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(request): Json<CreateStaff>,
) -> AppResult<(StatusCode, Json<Staff>)> {
    request
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let staff = state.services.staff.create(&principal, request).await?;
    Ok((StatusCode::CREATED, Json(staff)))
}

/// List staff (staff only)
pub async fn list_staff(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> AppResult<Json<Vec<Staff>>> {
    let staff = state.services.staff.list(&principal).await?;
    Ok(Json(staff))
}

/// Get a staff member by id (staff only)
pub async fn get_staff(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Staff>> {
    let staff = state.services.staff.get(&principal, id).await?;
    Ok(Json(staff))
}

/// Update a staff member (own record or admin; some fields admin-only)
pub async fn update_staff(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateStaff>,
) -> AppResult<Json<Staff>> {
    update
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let staff = state.services.staff.update(&principal, id, update).await?;
    Ok(Json(staff))
}

/// Delete a staff account (admin only, never one's own)
pub async fn delete_staff(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    state.services.staff.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
