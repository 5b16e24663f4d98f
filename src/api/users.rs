//! Library member endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::user::{DeleteParams, UpdateUser, User},
    AppState,
};

use super::AuthPrincipal;

/// List all members (staff only)
pub async fn list_users(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
) -> AppResult<Json<Vec<User>>> {
    let users = state.services.users.list(&principal).await?;
    Ok(Json(users))
}

/// Get a member by id (owner or staff)
pub async fn get_user(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
) -> AppResult<Json<User>> {
    let user = state.services.users.get(&principal, id).await?;
    Ok(Json(user))
}

/// Update a member (owner or admin; some fields admin-only)
pub async fn update_user(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    Json(update): Json<UpdateUser>,
) -> AppResult<Json<User>> {
    update
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    let user = state.services.users.update(&principal, id, update).await?;
    Ok(Json(user))
}

/// Delete a member (admin only; refused while loans are open unless forced)
pub async fn delete_user(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Path(id): Path<Uuid>,
    Query(params): Query<DeleteParams>,
) -> AppResult<StatusCode> {
    state
        .services
        .users
        .delete(&principal, id, params.force.unwrap_or(false))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
