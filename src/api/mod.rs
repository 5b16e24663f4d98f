//! API handlers for OpenShelf REST endpoints

pub mod auth;
pub mod health;
pub mod loans;
pub mod staff;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use axum_extra::extract::CookieJar;

use crate::{error::AppError, models::principal::Principal, AppState};

/// Extractor resolving the calling principal from either credential: a
/// Bearer token takes precedence, then the session cookie. Every failure
/// collapses to the same generic 401 at the boundary.
pub struct AuthPrincipal(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthPrincipal {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(auth_header) = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        {
            let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
                AppError::Authentication("malformed authorization header".to_string())
            })?;
            let principal = state.services.auth.resolve_bearer(token).await?;
            return Ok(AuthPrincipal(principal));
        }

        // No Authorization header; fall back to the session cookie.
        let jar = CookieJar::from_headers(&parts.headers);
        let session_id = jar
            .get(&state.config.auth.session_cookie_name)
            .map(|c| c.value().to_string())
            .ok_or_else(|| AppError::Authentication("no credential presented".to_string()))?;

        let principal = state.services.auth.resolve_session(&session_id).await?;
        Ok(AuthPrincipal(principal))
    }
}
