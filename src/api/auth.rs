//! Authentication endpoints: registration, login/logout, password
//! lifecycle, email verification and the GitHub OAuth flow

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Redirect,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        principal::Principal,
        user::{
            ChangePassword, ForgotPassword, LoginRequest, RegisterRequest, ResetPassword, User,
        },
    },
    services::authz::{authorize, Action},
    AppState,
};

use super::AuthPrincipal;

#[derive(Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub data: Principal,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub token: String,
    pub data: User,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

fn message(msg: &str) -> Json<MessageResponse> {
    Json(MessageResponse {
        success: true,
        message: msg.to_string(),
    })
}

fn validated<T: Validate>(value: T) -> AppResult<T> {
    value
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;
    Ok(value)
}

/// The session cookie carries no expiry of its own; the server-side TTL in
/// the session store is authoritative.
fn session_cookie(state: &AppState, session_id: String) -> Cookie<'static> {
    Cookie::build((state.config.auth.session_cookie_name.clone(), session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn clear_session_cookie(state: &AppState) -> Cookie<'static> {
    Cookie::build((state.config.auth.session_cookie_name.clone(), ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Register a new library member
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let request = validated(request)?;
    let (user, token) = state.services.auth.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            token,
            data: user,
        }),
    ))
}

/// Log in with email and password; issues a bearer token and a session cookie
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let request = validated(request)?;
    let success = state
        .services
        .auth
        .login(&request.email, &request.password)
        .await?;

    let jar = jar.add(session_cookie(&state, success.session_id));
    Ok((
        jar,
        Json(AuthResponse {
            success: true,
            token: success.token,
            data: success.principal,
        }),
    ))
}

/// Current principal, from whichever credential authenticated the request
pub async fn me(AuthPrincipal(principal): AuthPrincipal) -> Json<Principal> {
    Json(principal)
}

/// Destroy the server-side session and clear the cookie
pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<MessageResponse>)> {
    if let Some(cookie) = jar.get(&state.config.auth.session_cookie_name) {
        state.services.auth.logout(cookie.value()).await?;
    }
    let jar = jar.remove(clear_session_cookie(&state));
    Ok((jar, message("Logged out")))
}

/// Change the password of the logged-in principal. All previously issued
/// tokens and sessions stop working.
pub async fn change_password(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(request): Json<ChangePassword>,
) -> AppResult<Json<MessageResponse>> {
    let request = validated(request)?;
    state
        .services
        .auth
        .change_password(&principal, &request.current_password, &request.new_password)
        .await?;
    Ok(message("Password changed; please log in again"))
}

/// Start the password-reset flow. The answer never discloses whether the
/// email exists.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPassword>,
) -> AppResult<Json<MessageResponse>> {
    let request = validated(request)?;
    state.services.auth.forgot_password(&request.email).await?;
    Ok(message(
        "If an account exists for this address, a reset link has been sent",
    ))
}

/// Redeem a password-reset token
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<ResetPassword>,
) -> AppResult<Json<MessageResponse>> {
    let request = validated(request)?;
    state
        .services
        .auth
        .reset_password(&token, &request.password)
        .await?;
    Ok(message("Password has been reset; please log in"))
}

/// Redeem an email-verification token
pub async fn verify_email(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    state.services.auth.verify_email(&token).await?;
    Ok(message("Email address verified"))
}

/// Start the GitHub OAuth flow: issue a state nonce and redirect to the
/// provider
pub async fn github_start(State(state): State<AppState>) -> AppResult<Redirect> {
    let nonce = state.services.sessions.issue_oauth_state().await?;
    Ok(Redirect::temporary(
        &state.services.oauth.authorize_url(&nonce),
    ))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: String,
    pub state: String,
}

/// OAuth callback: verify the state nonce, exchange the code, resolve or
/// create the account, establish a session and redirect the browser
pub async fn github_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> AppResult<(CookieJar, Redirect)> {
    if !state
        .services
        .sessions
        .consume_oauth_state(&params.state)
        .await?
    {
        return Err(AppError::Authentication(
            "unknown or replayed OAuth state".to_string(),
        ));
    }

    let access_token = state.services.oauth.exchange_code(&params.code).await?;
    let profile = state.services.oauth.fetch_profile(&access_token).await?;
    let success = state.services.auth.oauth_login(&profile).await?;

    tracing::info!(principal_id = %success.principal.id, "OAuth login");

    let jar = jar.add(session_cookie(&state, success.session_id));
    Ok((
        jar,
        Redirect::temporary(state.services.oauth.success_redirect()),
    ))
}

#[derive(Deserialize)]
pub struct LinkRequest {
    /// Authorization code obtained by the client from the provider.
    pub code: String,
}

/// Link a GitHub identity to the logged-in account
pub async fn link_github(
    State(state): State<AppState>,
    AuthPrincipal(principal): AuthPrincipal,
    Json(request): Json<LinkRequest>,
) -> AppResult<Json<MessageResponse>> {
    authorize(&principal, Action::LinkExternalIdentity, None)?;

    let access_token = state.services.oauth.exchange_code(&request.code).await?;
    let profile = state.services.oauth.fetch_profile(&access_token).await?;
    state
        .services
        .auth
        .link_external(&principal, &profile.external_id)
        .await?;

    Ok(message("GitHub account linked"))
}
