//! Library member model and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::enums::{AuthMethod, MembershipTier, UserStatus};

/// Full library member record.
///
/// Emails are matched exactly (case-sensitive); this is a documented
/// limitation carried over from the original system. Secret fields never
/// serialize into responses.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,

    /// Argon2 hash; absent for accounts created purely via OAuth.
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    /// Stable identity from the OAuth provider; unique when present.
    pub external_id: Option<String>,
    pub auth_method: AuthMethod,

    pub membership_tier: MembershipTier,
    pub is_admin: bool,
    pub status: UserStatus,

    /// Library card number, generated once at creation, immutable.
    pub library_card: String,
    pub membership_start: DateTime<Utc>,
    pub membership_end: DateTime<Utc>,
    pub borrowing_limit: i32,

    pub email_verified: bool,
    #[serde(skip_serializing)]
    pub verification_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    /// Bearer tokens issued before this instant are rejected.
    #[serde(skip_serializing)]
    pub password_changed_at: Option<DateTime<Utc>>,

    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// An account can authenticate iff at least one credential is present.
    /// Both may coexist after linking; neither is a valid (if unreachable)
    /// state for migrated records.
    pub fn can_authenticate(&self) -> bool {
        self.password_hash.is_some() || self.external_id.is_some()
    }
}

/// Fully-resolved insert payload, built by the auth service once the
/// library card and credentials have been derived.
#[derive(Debug)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub password_hash: Option<String>,
    pub external_id: Option<String>,
    pub auth_method: AuthMethod,
    pub membership_tier: MembershipTier,
    pub library_card: String,
    pub membership_start: DateTime<Utc>,
    pub membership_end: DateTime<Utc>,
    pub borrowing_limit: i32,
    /// SHA-256 digest of the emailed verification token.
    pub verification_token: Option<String>,
}

/// Registration request (local credentials)
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    pub phone: Option<String>,
    pub membership_tier: Option<MembershipTier>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    pub password: String,
}

/// Update user request (own record or admin)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUser {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Admin only
    pub membership_tier: Option<MembershipTier>,
    /// Admin only
    pub status: Option<UserStatus>,
    /// Admin only
    pub borrowing_limit: Option<i32>,
    /// Present only to reject it: the card is immutable after creation.
    pub library_card: Option<String>,
}

/// Change own password request
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePassword {
    pub current_password: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Forgot-password request
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPassword {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
}

/// Reset-password request (token travels in the path)
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPassword {
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Deserialize)]
pub struct DeleteParams {
    pub force: Option<bool>,
}
