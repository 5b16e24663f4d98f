//! Staff member model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use super::enums::{AuthMethod, StaffStatus};

/// Full staff record. Shares the account shape with [`super::user::User`]
/// but carries employment fields instead of membership ones.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Staff {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: String,
    pub department: Option<String>,
    pub hire_date: Option<NaiveDate>,

    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub external_id: Option<String>,
    pub auth_method: AuthMethod,

    pub is_admin: bool,
    pub status: StaffStatus,

    /// Employee code, generated once at creation, immutable.
    pub employee_code: String,

    #[serde(skip_serializing)]
    pub password_reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub password_reset_expires: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub password_changed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fully-resolved insert payload built by the staff service.
#[derive(Debug)]
pub struct NewStaff {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub position: String,
    pub department: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub password_hash: Option<String>,
    pub auth_method: AuthMethod,
    pub is_admin: bool,
    pub employee_code: String,
}

/// Create staff request (admin only)
#[derive(Debug, Deserialize, Validate)]
pub struct CreateStaff {
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: String,
    /// Optional: staff created without a password authenticate via the
    /// OAuth provider once linked.
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
    pub phone: Option<String>,
    #[validate(length(min = 1, message = "Position is required"))]
    pub position: String,
    pub department: Option<String>,
    pub hire_date: Option<NaiveDate>,
    pub is_admin: Option<bool>,
}

/// Update staff request (own record or admin)
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateStaff {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    /// Admin only
    pub status: Option<StaffStatus>,
    /// Admin only
    pub is_admin: Option<bool>,
    /// Present only to reject it: the code is immutable after creation.
    pub employee_code: Option<String>,
}
