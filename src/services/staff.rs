//! Staff account management
//!
//! Staff are created by admins, never self-registered. The employee code is
//! drawn from the same atomic sequence machinery as library cards.

use chrono::{Datelike, Utc};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        enums::AuthMethod,
        principal::Principal,
        staff::{CreateStaff, NewStaff, Staff, UpdateStaff},
    },
    repository::Repository,
    services::{
        authz::{authorize, Action},
        credentials,
    },
};

const CODE_RETRIES: u32 = 3;

#[derive(Clone)]
pub struct StaffService {
    repository: Repository,
}

impl StaffService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Create a staff account. The password is optional: staff without one
    /// authenticate through the OAuth provider once linked.
    pub async fn create(&self, principal: &Principal, request: CreateStaff) -> AppResult<Staff> {
        authorize(principal, Action::CreateStaff, None)?;

        if self.repository.staff.email_exists(&request.email, None).await? {
            return Err(AppError::email_exists());
        }

        let password_hash = match request.password {
            Some(password) => Some(credentials::hash_password(password).await?),
            None => None,
        };
        let auth_method = if password_hash.is_some() {
            AuthMethod::Local
        } else {
            AuthMethod::External
        };

        let mut new_staff = NewStaff {
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone: request.phone,
            position: request.position,
            department: request.department,
            hire_date: request.hire_date,
            password_hash,
            auth_method,
            is_admin: request.is_admin.unwrap_or(false),
            employee_code: String::new(),
        };

        self.create_with_fresh_code(&mut new_staff).await
    }

    /// Insert with a freshly drawn employee code, retrying a bounded number
    /// of times if the code collides with a migrated record.
    async fn create_with_fresh_code(&self, new_staff: &mut NewStaff) -> AppResult<Staff> {
        let year = Utc::now().year();
        let mut last_err = None;

        for _ in 0..CODE_RETRIES {
            new_staff.employee_code = self.repository.sequences.next_employee_code(year).await?;
            match self.repository.staff.create(new_staff).await {
                Ok(staff) => return Ok(staff),
                Err(AppError::CodeGeneration(msg)) => {
                    tracing::warn!("employee code collision, retrying: {}", msg);
                    last_err = Some(AppError::CodeGeneration(msg));
                }
                Err(other) => return Err(other),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            AppError::CodeGeneration("employee code generation exhausted retries".to_string())
        }))
    }

    pub async fn list(&self, principal: &Principal) -> AppResult<Vec<Staff>> {
        authorize(principal, Action::ListStaff, None)?;
        self.repository.staff.list().await
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> AppResult<Staff> {
        authorize(principal, Action::ViewStaff, Some(id))?;
        self.repository.staff.get_by_id(id).await
    }

    /// Update a staff record. Status and the admin flag require an admin;
    /// the employee code is immutable for everyone.
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        update: UpdateStaff,
    ) -> AppResult<Staff> {
        authorize(principal, Action::UpdateStaff, Some(id))?;

        if update.employee_code.is_some() {
            return Err(AppError::ImmutableField("employee_code"));
        }

        if (update.status.is_some() || update.is_admin.is_some()) && !principal.is_admin {
            return Err(AppError::Authorization(crate::error::Deny::AdminRequired));
        }

        if let Some(new_email) = &update.email {
            if self.repository.staff.email_exists(new_email, Some(id)).await? {
                return Err(AppError::email_exists());
            }
        }

        self.repository.staff.update(id, &update).await
    }

    /// Delete a staff account. Admins cannot delete themselves; demote
    /// first, then have another admin remove the account.
    pub async fn delete(&self, principal: &Principal, id: Uuid) -> AppResult<()> {
        authorize(principal, Action::DeleteStaff, None)?;

        if principal.id == id {
            return Err(AppError::Conflict(
                "SELF_DELETION",
                "You cannot delete your own account".to_string(),
            ));
        }

        self.repository.staff.delete(id).await
    }
}
