//! Library member management
//!
//! Authorization is decided by the pure gate before any data is touched;
//! this service only adds the field-level rules the gate cannot see
//! (immutable card, admin-only fields, email-change re-verification).

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult, Deny},
    models::{
        principal::Principal,
        user::{UpdateUser, User},
    },
    repository::Repository,
    services::{
        authz::{authorize, Action},
        credentials,
        email::EmailService,
    },
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    email: EmailService,
}

impl UsersService {
    pub fn new(repository: Repository, email: EmailService) -> Self {
        Self { repository, email }
    }

    pub async fn list(&self, principal: &Principal) -> AppResult<Vec<User>> {
        authorize(principal, Action::ListUsers, None)?;
        self.repository.users.list().await
    }

    pub async fn get(&self, principal: &Principal, id: Uuid) -> AppResult<User> {
        authorize(principal, Action::ViewUser, Some(id))?;
        self.repository.users.get_by_id(id).await
    }

    /// Update a member record. Owners may edit their contact fields; tier,
    /// status and borrowing limit require an admin; the library card is
    /// immutable for everyone.
    pub async fn update(
        &self,
        principal: &Principal,
        id: Uuid,
        update: UpdateUser,
    ) -> AppResult<User> {
        authorize(principal, Action::UpdateUser, Some(id))?;

        if update.library_card.is_some() {
            return Err(AppError::ImmutableField("library_card"));
        }

        let touches_admin_fields = update.membership_tier.is_some()
            || update.status.is_some()
            || update.borrowing_limit.is_some();
        if touches_admin_fields && !principal.is_admin {
            return Err(AppError::Authorization(Deny::AdminRequired));
        }

        // A changed email drops back to unverified and triggers a fresh
        // verification round.
        let mut new_verification_token = None;
        let mut raw_token = None;
        if let Some(new_email) = &update.email {
            let current = self.repository.users.get_by_id(id).await?;
            if *new_email != current.email {
                if self.repository.users.email_exists(new_email, Some(id)).await? {
                    return Err(AppError::email_exists());
                }
                let token = credentials::generate_token();
                new_verification_token = Some(credentials::hash_token(&token));
                raw_token = Some(token);
            }
        }

        let updated = self
            .repository
            .users
            .update(id, &update, new_verification_token.as_deref())
            .await?;

        if let Some(token) = raw_token {
            if let Err(e) = self.email.send_verification(&updated.email, &token).await {
                tracing::warn!(
                    "failed to send verification email to {}: {}",
                    updated.email,
                    e
                );
            }
        }

        Ok(updated)
    }

    /// Delete a member. Refused while they hold open loans unless the admin
    /// forces it.
    pub async fn delete(&self, principal: &Principal, id: Uuid, force: bool) -> AppResult<()> {
        authorize(principal, Action::DeleteUser, None)?;
        self.repository.users.delete(id, force).await
    }
}
