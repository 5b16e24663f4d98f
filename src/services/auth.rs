//! Authentication service: registration, login, credential resolution,
//! password lifecycle and external-identity linking
//!
//! Resolution failures are typed internally (no credential, invalid or
//! expired token, account gone, stale password) but all collapse to one
//! generic 401 at the boundary so callers cannot enumerate accounts.

use chrono::{Datelike, Duration, Months, Utc};
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::{
        enums::AuthMethod,
        principal::{Claims, Principal, PrincipalKind, SessionSnapshot},
        user::{NewUser, RegisterRequest, User},
    },
    repository::Repository,
    services::{credentials, email::EmailService, oauth::OAuthProfile, sessions::SessionService},
};

/// Attempts at drawing a fresh human code before giving up. The counter is
/// atomic, so a collision only happens when a migrated record already holds
/// the drawn code.
const CODE_RETRIES: u32 = 3;

/// Successful login or OAuth callback
pub struct AuthSuccess {
    pub principal: Principal,
    pub token: String,
    pub session_id: String,
}

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
    sessions: SessionService,
    email: EmailService,
}

impl AuthService {
    pub fn new(
        repository: Repository,
        config: AuthConfig,
        sessions: SessionService,
        email: EmailService,
    ) -> Self {
        Self {
            repository,
            config,
            sessions,
            email,
        }
    }

    /// Register a new library member with local credentials.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<(User, String)> {
        if self.repository.users.email_exists(&request.email, None).await? {
            return Err(AppError::email_exists());
        }

        let password_hash = credentials::hash_password(request.password).await?;
        let verification_token = credentials::generate_token();

        let now = Utc::now();
        let tier = request.membership_tier.unwrap_or(crate::models::enums::MembershipTier::Regular);

        let mut new_user = NewUser {
            first_name: request.first_name,
            last_name: request.last_name,
            email: request.email,
            phone: request.phone,
            password_hash: Some(password_hash),
            external_id: None,
            auth_method: AuthMethod::Local,
            membership_tier: tier,
            library_card: String::new(),
            membership_start: now,
            membership_end: now + Months::new(12),
            borrowing_limit: tier.default_borrowing_limit(),
            verification_token: Some(credentials::hash_token(&verification_token)),
        };

        let user = self.create_with_fresh_card(&mut new_user).await?;

        if let Err(e) = self
            .email
            .send_verification(&user.email, &verification_token)
            .await
        {
            tracing::warn!("failed to send verification email to {}: {}", user.email, e);
        }

        let token = self.issue_token(user.id, PrincipalKind::User)?;
        Ok((user, token))
    }

    /// Insert with a freshly drawn library card, retrying a bounded number
    /// of times if the card collides with a pre-existing record. Exhausting
    /// the retries is a hard failure, never a duplicate or timestamp code.
    async fn create_with_fresh_card(&self, new_user: &mut NewUser) -> AppResult<User> {
        let year = Utc::now().year();
        let mut last_err = None;

        for _ in 0..CODE_RETRIES {
            new_user.library_card = self.repository.sequences.next_library_card(year).await?;
            match self.repository.users.create(new_user).await {
                Ok(user) => return Ok(user),
                Err(AppError::CodeGeneration(msg)) => {
                    tracing::warn!("library card collision, retrying: {}", msg);
                    last_err = Some(AppError::CodeGeneration(msg));
                }
                Err(other) => return Err(other),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            AppError::CodeGeneration("library card generation exhausted retries".to_string())
        }))
    }

    /// Authenticate with email and password. The same email may exist in
    /// both collections; whichever credential actually verifies decides the
    /// outcome, members tried first, never the recorded `auth_method`.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<AuthSuccess> {
        if let Some(user) = self.repository.users.find_by_email(email).await? {
            if self
                .password_matches(password, user.password_hash.as_deref())
                .await?
            {
                if !user.status.is_active() {
                    return Err(AppError::AccountInactive(user.status.to_string()));
                }
                self.repository.users.set_last_login(user.id).await?;
                return self.establish(Principal::from(&user)).await;
            }
        }

        if let Some(staff) = self.repository.staff.find_by_email(email).await? {
            if self
                .password_matches(password, staff.password_hash.as_deref())
                .await?
            {
                if !staff.status.is_active() {
                    return Err(AppError::AccountInactive(staff.status.to_string()));
                }
                return self.establish(Principal::from(&staff)).await;
            }
        }

        Err(AppError::InvalidCredentials)
    }

    /// Verify a password against an optional stored hash. A missing hash
    /// (OAuth-only account) behaves like a wrong password.
    async fn password_matches(&self, password: &str, hash: Option<&str>) -> AppResult<bool> {
        match hash {
            Some(hash) => credentials::verify_password(password.to_string(), hash.to_string()).await,
            None => Ok(false),
        }
    }

    async fn check_password(&self, password: &str, hash: Option<&str>) -> AppResult<()> {
        if self.password_matches(password, hash).await? {
            Ok(())
        } else {
            Err(AppError::InvalidCredentials)
        }
    }

    /// Issue a bearer token plus a server session for a principal.
    async fn establish(&self, principal: Principal) -> AppResult<AuthSuccess> {
        let token = self.issue_token(principal.id, principal.kind)?;
        let session_id = self
            .sessions
            .create(SessionSnapshot {
                account_id: principal.id,
                kind: principal.kind,
                email: principal.email.clone(),
                display_name: principal.display_name.clone(),
                is_admin: principal.is_admin,
                issued_at: Utc::now(),
            })
            .await?;

        Ok(AuthSuccess {
            principal,
            token,
            session_id,
        })
    }

    fn issue_token(&self, account_id: Uuid, kind: PrincipalKind) -> AppResult<String> {
        Claims::new(account_id, kind, Utc::now(), self.config.token_expiry_days)
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Resolve a bearer token to a principal. Rejects tokens issued before
    /// the account's last password change.
    pub async fn resolve_bearer(&self, token: &str) -> AppResult<Principal> {
        let claims = Claims::from_token(token, &self.config.jwt_secret)
            .map_err(|e| AppError::Authentication(format!("invalid or expired token: {}", e)))?;

        match claims.kind {
            PrincipalKind::User => {
                let user = self
                    .repository
                    .users
                    .find_by_id(claims.sub)
                    .await?
                    .ok_or_else(|| {
                        AppError::Authentication("token account no longer exists".to_string())
                    })?;
                if claims.issued_before(user.password_changed_at) {
                    return Err(AppError::Authentication(
                        "token issued before password change".to_string(),
                    ));
                }
                Ok(Principal::from(&user))
            }
            PrincipalKind::Staff => {
                let staff = self
                    .repository
                    .staff
                    .find_by_id(claims.sub)
                    .await?
                    .ok_or_else(|| {
                        AppError::Authentication("token account no longer exists".to_string())
                    })?;
                if claims.issued_before(staff.password_changed_at) {
                    return Err(AppError::Authentication(
                        "token issued before password change".to_string(),
                    ));
                }
                Ok(Principal::from(&staff))
            }
        }
    }

    /// Resolve a session cookie to a principal. The account is reloaded so
    /// role and status changes apply immediately, and the same
    /// stale-password check as for bearer tokens applies to the session's
    /// issue instant.
    pub async fn resolve_session(&self, session_id: &str) -> AppResult<Principal> {
        let snapshot = self
            .sessions
            .resolve(session_id)
            .await?
            .ok_or_else(|| AppError::Authentication("unknown or expired session".to_string()))?;

        match snapshot.kind {
            PrincipalKind::User => {
                let user = self
                    .repository
                    .users
                    .find_by_id(snapshot.account_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Authentication("session account no longer exists".to_string())
                    })?;
                if let Some(changed) = user.password_changed_at {
                    if snapshot.issued_at < changed {
                        return Err(AppError::Authentication(
                            "session predates password change".to_string(),
                        ));
                    }
                }
                Ok(Principal::from(&user))
            }
            PrincipalKind::Staff => {
                let staff = self
                    .repository
                    .staff
                    .find_by_id(snapshot.account_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Authentication("session account no longer exists".to_string())
                    })?;
                if let Some(changed) = staff.password_changed_at {
                    if snapshot.issued_at < changed {
                        return Err(AppError::Authentication(
                            "session predates password change".to_string(),
                        ));
                    }
                }
                Ok(Principal::from(&staff))
            }
        }
    }

    pub async fn logout(&self, session_id: &str) -> AppResult<()> {
        self.sessions.destroy(session_id).await
    }

    /// Change the password of a logged-in principal. Bumping
    /// `password_changed_at` invalidates every outstanding token and
    /// session.
    pub async fn change_password(
        &self,
        principal: &Principal,
        current: &str,
        new_password: &str,
    ) -> AppResult<()> {
        let current_hash = match principal.kind {
            PrincipalKind::User => {
                self.repository
                    .users
                    .get_by_id(principal.id)
                    .await?
                    .password_hash
            }
            PrincipalKind::Staff => {
                self.repository
                    .staff
                    .get_by_id(principal.id)
                    .await?
                    .password_hash
            }
        };

        self.check_password(current, current_hash.as_deref()).await?;

        let new_hash = credentials::hash_password(new_password.to_string()).await?;
        match principal.kind {
            PrincipalKind::User => self.repository.users.set_password(principal.id, &new_hash).await,
            PrincipalKind::Staff => self.repository.staff.set_password(principal.id, &new_hash).await,
        }
    }

    /// Start the password-reset flow. Always succeeds from the caller's
    /// perspective; whether the email exists is never disclosed.
    pub async fn forgot_password(&self, email: &str) -> AppResult<()> {
        let token = credentials::generate_token();
        let digest = credentials::hash_token(&token);
        let expires = Utc::now() + Duration::minutes(self.config.reset_token_expiry_minutes);

        // Only accounts that actually hold a password get a reset token;
        // OAuth-only accounts are silently skipped for the same reason.
        if let Some(user) = self.repository.users.find_by_email(email).await? {
            if user.password_hash.is_some() {
                self.repository
                    .users
                    .set_reset_token(user.id, &digest, expires)
                    .await?;
                if let Err(e) = self.email.send_password_reset(&user.email, &token).await {
                    tracing::warn!("failed to send reset email to {}: {}", user.email, e);
                }
            }
            return Ok(());
        }

        if let Some(staff) = self.repository.staff.find_by_email(email).await? {
            if staff.password_hash.is_some() {
                self.repository
                    .staff
                    .set_reset_token(staff.id, &digest, expires)
                    .await?;
                if let Err(e) = self.email.send_password_reset(&staff.email, &token).await {
                    tracing::warn!("failed to send reset email to {}: {}", staff.email, e);
                }
            }
        }

        Ok(())
    }

    /// Redeem a reset token. The token is matched by digest within its
    /// expiry window and consumed on success.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        let digest = credentials::hash_token(token);
        let now = Utc::now();

        if let Some(user) = self.repository.users.find_by_reset_digest(&digest, now).await? {
            let hash = credentials::hash_password(new_password.to_string()).await?;
            return self.repository.users.set_password(user.id, &hash).await;
        }

        if let Some(staff) = self.repository.staff.find_by_reset_digest(&digest, now).await? {
            let hash = credentials::hash_password(new_password.to_string()).await?;
            return self.repository.staff.set_password(staff.id, &hash).await;
        }

        Err(AppError::Validation(
            "Invalid or expired password reset token".to_string(),
        ))
    }

    /// Redeem an email-verification token.
    pub async fn verify_email(&self, token: &str) -> AppResult<()> {
        let digest = credentials::hash_token(token);
        let user = self
            .repository
            .users
            .find_by_verification_digest(&digest)
            .await?
            .ok_or_else(|| {
                AppError::Validation("Invalid or expired verification token".to_string())
            })?;

        self.repository.users.mark_email_verified(user.id).await
    }

    /// Complete an OAuth callback: resolve the external identity to an
    /// existing account (staff first, then users) or create a member
    /// account on first sight.
    pub async fn oauth_login(&self, profile: &OAuthProfile) -> AppResult<AuthSuccess> {
        if let Some(staff) = self
            .repository
            .staff
            .find_by_external_id(&profile.external_id)
            .await?
        {
            if !staff.status.is_active() {
                return Err(AppError::AccountInactive(staff.status.to_string()));
            }
            return self.establish(Principal::from(&staff)).await;
        }

        if let Some(user) = self
            .repository
            .users
            .find_by_external_id(&profile.external_id)
            .await?
        {
            if !user.status.is_active() {
                return Err(AppError::AccountInactive(user.status.to_string()));
            }
            self.repository.users.set_last_login(user.id).await?;
            return self.establish(Principal::from(&user)).await;
        }

        let user = self.create_from_profile(profile).await?;
        self.establish(Principal::from(&user)).await
    }

    /// First OAuth sign-in: create an external-only member account. Such
    /// accounts hold no password hash until one is set through reset.
    async fn create_from_profile(&self, profile: &OAuthProfile) -> AppResult<User> {
        let (first_name, last_name) = split_display_name(&profile.display_name);
        let email = profile.email.clone().unwrap_or_else(|| {
            // Provider may withhold the email; synthesize a unique
            // placeholder so the column constraints hold.
            format!("{}@users.noreply.openshelf.org", profile.external_id)
        });

        let now = Utc::now();
        let tier = crate::models::enums::MembershipTier::Regular;
        let mut new_user = NewUser {
            first_name,
            last_name,
            email,
            phone: None,
            password_hash: None,
            external_id: Some(profile.external_id.clone()),
            auth_method: AuthMethod::External,
            membership_tier: tier,
            library_card: String::new(),
            membership_start: now,
            membership_end: now + Months::new(12),
            borrowing_limit: tier.default_borrowing_limit(),
            verification_token: None,
        };

        self.create_with_fresh_card(&mut new_user).await
    }

    /// Link an external identity to the logged-in account. At most one
    /// account may claim a given external id across both collections.
    pub async fn link_external(&self, principal: &Principal, external_id: &str) -> AppResult<()> {
        let user_claim = self.repository.users.find_by_external_id(external_id).await?;
        if user_claim.is_some_and(|u| u.id != principal.id) {
            return Err(AppError::external_id_linked());
        }
        let staff_claim = self.repository.staff.find_by_external_id(external_id).await?;
        if staff_claim.is_some_and(|s| s.id != principal.id) {
            return Err(AppError::external_id_linked());
        }

        match principal.kind {
            PrincipalKind::User => {
                self.repository
                    .users
                    .link_external_id(principal.id, external_id)
                    .await
            }
            PrincipalKind::Staff => {
                self.repository
                    .staff
                    .link_external_id(principal.id, external_id)
                    .await
            }
        }
    }
}

/// Best-effort split of a provider display name into first/last.
fn split_display_name(name: &str) -> (String, String) {
    match name.split_once(' ') {
        Some((first, rest)) => (first.to_string(), rest.to_string()),
        None => (name.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::split_display_name;

    #[test]
    fn display_name_splits_on_first_space() {
        assert_eq!(
            split_display_name("Ada Lovelace"),
            ("Ada".to_string(), "Lovelace".to_string())
        );
        assert_eq!(
            split_display_name("Jean-Luc de la Tour"),
            ("Jean-Luc".to_string(), "de la Tour".to_string())
        );
        assert_eq!(
            split_display_name("octocat"),
            ("octocat".to_string(), String::new())
        );
    }
}
