//! Service layer: business logic on top of the repositories

pub mod auth;
pub mod authz;
pub mod credentials;
pub mod email;
pub mod loans;
pub mod oauth;
pub mod sessions;
pub mod staff;
pub mod users;

use std::sync::Arc;

use crate::{config::AppConfig, repository::Repository};

/// Container for all services, constructed once at startup and shared
/// through the application state.
#[derive(Clone)]
pub struct Services {
    pub auth: auth::AuthService,
    pub users: users::UsersService,
    pub staff: staff::StaffService,
    pub loans: loans::LoansService,
    pub sessions: sessions::SessionService,
    pub oauth: oauth::OAuthService,
    /// Kept for infrastructure probes (readiness check).
    pub repository: Repository,
}

impl Services {
    pub fn new(
        config: &AppConfig,
        repository: Repository,
        session_store: Arc<dyn sessions::SessionStore>,
    ) -> Self {
        let email_service = email::EmailService::new(config.email.clone());
        let session_service =
            sessions::SessionService::new(session_store, config.auth.session_ttl_days);

        Self {
            auth: auth::AuthService::new(
                repository.clone(),
                config.auth.clone(),
                session_service.clone(),
                email_service.clone(),
            ),
            users: users::UsersService::new(repository.clone(), email_service),
            staff: staff::StaffService::new(repository.clone()),
            loans: loans::LoansService::new(repository.clone(), config.loans.clone()),
            sessions: session_service,
            oauth: oauth::OAuthService::new(config.oauth.clone()),
            repository,
        }
    }
}
