//! OAuth provider client (GitHub authorization-code flow)
//!
//! The core only consumes a stable external id plus a few profile
//! attributes; everything provider-specific stays in this module.

use serde::Deserialize;

use crate::{
    config::OAuthConfig,
    error::{AppError, AppResult},
};

/// The profile attributes the rest of the system consumes
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub external_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub profile_url: Option<String>,
    pub email: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct GitHubUser {
    id: i64,
    login: String,
    name: Option<String>,
    avatar_url: Option<String>,
    html_url: Option<String>,
    email: Option<String>,
}

#[derive(Clone)]
pub struct OAuthService {
    config: OAuthConfig,
    client: reqwest::Client,
}

impl OAuthService {
    pub fn new(config: OAuthConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// URL the browser is redirected to when the flow starts. The state
    /// nonce binds the eventual callback to this initiation.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&state={}&scope=read:user%20user:email",
            self.config.authorize_endpoint, self.config.client_id, self.config.callback_url, state
        )
    }

    /// Exchange the callback code for an access token.
    pub async fn exchange_code(&self, code: &str) -> AppResult<String> {
        let response = self
            .client
            .post(&self.config.token_endpoint)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.callback_url.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AppError::TransientStore(format!("OAuth token exchange failed: {}", e)))?;

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Malformed OAuth token response: {}", e)))?;

        token.access_token.ok_or_else(|| {
            AppError::Authentication(format!(
                "OAuth provider rejected the code: {}",
                token.error_description.unwrap_or_default()
            ))
        })
    }

    /// Fetch the provider profile for an access token.
    pub async fn fetch_profile(&self, access_token: &str) -> AppResult<OAuthProfile> {
        let response = self
            .client
            .get(&self.config.profile_endpoint)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("User-Agent", "openshelf-server")
            .send()
            .await
            .map_err(|e| AppError::TransientStore(format!("OAuth profile fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Authentication(format!(
                "OAuth profile fetch returned {}",
                response.status()
            )));
        }

        let user: GitHubUser = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Malformed OAuth profile: {}", e)))?;

        Ok(OAuthProfile {
            external_id: user.id.to_string(),
            display_name: user.name.unwrap_or_else(|| user.login.clone()),
            avatar_url: user.avatar_url,
            profile_url: user.html_url,
            email: user.email,
        })
    }

    pub fn success_redirect(&self) -> &str {
        &self.config.success_redirect
    }
}
