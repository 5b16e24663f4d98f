//! Resolved principal, bearer-token claims and session snapshots

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::staff::Staff;
use super::user::User;

/// Which account collection a principal lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    User,
    Staff,
}

/// The authenticated identity resolved for a request.
///
/// Carries just enough for the authorization gate to be pure: the gate never
/// touches the database.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub id: Uuid,
    pub kind: PrincipalKind,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
    pub active: bool,
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Principal {
            id: user.id,
            kind: PrincipalKind::User,
            email: user.email.clone(),
            display_name: format!("{} {}", user.first_name, user.last_name),
            is_admin: user.is_admin,
            active: user.status.is_active(),
        }
    }
}

impl From<&Staff> for Principal {
    fn from(staff: &Staff) -> Self {
        Principal {
            id: staff.id,
            kind: PrincipalKind::Staff,
            email: staff.email.clone(),
            display_name: format!("{} {}", staff.first_name, staff.last_name),
            is_admin: staff.is_admin,
            active: staff.status.is_active(),
        }
    }
}

/// JWT claims for bearer tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id
    pub sub: Uuid,
    pub kind: PrincipalKind,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(sub: Uuid, kind: PrincipalKind, now: DateTime<Utc>, expiry_days: i64) -> Self {
        let iat = now.timestamp();
        Self {
            sub,
            kind,
            iat,
            exp: iat + expiry_days * 86_400,
        }
    }

    /// Create a signed token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Verify signature and expiry, returning the claims
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    /// True when the token predates the account's last password change.
    /// Such tokens are invalid: changing the password revokes everything
    /// issued before it, without a revocation list.
    pub fn issued_before(&self, password_changed_at: Option<DateTime<Utc>>) -> bool {
        match password_changed_at {
            Some(changed) => self.iat < changed.timestamp(),
            None => false,
        }
    }
}

/// Lightweight principal snapshot held server-side for a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub account_id: Uuid,
    pub kind: PrincipalKind,
    pub email: String,
    pub display_name: String,
    pub is_admin: bool,
    /// Issue instant; the stale-password check applies to sessions too.
    pub issued_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trips() {
        let claims = Claims::new(Uuid::new_v4(), PrincipalKind::User, Utc::now(), 30);
        let token = claims.create_token(SECRET).unwrap();
        let decoded = Claims::from_token(&token, SECRET).unwrap();
        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.kind, claims.kind);
        assert_eq!(decoded.iat, claims.iat);
    }

    #[test]
    fn token_rejected_with_wrong_secret() {
        let claims = Claims::new(Uuid::new_v4(), PrincipalKind::Staff, Utc::now(), 30);
        let token = claims.create_token(SECRET).unwrap();
        assert!(Claims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        // Issued 31 days ago with a 30-day expiry.
        let issued = Utc::now() - Duration::days(31);
        let claims = Claims::new(Uuid::new_v4(), PrincipalKind::User, issued, 30);
        let token = claims.create_token(SECRET).unwrap();
        assert!(Claims::from_token(&token, SECRET).is_err());
    }

    #[test]
    fn password_change_invalidates_older_tokens() {
        let issued = Utc::now() - Duration::hours(2);
        let claims = Claims::new(Uuid::new_v4(), PrincipalKind::User, issued, 30);

        // Changed after issuance: stale.
        assert!(claims.issued_before(Some(Utc::now() - Duration::hours(1))));
        // Changed before issuance: fine.
        assert!(!claims.issued_before(Some(Utc::now() - Duration::hours(3))));
        // Never changed: fine.
        assert!(!claims.issued_before(None));
    }
}
