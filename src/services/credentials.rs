//! Credential verifier: password hashing and opaque security tokens
//!
//! Argon2id with the library defaults is the documented cost constant for
//! this deployment. Hashing and verification are CPU-bound, so the async
//! wrappers dispatch to the blocking pool instead of stalling the request
//! tasks.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

/// Hash a password with a fresh random salt.
pub async fn hash_password(password: String) -> AppResult<String> {
    tokio::task::spawn_blocking(move || hash_password_sync(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Hashing task failed: {}", e)))?
}

/// Verify a password against a stored hash.
///
/// Fails closed: malformed or truncated hashes yield `false`, never an
/// error, so corrupted data can never be treated as a match.
pub async fn verify_password(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password_sync(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Verification task failed: {}", e)))
}

fn hash_password_sync(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

fn verify_password_sync(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Generate an opaque token: 32 bytes of OS entropy, hex encoded.
///
/// Used for reset/verification tokens and session ids. The raw token is
/// shown to the user exactly once; only its digest is persisted.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Deterministic SHA-256 hex digest of a token, the only form that is
/// stored and compared on redemption.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trips() {
        let hash = hash_password_sync("secret1").unwrap();
        assert!(verify_password_sync("secret1", &hash));
        assert!(!verify_password_sync("secret2", &hash));
        assert!(!verify_password_sync("", &hash));
    }

    #[test]
    fn unicode_and_empty_passwords_hash() {
        for pw in ["", "pässwörd-ωλ", "正しいパスワード"] {
            let hash = hash_password_sync(pw).unwrap();
            assert!(verify_password_sync(pw, &hash));
            assert!(!verify_password_sync("other", &hash));
        }
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let a = hash_password_sync("secret1").unwrap();
        let b = hash_password_sync("secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_fails_closed() {
        assert!(!verify_password_sync("secret1", ""));
        assert!(!verify_password_sync("secret1", "not-a-phc-string"));
        assert!(!verify_password_sync("secret1", "$argon2id$garbage"));
    }

    #[test]
    fn tokens_are_64_hex_chars_and_unique() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn token_digest_is_deterministic_and_one_way() {
        let token = generate_token();
        assert_eq!(hash_token(&token), hash_token(&token));
        assert_ne!(hash_token(&token), token);
        assert_eq!(hash_token(&token).len(), 64);
    }
}
