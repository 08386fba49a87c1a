//! # ql-auth-simple
//!
//! Argon2-based implementation of `AuthProvider`.
//! Handles password hashing and opaque session tokens.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use async_trait::async_trait;
use base64::Engine;
use ql_core::error::AppError;
use ql_core::traits::AuthProvider;
use sha2::{Digest, Sha256};

/// Random bytes per session token, before encoding.
const TOKEN_BYTES: usize = 32;

pub struct SimpleAuthProvider {
    /// Secret salt mixed into stored session digests, so a leaked
    /// sessions table can't be replayed as cookies.
    session_salt: String,
}

impl SimpleAuthProvider {
    /// Accepts a salt string (e.g., from configuration)
    pub fn new(salt: &str) -> Self {
        Self {
            session_salt: salt.to_string(),
        }
    }
}

#[async_trait]
impl AuthProvider for SimpleAuthProvider {
    fn hash_password(&self, password: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {e}"))?;
        Ok(hash.to_string())
    }

    /// Verifies if a provided password matches a stored Argon2 hash.
    async fn verify_password(&self, password: &str, hash: &str) -> ql_core::Result<()> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|_| AppError::Unauthorized("malformed password hash".into()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| AppError::Unauthorized("invalid credentials".into()))
    }

    /// URL-safe base64 of 32 random bytes.
    fn new_session_token(&self) -> anyhow::Result<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        getrandom::getrandom(&mut bytes)
            .map_err(|e| anyhow::anyhow!("no randomness for session token: {e}"))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes))
    }

    fn digest_token(&self, token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.session_salt.as_bytes());
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn password_roundtrip() {
        let auth = SimpleAuthProvider::new("salt");
        let hash = auth.hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(auth.verify_password("correct horse", &hash).await.is_ok());
        assert!(matches!(
            auth.verify_password("wrong", &hash).await,
            Err(AppError::Unauthorized(_))
        ));
        assert!(auth.verify_password("x", "not-a-hash").await.is_err());
    }

    #[test]
    fn tokens_are_random_and_digests_salted() {
        let auth = SimpleAuthProvider::new("salt");
        let a = auth.new_session_token().unwrap();
        let b = auth.new_session_token().unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);

        assert_eq!(auth.digest_token(&a), auth.digest_token(&a));
        assert_ne!(
            auth.digest_token(&a),
            SimpleAuthProvider::new("pepper").digest_token(&a)
        );
    }
}
