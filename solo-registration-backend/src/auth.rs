//! Admin authentication: argon2id password hashes and server-side sessions.
//!
//! The session cookie carries a random token; the store only keeps its
//! SHA-256 digest, so a leaked store can't be replayed as cookies.

use std::collections::HashMap;
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Duration, Utc};
use rand::thread_rng;
use sha2::{Digest as _, Sha256};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::error::AppError;
use crate::session::random_token;

const SESSION_TOKEN_LENGTH: usize = 43;
const MAX_SESSION_TTL_MINUTES: u64 = 60 * 24 * 365;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(AppError::BadRequest("password must not be empty".to_owned()));
    }
    let salt = SaltString::generate(&mut thread_rng());
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// A malformed stored hash counts as a mismatch.
#[must_use]
pub fn verify_password(password_hash: &str, password: &str) -> bool {
    match PasswordHash::new(password_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(err) => {
            debug!("stored password hash is invalid: {err}");
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSession {
    pub admin_id: Uuid,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

type TokenDigest = [u8; 32];

fn digest(token: &str) -> TokenDigest {
    Sha256::digest(token.as_bytes()).into()
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<TokenDigest, AdminSession>>>,
    ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl_minutes: u64) -> Self {
        Self {
            sessions: Arc::default(),
            ttl: Duration::minutes(
                i64::try_from(ttl_minutes.min(MAX_SESSION_TTL_MINUTES)).unwrap_or_default(),
            ),
        }
    }

    /// Starts a session and returns the token for the cookie.
    pub async fn create(&self, admin_id: Uuid, email: String) -> String {
        let token = random_token(SESSION_TOKEN_LENGTH);
        let now = Utc::now();
        let session = AdminSession {
            admin_id,
            email,
            expires_at: now + self.ttl,
        };
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.expires_at > now);
        sessions.insert(digest(&token), session);
        token
    }

    pub async fn lookup(&self, token: &str) -> Option<AdminSession> {
        let key = digest(token);
        let now = Utc::now();
        {
            let sessions = self.sessions.read().await;
            match sessions.get(&key) {
                Some(session) if session.expires_at > now => return Some(session.clone()),
                Some(_) => {}
                None => return None,
            }
        }
        debug!("admin session expired");
        self.sessions.write().await.remove(&key);
        None
    }

    pub async fn revoke(&self, token: &str) {
        self.sessions.write().await.remove(&digest(token));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_argon2id() {
        let first = hash_password("hunter2").unwrap();
        let second = hash_password("hunter2").unwrap();
        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(verify_password(&first, "hunter2"));
        assert!(!verify_password(&first, "hunter3"));
        assert!(!verify_password("not a hash", "hunter2"));
    }

    #[tokio::test]
    async fn sessions_expire_and_can_be_revoked() {
        let store = SessionStore::new(10);
        let token = store.create(Uuid::new_v4(), "admin@example.com".to_owned()).await;
        assert_eq!(
            store.lookup(&token).await.map(|session| session.email),
            Some("admin@example.com".to_owned())
        );
        assert!(store.lookup("guessed").await.is_none());
        store.revoke(&token).await;
        assert!(store.lookup(&token).await.is_none());

        let expired = SessionStore::new(0);
        let token = expired.create(Uuid::new_v4(), "admin@example.com".to_owned()).await;
        assert!(expired.lookup(&token).await.is_none());
    }
}
