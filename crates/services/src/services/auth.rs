use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use dashmap::DashMap;
use rand::{RngCore, rngs::OsRng};
use uuid::Uuid;

use super::error::Result;

const TOKEN_LEN: usize = 32;

/// Argon2id PHC string (`$argon2id$v=19$...`) with a fresh salt per call.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// False for a wrong password and for anything that is not a PHC string.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// In-memory bearer sessions. Tokens are opaque and die with the process.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, Uuid>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self, user_id: Uuid) -> String {
        let mut bytes = [0u8; TOKEN_LEN];
        OsRng.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);
        self.sessions.insert(token.clone(), user_id);
        tracing::debug!(%user_id, "Session created");
        token
    }

    pub fn resolve(&self, token: &str) -> Option<Uuid> {
        self.sessions.get(token).map(|entry| *entry.value())
    }

    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drops every session of the user except `keep`.
    pub fn revoke_user(&self, user_id: Uuid, keep: Option<&str>) {
        self.sessions
            .retain(|token, owner| *owner != user_id || Some(token.as_str()) == keep);
    }
}
