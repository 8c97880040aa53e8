//! Credential verification and bearer session issuance.
//!
//! Token format is deliberately opaque: a UUID mapped to a session record
//! in memory. The risk decision gates issuance; nothing here scores.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// SHA-256 hex digest of a password, matching the directory seeding job
pub fn hash_password(password: &str) -> String {
    format!("{:x}", Sha256::digest(password.as_bytes()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    hash_password(password) == stored_hash
}

#[derive(Debug, Clone)]
struct Session {
    username: String,
    issued_at_ms: i64,
}

/// In-memory session table with TTL expiry.
///
/// Sessions are issued only for allowed attempts and checked by the
/// dashboard's route guard. Expired entries are dropped lazily on lookup.
pub struct SessionManager {
    ttl_ms: i64,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionManager {
    pub fn new(ttl_seconds: i64) -> Self {
        SessionManager {
            ttl_ms: ttl_seconds * 1000,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Issue a fresh bearer token for a user
    pub fn issue(&self, username: &str) -> String {
        let token = Uuid::new_v4().to_string();
        let mut sessions = self.sessions.lock().unwrap();
        sessions.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                issued_at_ms: Utc::now().timestamp_millis(),
            },
        );
        token
    }

    /// Resolve a bearer token to its username, if the session is live
    pub fn authenticate(&self, token: &str) -> Option<String> {
        self.authenticate_at(token, Utc::now().timestamp_millis())
    }

    fn authenticate_at(&self, token: &str, now_ms: i64) -> Option<String> {
        let mut sessions = self.sessions.lock().unwrap();
        match sessions.get(token) {
            Some(session) if now_ms - session.issued_at_ms <= self.ttl_ms => {
                Some(session.username.clone())
            }
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    pub fn revoke(&self, token: &str) {
        self.sessions.lock().unwrap().remove(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_stable_hex() {
        let hash = hash_password("hunter2");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_password("hunter2"));
        assert_ne!(hash, hash_password("hunter3"));
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
    }

    #[test]
    fn test_issue_and_authenticate() {
        let manager = SessionManager::new(3600);
        let token = manager.issue("alice");
        assert_eq!(manager.authenticate(&token).as_deref(), Some("alice"));
        assert!(manager.authenticate("not-a-token").is_none());
    }

    #[test]
    fn test_expired_session_is_rejected_and_dropped() {
        let manager = SessionManager::new(60);
        let token = manager.issue("alice");

        let far_future = Utc::now().timestamp_millis() + 61_000;
        assert!(manager.authenticate_at(&token, far_future).is_none());
        // Lazy expiry removed the entry entirely
        assert!(manager.authenticate(&token).is_none());
    }

    #[test]
    fn test_revoke() {
        let manager = SessionManager::new(3600);
        let token = manager.issue("bob");
        manager.revoke(&token);
        assert!(manager.authenticate(&token).is_none());
    }

    #[test]
    fn test_tokens_are_unique_per_issue() {
        let manager = SessionManager::new(3600);
        let first = manager.issue("alice");
        let second = manager.issue("alice");
        assert_ne!(first, second);
        assert_eq!(manager.authenticate(&first).as_deref(), Some("alice"));
        assert_eq!(manager.authenticate(&second).as_deref(), Some("alice"));
    }
}
