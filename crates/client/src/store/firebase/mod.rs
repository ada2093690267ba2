//! Firebase REST adapters.
//!
//! # APIs
//!
//! ## Identity Toolkit
//! - `accounts:signUp` / `accounts:signInWithPassword` with the web API key
//! - Rejections (`EMAIL_EXISTS`, `INVALID_LOGIN_CREDENTIALS`, ...) surface verbatim
//!
//! ## Firestore
//! - Documents read with `GET` and replaced with `PATCH`
//! - Array union/difference through `:commit` field transforms
//! - Requests carry the signed-in identity's ID token
//!
//! Both adapters share a [`FirebaseSession`], which holds the ID token of the
//! identity currently signed in. Setting `FIREBASE_AUTH_EMULATOR_HOST` /
//! `FIRESTORE_EMULATOR_HOST` routes traffic to the local emulators.
//!
//! # Example
//!
//! ```rust,ignore
//! let session = FirebaseSession::default();
//! let auth = FirebaseAuth::new(&config.firebase()?, session.clone());
//! let documents = Firestore::new(&config.firebase()?, session);
//! ```

mod auth;
mod firestore;
pub mod value;

pub use auth::FirebaseAuth;
pub use firestore::Firestore;

use std::sync::{Arc, PoisonError, RwLock};

use secrecy::SecretString;
use serde::Deserialize;

use super::Identity;

/// Signed-in state shared between the auth and document adapters.
#[derive(Clone, Default)]
pub struct FirebaseSession {
    inner: Arc<RwLock<Option<SignedIn>>>,
}

#[derive(Clone)]
struct SignedIn {
    identity: Identity,
    id_token: SecretString,
}

impl FirebaseSession {
    fn store(&self, identity: Identity, id_token: SecretString) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) =
            Some(SignedIn { identity, id_token });
    }

    fn clear(&self) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Identity currently signed in.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.identity.clone())
    }

    fn id_token(&self) -> Option<SecretString> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|s| s.id_token.clone())
    }
}

impl std::fmt::Debug for FirebaseSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseSession")
            .field("identity", &self.identity())
            .field("id_token", &"[REDACTED]")
            .finish()
    }
}

/// Google API error envelope: `{"error": {"code", "message", "status"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Extract the `error.message` of a Google API error body.
fn error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error.message)
        .filter(|message| !message.is_empty())
}

/// Characters of an unexpected body kept for logs and errors.
const BODY_EXCERPT: usize = 200;

fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_extracted() {
        let body = r#"{"error":{"code":400,"message":"EMAIL_EXISTS","errors":[]}}"#;
        assert_eq!(error_message(body).as_deref(), Some("EMAIL_EXISTS"));
    }

    #[test]
    fn test_error_message_missing() {
        assert_eq!(error_message("<html>bad gateway</html>"), None);
        assert_eq!(error_message(r#"{"error":{"code":500}}"#), None);
    }

    #[test]
    fn test_session_store_and_clear() {
        let session = FirebaseSession::default();
        assert!(session.identity().is_none());

        let identity = Identity {
            uid: bazaar_core::UserId::new("u1"),
            email: "a@b.c".to_string(),
        };
        session.store(identity.clone(), SecretString::from("s3cr3t-id-token"));
        assert_eq!(session.identity(), Some(identity));
        assert!(session.id_token().is_some());
        assert!(!format!("{session:?}").contains("s3cr3t"));

        session.clear();
        assert!(session.id_token().is_none());
    }
}
