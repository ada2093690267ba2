//! Identity Toolkit (Firebase Auth) REST client.

use std::sync::Arc;

use async_trait::async_trait;
use bazaar_core::{Email, UserId};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};
use url::Url;

use super::{FirebaseSession, error_message, excerpt};
use crate::config::FirebaseConfig;
use crate::session::AuthError;
use crate::store::{AuthProvider, Identity};

const PRODUCTION_BASE: &str = "https://identitytoolkit.googleapis.com";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
}

/// Firebase Auth over the Identity Toolkit REST API.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct FirebaseAuth {
    inner: Arc<FirebaseAuthInner>,
}

struct FirebaseAuthInner {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    session: FirebaseSession,
}

impl FirebaseAuth {
    /// Create a client for the configured project, honouring
    /// `FIREBASE_AUTH_EMULATOR_HOST`.
    #[must_use]
    pub fn new(config: &FirebaseConfig, session: FirebaseSession) -> Self {
        let base_url = config.auth_emulator_host.as_ref().map_or_else(
            || PRODUCTION_BASE.to_string(),
            |host| format!("http://{host}/identitytoolkit.googleapis.com"),
        );
        Self::with_base_url(base_url, config.api_key.clone(), session)
    }

    /// Create a client against an explicit Identity Toolkit base URL.
    #[must_use]
    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: SecretString,
        session: FirebaseSession,
    ) -> Self {
        Self {
            inner: Arc::new(FirebaseAuthInner {
                client: reqwest::Client::new(),
                base_url: base_url.into().trim_end_matches('/').to_string(),
                api_key,
                session,
            }),
        }
    }

    fn endpoint(&self, action: &str) -> Result<Url, AuthError> {
        let mut url = Url::parse(&format!("{}/v1/accounts:{action}", self.inner.base_url))
            .map_err(|e| AuthError::Unexpected(format!("invalid auth URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", self.inner.api_key.expose_secret());
        Ok(url)
    }

    /// POST an email/password request and record the resulting identity.
    async fn password_call(
        &self,
        action: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let request = PasswordRequest {
            email,
            password,
            return_secure_token: true,
        };

        let response = self
            .inner
            .client
            .post(self.endpoint(action)?)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(match error_message(&body) {
                Some(message) => {
                    warn!(action, status = %status, message = %message, "Auth request rejected");
                    AuthError::Rejected(message)
                }
                None => {
                    tracing::error!(
                        action,
                        status = %status,
                        body = %excerpt(&body),
                        "Auth service returned non-success status"
                    );
                    AuthError::Unexpected(format!("HTTP {status}: {}", excerpt(&body)))
                }
            });
        }

        let account: AccountResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body = %excerpt(&body), "Failed to parse auth response");
            AuthError::Unexpected(format!("unparseable auth response: {e}"))
        })?;

        let identity = Identity {
            uid: UserId::new(account.local_id),
            email: account.email.unwrap_or_else(|| email.trim().to_owned()),
        };
        self.inner
            .session
            .store(identity.clone(), SecretString::from(account.id_token));
        debug!(uid = %identity.uid, "Identity signed in");
        Ok(identity)
    }
}

#[async_trait]
impl AuthProvider for FirebaseAuth {
    #[instrument(skip(self, password))]
    async fn create_identity(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        self.password_call("signUp", email.as_str(), password).await
    }

    #[instrument(skip(self, password))]
    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        self.password_call("signInWithPassword", email, password)
            .await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.inner.session.clear();
        Ok(())
    }

    async fn current_identity(&self) -> Option<Identity> {
        self.inner.session.identity()
    }
}

impl std::fmt::Debug for FirebaseAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseAuth")
            .field("base_url", &self.inner.base_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config(emulator: Option<&str>) -> FirebaseConfig {
        FirebaseConfig {
            api_key: SecretString::from("AIzaTestKey"),
            project_id: "demo-bazaar".to_string(),
            auth_emulator_host: emulator.map(String::from),
            firestore_emulator_host: None,
        }
    }

    #[test]
    fn test_production_endpoint() {
        let auth = FirebaseAuth::new(&config(None), FirebaseSession::default());
        let url = auth.endpoint("signUp").unwrap();
        assert_eq!(
            url.as_str(),
            "https://identitytoolkit.googleapis.com/v1/accounts:signUp?key=AIzaTestKey"
        );
    }

    #[test]
    fn test_emulator_endpoint() {
        let auth = FirebaseAuth::new(&config(Some("127.0.0.1:9099")), FirebaseSession::default());
        let url = auth.endpoint("signInWithPassword").unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:9099/identitytoolkit.googleapis.com/v1/accounts:signInWithPassword?key=AIzaTestKey"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(PasswordRequest {
            email: "a@b.c",
            password: "pw",
            return_secure_token: true,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"email": "a@b.c", "password": "pw", "returnSecureToken": true})
        );
    }

    #[test]
    fn test_debug_redacts_key() {
        let auth = FirebaseAuth::new(&config(None), FirebaseSession::default());
        assert!(!format!("{auth:?}").contains("AIzaTestKey"));
    }
}
