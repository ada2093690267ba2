//! Firestore REST client.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::{debug, instrument};
use url::Url;

use super::{FirebaseSession, error_message, excerpt, value};
use crate::config::FirebaseConfig;
use crate::store::{Document, DocumentError, DocumentStore};

const PRODUCTION_BASE: &str = "https://firestore.googleapis.com/v1";

#[derive(Deserialize)]
struct DocumentResponse {
    #[serde(default)]
    fields: Map<String, Value>,
}

enum ArrayTransform {
    Union,
    Remove,
}

impl ArrayTransform {
    const fn key(&self) -> &'static str {
        match self {
            Self::Union => "appendMissingElements",
            Self::Remove => "removeAllArrayElements",
        }
    }
}

/// Firestore document store over the REST API.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Firestore {
    inner: Arc<FirestoreInner>,
}

struct FirestoreInner {
    client: reqwest::Client,
    base_url: Url,
    project_id: String,
    session: FirebaseSession,
}

impl Firestore {
    /// Create a client for the configured project, honouring
    /// `FIRESTORE_EMULATOR_HOST`.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Unavailable` if the emulator host does not form
    /// a valid URL.
    pub fn new(config: &FirebaseConfig, session: FirebaseSession) -> Result<Self, DocumentError> {
        let base = config.firestore_emulator_host.as_ref().map_or_else(
            || PRODUCTION_BASE.to_string(),
            |host| format!("http://{host}/v1"),
        );
        let base_url = Url::parse(&base)
            .map_err(|e| DocumentError::Unavailable(format!("invalid Firestore URL {base}: {e}")))?;
        Ok(Self::with_base_url(base_url, &config.project_id, session))
    }

    /// Create a client against an explicit REST base (ending in `/v1`).
    #[must_use]
    pub fn with_base_url(base_url: Url, project_id: &str, session: FirebaseSession) -> Self {
        Self {
            inner: Arc::new(FirestoreInner {
                client: reqwest::Client::new(),
                base_url,
                project_id: project_id.to_string(),
                session,
            }),
        }
    }

    /// Resource name of a document, as used inside commit requests.
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!(
            "projects/{}/databases/(default)/documents/{collection}/{id}",
            self.inner.project_id
        )
    }

    fn url(&self, tail: &[&str]) -> Result<Url, DocumentError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                DocumentError::Unavailable(format!("cannot-be-a-base URL: {}", self.inner.base_url))
            })?
            .pop_if_empty()
            .extend([
                "projects",
                self.inner.project_id.as_str(),
                "databases",
                "(default)",
            ])
            .extend(tail);
        Ok(url)
    }

    fn document_url(&self, collection: &str, id: &str) -> Result<Url, DocumentError> {
        self.url(&["documents", collection, id])
    }

    fn request(&self, method: Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.inner.client.request(method, url);
        match self.inner.session.id_token() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request and map error statuses. Returns `None` on 404.
    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<Option<String>, DocumentError> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            debug!(what, "Document not found");
            return Ok(None);
        }
        if !status.is_success() {
            let message = error_message(&body).unwrap_or_else(|| excerpt(&body));
            tracing::error!(
                what,
                status = %status,
                message = %message,
                "Firestore returned non-success status"
            );
            return Err(DocumentError::Status {
                status: status.as_u16(),
                message,
            });
        }
        Ok(Some(body))
    }

    async fn transform(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
        transform: ArrayTransform,
    ) -> Result<(), DocumentError> {
        let name = self.document_name(collection, id);
        let values: Vec<Value> = values.iter().map(value::encode).collect();
        let mut field_transform = Map::new();
        field_transform.insert("fieldPath".to_string(), json!(field));
        field_transform.insert(transform.key().to_string(), json!({ "values": values }));
        let body = json!({
            "writes": [{
                "transform": {
                    "document": name,
                    "fieldTransforms": [field_transform],
                },
                "currentDocument": { "exists": true },
            }]
        });

        let url = self.url(&["documents:commit"])?;
        match self.send(self.request(Method::POST, url).json(&body), &name).await? {
            Some(_) => Ok(()),
            None => Err(DocumentError::NotFound(format!("{collection}/{id}"))),
        }
    }
}

#[async_trait]
impl DocumentStore for Firestore {
    #[instrument(skip(self))]
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentError> {
        let url = self.document_url(collection, id)?;
        let Some(body) = self.send(self.request(Method::GET, url), id).await? else {
            return Ok(None);
        };
        let document: DocumentResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body = %excerpt(&body), "Failed to parse Firestore document");
            e
        })?;
        value::decode_fields(&document.fields).map(Some)
    }

    #[instrument(skip(self, fields))]
    async fn set(&self, collection: &str, id: &str, fields: Document) -> Result<(), DocumentError> {
        let url = self.document_url(collection, id)?;
        let body = json!({ "fields": value::encode_fields(&fields) });
        match self.send(self.request(Method::PATCH, url).json(&body), id).await? {
            Some(_) => Ok(()),
            None => Err(DocumentError::NotFound(format!("{collection}/{id}"))),
        }
    }

    #[instrument(skip(self, values))]
    async fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), DocumentError> {
        self.transform(collection, id, field, values, ArrayTransform::Union)
            .await
    }

    #[instrument(skip(self, values))]
    async fn array_remove(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), DocumentError> {
        self.transform(collection, id, field, values, ArrayTransform::Remove)
            .await
    }
}

impl std::fmt::Debug for Firestore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Firestore")
            .field("base_url", &self.inner.base_url.as_str())
            .field("project_id", &self.inner.project_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn firestore(emulator: Option<&str>) -> Firestore {
        let config = FirebaseConfig {
            api_key: SecretString::from("AIzaTestKey"),
            project_id: "demo-bazaar".to_string(),
            auth_emulator_host: None,
            firestore_emulator_host: emulator.map(String::from),
        };
        Firestore::new(&config, FirebaseSession::default()).unwrap()
    }

    #[test]
    fn test_document_url_production() {
        let store = firestore(None);
        assert_eq!(
            store.document_url("buyers", "uid-1").unwrap().as_str(),
            "https://firestore.googleapis.com/v1/projects/demo-bazaar/databases/(default)/documents/buyers/uid-1"
        );
    }

    #[test]
    fn test_commit_url_emulator() {
        let store = firestore(Some("localhost:8080"));
        assert_eq!(
            store.url(&["documents:commit"]).unwrap().as_str(),
            "http://localhost:8080/v1/projects/demo-bazaar/databases/(default)/documents:commit"
        );
    }

    #[test]
    fn test_document_name() {
        assert_eq!(
            firestore(None).document_name("users", "u9"),
            "projects/demo-bazaar/databases/(default)/documents/users/u9"
        );
    }

    #[test]
    fn test_transform_keys() {
        assert_eq!(ArrayTransform::Union.key(), "appendMissingElements");
        assert_eq!(ArrayTransform::Remove.key(), "removeAllArrayElements");
    }
}
