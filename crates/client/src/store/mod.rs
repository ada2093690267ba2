//! Remote and local capabilities the engine depends on.
//!
//! # Architecture
//!
//! The catalog, session and wishlist components never talk to a backend
//! directly. They hold `Arc<dyn …>` handles to the traits below:
//!
//! - [`AuthProvider`] - identity creation, password sign-in, sign-out
//! - [`DocumentStore`] - keyed documents with atomic array union/difference
//! - [`CatalogSource`] - full product list and single-product lookup
//! - [`LocalStore`] - tiny key/value store that survives restarts
//!
//! # Implementations
//!
//! - [`firebase`] - Identity Toolkit and Firestore REST adapters
//! - [`crate::catalog::HttpCatalog`] - the public product catalog over HTTP
//! - [`FileStore`] - JSON file backed local store
//! - [`memory`] - in-memory versions of every capability

mod file;
pub mod firebase;
pub mod memory;

pub use file::FileStore;

use async_trait::async_trait;
use bazaar_core::{Email, ProductId, UserId};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{FetchError, Product};
use crate::session::AuthError;

/// Field map of a remote document.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// An authenticated identity as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// Provider-issued uid; keys every per-user document.
    pub uid: UserId,
    /// Email the identity signed in with.
    pub email: String,
}

/// Errors from a [`DocumentStore`].
#[derive(Debug, Error)]
pub enum DocumentError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered with a non-success status.
    #[error("document store returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the error body.
        message: String,
    },

    /// Body could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A typed field value could not be decoded.
    #[error("invalid field value: {0}")]
    InvalidValue(String),

    /// The document a field update targets does not exist.
    #[error("document not found: {0}")]
    NotFound(String),

    /// The store is unreachable.
    #[error("document store unavailable: {0}")]
    Unavailable(String),
}

/// Errors from a [`LocalStore`].
#[derive(Debug, Error)]
pub enum LocalStoreError {
    /// Reading or writing the backing file failed.
    #[error("local store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backing file is not a JSON object of strings.
    #[error("local store is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Remote authentication capability.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Create a new identity. Providers typically sign the new identity in.
    async fn create_identity(&self, email: &Email, password: &str) -> Result<Identity, AuthError>;

    /// Sign in with email and password.
    ///
    /// The email is passed through unvalidated; the provider's own rejection
    /// message is surfaced.
    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    /// Forget the current identity.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// The identity currently signed in, if any.
    async fn current_identity(&self) -> Option<Identity>;
}

/// Remote keyed document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read a document; `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentError>;

    /// Create or replace a document.
    async fn set(&self, collection: &str, id: &str, fields: Document) -> Result<(), DocumentError>;

    /// Atomically append each value not already present in the array `field`.
    async fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<serde_json::Value>,
    ) -> Result<(), DocumentError>;

    /// Atomically remove every occurrence of each value from the array `field`.
    async fn array_remove(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<serde_json::Value>,
    ) -> Result<(), DocumentError>;
}

/// Product catalog data source.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the full product collection.
    async fn fetch_all(&self) -> Result<Vec<Product>, FetchError>;

    /// Fetch one product; `Ok(None)` when the catalog does not know the id.
    async fn fetch_one(&self, id: ProductId) -> Result<Option<Product>, FetchError>;
}

/// Local key/value persistence.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError>;

    /// Remove every key.
    async fn clear(&self) -> Result<(), LocalStoreError>;
}

/// Serialize a struct into a document field map.
///
/// # Errors
///
/// Returns `DocumentError::InvalidValue` when `value` does not serialize to a
/// JSON object.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, DocumentError> {
    match serde_json::to_value(value)? {
        serde_json::Value::Object(fields) => Ok(fields),
        other => Err(DocumentError::InvalidValue(format!(
            "expected an object, got {other}"
        ))),
    }
}
