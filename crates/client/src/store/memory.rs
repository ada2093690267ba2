//! In-memory capability implementations.
//!
//! Intended for tests/dev. Failure switches let callers exercise the error
//! paths of the engine without a network.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use bazaar_core::{Email, ProductId, UserId};
use serde_json::Value;

use super::{
    AuthProvider, CatalogSource, Document, DocumentError, DocumentStore, Identity, LocalStore,
    LocalStoreError,
};
use crate::catalog::{FetchError, Product};
use crate::session::AuthError;

const MIN_PASSWORD_LENGTH: usize = 6;

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug)]
struct Account {
    uid: UserId,
    email: String,
    password: String,
}

/// In-memory [`AuthProvider`] with Identity Toolkit style rejection messages.
#[derive(Debug, Default)]
pub struct MemoryAuth {
    accounts: RwLock<HashMap<String, Account>>,
    current: RwLock<Option<Identity>>,
    next_uid: AtomicUsize,
}

impl MemoryAuth {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop the current identity as if the provider expired it.
    pub fn expire_session(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn sign_in_as(&self, identity: Identity) -> Identity {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(identity.clone());
        identity
    }
}

#[async_trait]
impl AuthProvider for MemoryAuth {
    async fn create_identity(&self, email: &Email, password: &str) -> Result<Identity, AuthError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Rejected(
                "WEAK_PASSWORD : Password should be at least 6 characters".to_string(),
            ));
        }

        let key = email.as_str().to_lowercase();
        let identity = {
            let mut accounts = self
                .accounts
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if accounts.contains_key(&key) {
                return Err(AuthError::Rejected("EMAIL_EXISTS".to_string()));
            }
            let n = self.next_uid.fetch_add(1, Ordering::Relaxed) + 1;
            let account = Account {
                uid: UserId::new(format!("uid-{n}")),
                email: email.as_str().to_owned(),
                password: password.to_owned(),
            };
            let identity = Identity {
                uid: account.uid.clone(),
                email: account.email.clone(),
            };
            accounts.insert(key, account);
            identity
        };

        Ok(self.sign_in_as(identity))
    }

    async fn authenticate(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        if Email::parse(email).is_err() {
            return Err(AuthError::Rejected("INVALID_EMAIL".to_string()));
        }

        let identity = {
            let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
            match accounts.get(&email.trim().to_lowercase()) {
                Some(account) if account.password == password => Identity {
                    uid: account.uid.clone(),
                    email: account.email.clone(),
                },
                _ => return Err(AuthError::Rejected("INVALID_LOGIN_CREDENTIALS".to_string())),
            }
        };

        Ok(self.sign_in_as(identity))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.expire_session();
        Ok(())
    }

    async fn current_identity(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

// =============================================================================
// Documents
// =============================================================================

/// In-memory [`DocumentStore`].
#[derive(Debug, Default)]
pub struct MemoryDocuments {
    documents: RwLock<HashMap<(String, String), Document>>,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryDocuments {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// When offline, every operation fails with `DocumentError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of successful writes (set, union, remove) so far.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of a stored document.
    #[must_use]
    pub fn document(&self, collection: &str, id: &str) -> Option<Document> {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(collection.to_owned(), id.to_owned()))
            .cloned()
    }

    fn check_online(&self) -> Result<(), DocumentError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(DocumentError::Unavailable("store is offline".to_string()));
        }
        Ok(())
    }

    fn update_array(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        update: impl FnOnce(&mut Vec<Value>),
    ) -> Result<(), DocumentError> {
        self.check_online()?;
        let mut documents = self
            .documents
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let document = documents
            .get_mut(&(collection.to_owned(), id.to_owned()))
            .ok_or_else(|| DocumentError::NotFound(format!("{collection}/{id}")))?;

        let entry = document
            .entry(field.to_owned())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        if let Value::Array(items) = entry {
            update(items);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocuments {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentError> {
        self.check_online()?;
        Ok(self.document(collection, id))
    }

    async fn set(&self, collection: &str, id: &str, fields: Document) -> Result<(), DocumentError> {
        self.check_online()?;
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((collection.to_owned(), id.to_owned()), fields);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), DocumentError> {
        self.update_array(collection, id, field, |items| {
            for value in values {
                if !items.contains(&value) {
                    items.push(value);
                }
            }
        })
    }

    async fn array_remove(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), DocumentError> {
        self.update_array(collection, id, field, |items| {
            items.retain(|item| !values.contains(item));
        })
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// In-memory [`CatalogSource`].
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: RwLock<Vec<Product>>,
    failing: RwLock<HashSet<ProductId>>,
    offline: AtomicBool,
    lookups: AtomicUsize,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            products: RwLock::new(products),
            ..Self::default()
        }
    }

    /// When offline, every fetch fails with `FetchError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Make single-product lookups for `id` fail.
    pub fn fail_lookup(&self, id: ProductId) {
        self.failing
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id);
    }

    /// Replace the catalog contents.
    pub fn replace(&self, products: Vec<Product>) {
        *self.products.write().unwrap_or_else(PoisonError::into_inner) = products;
    }

    /// Number of `fetch_one` calls so far.
    #[must_use]
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    fn check_online(&self) -> Result<(), FetchError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable("catalog is offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalog {
    async fn fetch_all(&self) -> Result<Vec<Product>, FetchError> {
        self.check_online()?;
        Ok(self
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    async fn fetch_one(&self, id: ProductId) -> Result<Option<Product>, FetchError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        if self
            .failing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
        {
            return Err(FetchError::Unavailable(format!("lookup of {id} failed")));
        }
        Ok(self
            .products
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }
}

// =============================================================================
// Local
// =============================================================================

/// In-memory [`LocalStore`].
#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryLocalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, key: &str) -> Result<Option<String>, LocalStoreError> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), LocalStoreError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn clear(&self) -> Result<(), LocalStoreError> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_auth_rejects_duplicate_email() {
        let auth = MemoryAuth::new();
        let email = Email::parse("buyer@shop.test").unwrap();
        auth.create_identity(&email, "secret1").await.unwrap();

        let err = auth.create_identity(&email, "secret1").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected(msg) if msg == "EMAIL_EXISTS"));
    }

    #[tokio::test]
    async fn test_auth_wrong_password() {
        let auth = MemoryAuth::new();
        let email = Email::parse("buyer@shop.test").unwrap();
        auth.create_identity(&email, "secret1").await.unwrap();
        auth.sign_out().await.unwrap();

        let err = auth
            .authenticate("buyer@shop.test", "nope!!")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Rejected(msg) if msg == "INVALID_LOGIN_CREDENTIALS"));
        assert!(auth.current_identity().await.is_none());
    }

    #[tokio::test]
    async fn test_auth_sign_in_sets_current_identity() {
        let auth = MemoryAuth::new();
        let email = Email::parse("Buyer@Shop.test").unwrap();
        let created = auth.create_identity(&email, "secret1").await.unwrap();
        auth.sign_out().await.unwrap();

        let identity = auth.authenticate("buyer@shop.test", "secret1").await.unwrap();
        assert_eq!(identity.uid, created.uid);
        assert_eq!(auth.current_identity().await, Some(identity));
    }

    #[tokio::test]
    async fn test_array_union_skips_present_values() {
        let store = MemoryDocuments::new();
        let mut doc = Document::new();
        doc.insert("wishlist".to_string(), json!(["1"]));
        store.set("buyers", "u1", doc).await.unwrap();

        store
            .array_union("buyers", "u1", "wishlist", vec![json!("1"), json!("2")])
            .await
            .unwrap();

        let doc = store.document("buyers", "u1").unwrap();
        assert_eq!(doc["wishlist"], json!(["1", "2"]));
    }

    #[tokio::test]
    async fn test_array_remove_absent_value_is_noop() {
        let store = MemoryDocuments::new();
        let mut doc = Document::new();
        doc.insert("wishlist".to_string(), json!(["1", "2"]));
        store.set("buyers", "u1", doc).await.unwrap();

        store
            .array_remove("buyers", "u1", "wishlist", vec![json!("9")])
            .await
            .unwrap();

        let doc = store.document("buyers", "u1").unwrap();
        assert_eq!(doc["wishlist"], json!(["1", "2"]));
    }

    #[tokio::test]
    async fn test_array_update_on_missing_document() {
        let store = MemoryDocuments::new();
        let err = store
            .array_union("buyers", "ghost", "wishlist", vec![json!("1")])
            .await
            .unwrap_err();
        assert!(matches!(err, DocumentError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_offline_documents() {
        let store = MemoryDocuments::new();
        store.set_offline(true);
        assert!(matches!(
            store.get("users", "u1").await,
            Err(DocumentError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_local_store_clear() {
        let store = MemoryLocalStore::new();
        store.set("userRole", "buyer").await.unwrap();
        store.clear().await.unwrap();
        assert_eq!(store.get("userRole").await.unwrap(), None);
    }
}
