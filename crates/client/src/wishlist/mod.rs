//! Buyer wishlist synchronized with the `buyers/{uid}` document.
//!
//! # Consistency
//!
//! - `add` reads the remote set first and never writes a duplicate
//! - `remove` is two-phase: the local mirror changes immediately, then the
//!   remote set-difference runs. A failed remote write leaves the id in the
//!   pending set until [`WishlistSync::reconcile`] succeeds
//! - `list` resolves every stored id with its own catalog lookup, a bounded
//!   number at a time; ids that do not resolve are dropped from the result
//!
//! Concurrent union/difference writes commute, so no locking is needed
//! beyond `&mut self`.

use std::collections::BTreeSet;
use std::sync::Arc;

use bazaar_core::{ProductId, UserId};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{FetchError, Product, ProductSummary};
use crate::error::add_breadcrumb;
use crate::session::Session;
use crate::store::{CatalogSource, DocumentError, DocumentStore};

/// Collection holding buyer profiles.
const BUYERS_COLLECTION: &str = "buyers";

/// Array field holding wishlisted product ids (string form).
const WISHLIST_FIELD: &str = "wishlist";

/// Errors that can occur during wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistError {
    /// No buyer is signed in.
    #[error("no authenticated buyer identity")]
    NoIdentity,

    /// Reading or writing the buyer document failed.
    #[error("wishlist store error: {0}")]
    Store(#[from] DocumentError),
}

/// Result of [`WishlistSync::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    /// The product was already wishlisted; nothing was written.
    AlreadyPresent,
}

/// Result of [`WishlistSync::remove`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// Removed locally and remotely.
    Removed,
    /// Removed locally; the remote write failed and is pending.
    Pending,
}

/// Wishlist of the signed-in buyer.
pub struct WishlistSync {
    documents: Arc<dyn DocumentStore>,
    catalog: Arc<dyn CatalogSource>,
    concurrency: usize,
    owner: Option<UserId>,
    mirror: Vec<String>,
    pending: BTreeSet<String>,
    unresolved: Vec<String>,
}

impl WishlistSync {
    /// `concurrency` bounds parallel lookups in [`WishlistSync::list`]
    /// (clamped to at least 1).
    #[must_use]
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        catalog: Arc<dyn CatalogSource>,
        concurrency: usize,
    ) -> Self {
        Self {
            documents,
            catalog,
            concurrency: concurrency.max(1),
            owner: None,
            mirror: Vec::new(),
            pending: BTreeSet::new(),
            unresolved: Vec::new(),
        }
    }

    /// Add a product.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::NoIdentity` unless a buyer is signed in, and
    /// `WishlistError::Store` if the remote read or write fails.
    #[instrument(skip(self, session), fields(product_id = %id))]
    pub async fn add(
        &mut self,
        session: &Session,
        id: ProductId,
    ) -> Result<AddOutcome, WishlistError> {
        let uid = self.owner_for(session)?;
        let key = id.to_string();

        let stored = self.read_remote(&uid).await?;
        if stored.contains(&key) {
            // Removal never reached the remote set; re-adding cancels it
            if self.pending.remove(&key) {
                info!("Re-added product with pending removal");
                self.refresh_mirror(stored);
                add_breadcrumb("wishlist", "Added product", Some(&[("product_id", key.as_str())]));
                return Ok(AddOutcome::Added);
            }
            info!("Product already in wishlist");
            self.refresh_mirror(stored);
            return Ok(AddOutcome::AlreadyPresent);
        }

        self.documents
            .array_union(
                BUYERS_COLLECTION,
                uid.as_str(),
                WISHLIST_FIELD,
                vec![Value::String(key.clone())],
            )
            .await?;

        // Re-adding cancels a pending removal
        self.pending.remove(&key);
        self.refresh_mirror(stored);
        if !self.mirror.contains(&key) {
            self.mirror.push(key.clone());
        }
        add_breadcrumb("wishlist", "Added product", Some(&[("product_id", key.as_str())]));
        Ok(AddOutcome::Added)
    }

    /// Remove a product, optimistically.
    ///
    /// The mirror drops the id before the remote write. If the write fails
    /// the failure is logged, the id is kept pending, and
    /// `RemoveOutcome::Pending` is returned.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::NoIdentity` unless a buyer is signed in.
    #[instrument(skip(self, session), fields(product_id = %id))]
    pub async fn remove(
        &mut self,
        session: &Session,
        id: ProductId,
    ) -> Result<RemoveOutcome, WishlistError> {
        let uid = self.owner_for(session)?;
        let key = id.to_string();

        self.mirror.retain(|entry| entry != &key);

        match self.remote_remove(&uid, &key).await {
            Ok(()) => {
                self.pending.remove(&key);
                add_breadcrumb("wishlist", "Removed product", Some(&[("product_id", key.as_str())]));
                Ok(RemoveOutcome::Removed)
            }
            Err(e) => {
                warn!(error = %e, "Wishlist removal failed remotely; kept pending");
                self.pending.insert(key);
                Ok(RemoveOutcome::Pending)
            }
        }
    }

    /// Resolve the stored wishlist into product summaries.
    ///
    /// Order follows the stored order. Ids that are not found, fail to
    /// fetch, or are not numeric are dropped and reported by
    /// [`WishlistSync::unresolved`]. A missing buyer document is an empty
    /// wishlist.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::NoIdentity` unless a buyer is signed in, and
    /// `WishlistError::Store` if the buyer document cannot be read.
    #[instrument(skip(self, session))]
    pub async fn list(&mut self, session: &Session) -> Result<Vec<ProductSummary>, WishlistError> {
        let uid = self.owner_for(session)?;
        let stored = self.read_remote(&uid).await?;
        self.refresh_mirror(stored);

        let catalog = Arc::clone(&self.catalog);
        let lookups: Vec<(String, Lookup)> = stream::iter(self.mirror.clone())
            .map(|raw| {
                let catalog = Arc::clone(&catalog);
                async move {
                    let lookup = match raw.parse::<ProductId>() {
                        Ok(id) => Lookup::from(catalog.fetch_one(id).await),
                        Err(_) => Lookup::Malformed,
                    };
                    (raw, lookup)
                }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        self.unresolved.clear();
        let mut summaries = Vec::with_capacity(lookups.len());
        for (raw, lookup) in lookups {
            match lookup {
                Lookup::Found(product) => summaries.push(product.summary()),
                Lookup::Missing => {
                    warn!(product_id = %raw, "Wishlisted product no longer in catalog");
                    self.unresolved.push(raw);
                }
                Lookup::Failed(e) => {
                    warn!(product_id = %raw, error = %e, "Wishlisted product lookup failed");
                    self.unresolved.push(raw);
                }
                Lookup::Malformed => {
                    warn!(product_id = %raw, "Wishlist entry is not a product id");
                    self.unresolved.push(raw);
                }
            }
        }

        debug!(
            resolved = summaries.len(),
            unresolved = self.unresolved.len(),
            "Wishlist resolved"
        );
        Ok(summaries)
    }

    /// Retry pending removals, then refresh the mirror from the remote set.
    ///
    /// Returns how many removals are still pending.
    ///
    /// # Errors
    ///
    /// Returns `WishlistError::NoIdentity` unless a buyer is signed in, and
    /// `WishlistError::Store` if the buyer document cannot be read.
    #[instrument(skip(self, session))]
    pub async fn reconcile(&mut self, session: &Session) -> Result<usize, WishlistError> {
        let uid = self.owner_for(session)?;

        for key in std::mem::take(&mut self.pending) {
            if let Err(e) = self.remote_remove(&uid, &key).await {
                warn!(product_id = %key, error = %e, "Pending removal still failing");
                self.pending.insert(key);
            }
        }

        let stored = self.read_remote(&uid).await?;
        self.refresh_mirror(stored);
        info!(pending = self.pending.len(), "Wishlist reconciled");
        Ok(self.pending.len())
    }

    /// Locally mirrored ids, in stored order.
    #[must_use]
    pub fn mirror(&self) -> &[String] {
        &self.mirror
    }

    /// Whether the mirror holds `id`.
    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        let key = id.to_string();
        self.mirror.contains(&key)
    }

    /// Removals applied locally but not yet remotely.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        self.pending.iter().cloned().collect()
    }

    /// Ids dropped by the last [`WishlistSync::list`].
    #[must_use]
    pub fn unresolved(&self) -> &[String] {
        &self.unresolved
    }

    /// Buyer uid of `session`; local state is reset when the buyer changes.
    fn owner_for(&mut self, session: &Session) -> Result<UserId, WishlistError> {
        let uid = session
            .buyer()
            .map(|identity| identity.uid.clone())
            .ok_or(WishlistError::NoIdentity)?;

        if self.owner.as_ref() != Some(&uid) {
            self.mirror.clear();
            self.pending.clear();
            self.unresolved.clear();
            self.owner = Some(uid.clone());
        }
        Ok(uid)
    }

    async fn read_remote(&self, uid: &UserId) -> Result<Vec<String>, WishlistError> {
        let Some(document) = self.documents.get(BUYERS_COLLECTION, uid.as_str()).await? else {
            debug!(uid = %uid, "No buyer document; wishlist is empty");
            return Ok(Vec::new());
        };

        let mut ids: Vec<String> = Vec::new();
        if let Some(Value::Array(items)) = document.get(WISHLIST_FIELD) {
            for item in items {
                let key = match item {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    other => {
                        warn!(value = %other, "Skipping non-scalar wishlist entry");
                        continue;
                    }
                };
                if !ids.contains(&key) {
                    ids.push(key);
                }
            }
        }
        Ok(ids)
    }

    async fn remote_remove(&self, uid: &UserId, key: &str) -> Result<(), DocumentError> {
        self.documents
            .array_remove(
                BUYERS_COLLECTION,
                uid.as_str(),
                WISHLIST_FIELD,
                vec![Value::String(key.to_owned())],
            )
            .await
    }

    /// Mirror = remote ids minus locally pending removals.
    fn refresh_mirror(&mut self, stored: Vec<String>) {
        self.mirror = stored
            .into_iter()
            .filter(|key| !self.pending.contains(key))
            .collect();
    }
}

impl std::fmt::Debug for WishlistSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistSync")
            .field("owner", &self.owner)
            .field("mirror", &self.mirror)
            .field("pending", &self.pending)
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

enum Lookup {
    Found(Product),
    Missing,
    Failed(FetchError),
    Malformed,
}

impl From<Result<Option<Product>, FetchError>> for Lookup {
    fn from(result: Result<Option<Product>, FetchError>) -> Self {
        match result {
            Ok(Some(product)) => Self::Found(product),
            Ok(None) => Self::Missing,
            Err(e) => Self::Failed(e),
        }
    }
}
