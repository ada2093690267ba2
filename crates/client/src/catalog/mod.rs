//! Product catalog store.
//!
//! # Architecture
//!
//! - The full collection is fetched once per cold start through a
//!   [`CatalogSource`]; there is no pagination and no automatic retry
//! - A successful load publishes the products and their distinct categories
//! - A failed load publishes an empty collection and `CatalogState::Failed`;
//!   calling [`CatalogStore::load`] again is the recovery path
//! - Every load is tagged with a generation; a result that arrives after a
//!   newer load started is discarded instead of published

mod http;
mod product;

pub use http::HttpCatalog;
pub use product::{LOW_STOCK_THRESHOLD, Product, ProductSummary, Review};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use bazaar_core::ProductId;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

use crate::filter::{CatalogView, FilterState};
use crate::store::CatalogSource;

/// User-visible message for a failed catalog load.
pub const LOAD_FAILED_MESSAGE: &str = "Failed to fetch products";

/// Errors that can occur when fetching catalog data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("catalog returned HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The endpoint URL could not be built.
    #[error("invalid catalog URL: {0}")]
    InvalidUrl(String),

    /// The source is unreachable.
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// Load lifecycle of the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogState {
    /// Nothing requested yet.
    Idle,
    Loading,
    Ready,
    /// The last load failed; carries the user-visible message.
    Failed(String),
}

/// Holds the product collection for the session.
///
/// Cheaply cloneable via `Arc`; clones share the same published collection.
#[derive(Clone)]
pub struct CatalogStore {
    inner: Arc<CatalogStoreInner>,
}

struct CatalogStoreInner {
    source: Arc<dyn CatalogSource>,
    snapshot: RwLock<Snapshot>,
    generation: AtomicU64,
}

struct Snapshot {
    products: Arc<[Product]>,
    categories: Vec<String>,
    state: CatalogState,
}

impl CatalogStore {
    #[must_use]
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            inner: Arc::new(CatalogStoreInner {
                source,
                snapshot: RwLock::new(Snapshot {
                    products: Arc::from(Vec::new()),
                    categories: Vec::new(),
                    state: CatalogState::Idle,
                }),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Fetch the full collection and publish it.
    ///
    /// # Errors
    ///
    /// Returns the `FetchError` from the source. The published collection is
    /// then empty and the state is `CatalogState::Failed`.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Arc<[Product]>, FetchError> {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.write_snapshot(|snapshot| snapshot.state = CatalogState::Loading);

        let result = self.inner.source.fetch_all().await;

        if self.inner.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "Discarding superseded catalog load");
            return result.map(Arc::from);
        }

        match result {
            Ok(products) => {
                let products: Arc<[Product]> = Arc::from(products);
                let categories = distinct_categories(&products);
                info!(
                    products = products.len(),
                    categories = categories.len(),
                    "Catalog loaded"
                );
                self.write_snapshot(|snapshot| {
                    snapshot.products = Arc::clone(&products);
                    snapshot.categories = categories;
                    snapshot.state = CatalogState::Ready;
                });
                Ok(products)
            }
            Err(e) => {
                error!(error = %e, "Failed to fetch products");
                self.write_snapshot(|snapshot| {
                    snapshot.products = Arc::from(Vec::new());
                    snapshot.categories = Vec::new();
                    snapshot.state = CatalogState::Failed(LOAD_FAILED_MESSAGE.to_string());
                });
                Err(e)
            }
        }
    }

    /// Fetch a single product for the detail view.
    ///
    /// Always asks the source; the published collection is not consulted.
    ///
    /// # Errors
    ///
    /// Returns the `FetchError` from the source.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Option<Product>, FetchError> {
        self.inner.source.fetch_one(id).await
    }

    /// The published collection (empty until a load succeeds).
    #[must_use]
    pub fn products(&self) -> Arc<[Product]> {
        Arc::clone(&self.read_snapshot().products)
    }

    /// Distinct category labels in first-seen order.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.read_snapshot().categories.clone()
    }

    #[must_use]
    pub fn state(&self) -> CatalogState {
        self.read_snapshot().state.clone()
    }

    /// Filtered products and title suggestions over the published collection.
    #[must_use]
    pub fn view(&self, query: &str, filters: &FilterState) -> CatalogView {
        CatalogView::new(&self.products(), query, filters)
    }

    fn read_snapshot(&self) -> std::sync::RwLockReadGuard<'_, Snapshot> {
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_snapshot(&self, update: impl FnOnce(&mut Snapshot)) {
        let mut snapshot = self
            .inner
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        update(&mut snapshot);
    }
}

impl std::fmt::Debug for CatalogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.read_snapshot();
        f.debug_struct("CatalogStore")
            .field("products", &snapshot.products.len())
            .field("categories", &snapshot.categories)
            .field("state", &snapshot.state)
            .finish_non_exhaustive()
    }
}

/// Project `category` over the collection, deduplicated, first-seen order.
fn distinct_categories(products: &[Product]) -> Vec<String> {
    let mut categories: Vec<String> = Vec::new();
    for product in products {
        if !categories.contains(&product.category) {
            categories.push(product.category.clone());
        }
    }
    categories
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::Notify;

    use super::*;
    use crate::store::memory::MemoryCatalog;

    pub(crate) fn product(id: i32, title: &str, price: i64, category: &str) -> Product {
        Product {
            id: ProductId::new(id),
            title: title.to_string(),
            description: format!("{title} description"),
            price: Decimal::from(price),
            category: category.to_string(),
            rating: 4.0,
            stock: 20,
            thumbnail: format!("https://cdn.test/{id}/thumb.png"),
            images: None,
            reviews: None,
            brand: None,
            sku: None,
        }
    }

    fn sample() -> Vec<Product> {
        vec![
            product(1, "Mascara", 10, "beauty"),
            product(2, "Sofa", 25, "furniture"),
            product(3, "Lipstick", 40, "beauty"),
        ]
    }

    #[tokio::test]
    async fn test_initial_state_is_idle_and_empty() {
        let store = CatalogStore::new(Arc::new(MemoryCatalog::new(sample())));
        assert_eq!(store.state(), CatalogState::Idle);
        assert!(store.products().is_empty());
        assert!(store.categories().is_empty());
    }

    #[tokio::test]
    async fn test_load_publishes_products_and_categories() {
        let store = CatalogStore::new(Arc::new(MemoryCatalog::new(sample())));
        let products = store.load().await.unwrap();

        assert_eq!(products.len(), 3);
        assert_eq!(store.state(), CatalogState::Ready);
        assert_eq!(store.products().len(), 3);
        assert_eq!(store.categories(), vec!["beauty", "furniture"]);
    }

    #[tokio::test]
    async fn test_failed_load_leaves_collection_empty() {
        let source = Arc::new(MemoryCatalog::new(sample()));
        let store = CatalogStore::new(Arc::clone(&source) as Arc<dyn CatalogSource>);
        store.load().await.unwrap();

        source.set_offline(true);
        assert!(store.load().await.is_err());
        assert!(store.products().is_empty());
        assert!(store.categories().is_empty());
        assert_eq!(
            store.state(),
            CatalogState::Failed(LOAD_FAILED_MESSAGE.to_string())
        );
    }

    #[tokio::test]
    async fn test_reload_recovers_after_failure() {
        let source = Arc::new(MemoryCatalog::new(sample()));
        source.set_offline(true);
        let store = CatalogStore::new(Arc::clone(&source) as Arc<dyn CatalogSource>);
        assert!(store.load().await.is_err());

        source.set_offline(false);
        store.load().await.unwrap();
        assert_eq!(store.state(), CatalogState::Ready);
        assert_eq!(store.products().len(), 3);
    }

    #[tokio::test]
    async fn test_product_lookup_goes_to_source() {
        let source = Arc::new(MemoryCatalog::new(sample()));
        let store = CatalogStore::new(Arc::clone(&source) as Arc<dyn CatalogSource>);

        let found = store.product(ProductId::new(2)).await.unwrap();
        assert_eq!(found.unwrap().title, "Sofa");
        assert!(store.product(ProductId::new(99)).await.unwrap().is_none());
        assert_eq!(source.lookup_count(), 2);
    }

    /// Source whose first `fetch_all` blocks until released.
    struct GatedSource {
        gate: Notify,
        calls: AtomicU64,
    }

    #[async_trait]
    impl CatalogSource for GatedSource {
        async fn fetch_all(&self) -> Result<Vec<Product>, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                self.gate.notified().await;
                Ok(vec![product(1, "Stale", 1, "old")])
            } else {
                Ok(vec![product(2, "Fresh", 2, "new")])
            }
        }

        async fn fetch_one(&self, _id: ProductId) -> Result<Option<Product>, FetchError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_superseded_load_is_discarded() {
        let source = Arc::new(GatedSource {
            gate: Notify::new(),
            calls: AtomicU64::new(0),
        });
        let store = CatalogStore::new(Arc::clone(&source) as Arc<dyn CatalogSource>);

        let slow_store = store.clone();
        let slow = tokio::spawn(async move { slow_store.load().await });
        // Let the first load reach the gate
        while source.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        store.load().await.unwrap();
        source.gate.notify_one();
        let stale = slow.await.unwrap().unwrap();

        assert_eq!(stale[0].title, "Stale");
        assert_eq!(store.products()[0].title, "Fresh");
        assert_eq!(store.categories(), vec!["new"]);
    }
}
