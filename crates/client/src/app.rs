//! Wiring of the engine components over a set of capabilities.

use std::sync::Arc;

use crate::catalog::{CatalogStore, HttpCatalog};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::session::SessionGuard;
use crate::store::firebase::{FirebaseAuth, FirebaseSession, Firestore};
use crate::store::{AuthProvider, CatalogSource, DocumentStore, FileStore, LocalStore};
use crate::wishlist::WishlistSync;

/// The remote and local capabilities an engine runs against.
#[derive(Clone)]
pub struct Capabilities {
    pub auth: Arc<dyn AuthProvider>,
    pub documents: Arc<dyn DocumentStore>,
    pub local: Arc<dyn LocalStore>,
    pub catalog: Arc<dyn CatalogSource>,
}

/// A storefront engine: catalog, session guard and wishlist sharing one set
/// of capabilities.
pub struct Bazaar {
    pub catalog: CatalogStore,
    pub session: SessionGuard,
    pub wishlist: WishlistSync,
}

impl Bazaar {
    /// Assemble an engine over explicit capabilities.
    ///
    /// `wishlist_concurrency` bounds parallel product lookups when listing
    /// the wishlist.
    #[must_use]
    pub fn new(capabilities: Capabilities, wishlist_concurrency: usize) -> Self {
        let Capabilities {
            auth,
            documents,
            local,
            catalog,
        } = capabilities;

        Self {
            catalog: CatalogStore::new(Arc::clone(&catalog)),
            session: SessionGuard::new(auth, Arc::clone(&documents), local),
            wishlist: WishlistSync::new(documents, catalog, wishlist_concurrency),
        }
    }

    /// Assemble an engine against the configured HTTP catalog, Firebase
    /// project and local state file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when Firebase is not configured and
    /// `Error::Document` if the Firestore endpoint is invalid.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let firebase = config.firebase()?;
        let firebase_session = FirebaseSession::default();

        let capabilities = Capabilities {
            auth: Arc::new(FirebaseAuth::new(firebase, firebase_session.clone())),
            documents: Arc::new(Firestore::new(firebase, firebase_session)?),
            local: Arc::new(FileStore::new(&config.state_path)),
            catalog: Arc::new(HttpCatalog::new(config.catalog_url.clone())),
        };

        tracing::debug!(
            catalog_url = %config.catalog_url,
            project_id = %firebase.project_id,
            "Engine connected"
        );
        Ok(Self::new(capabilities, config.wishlist_concurrency))
    }
}

/// A catalog store over the configured HTTP catalog.
///
/// Browsing needs no Firebase configuration.
#[must_use]
pub fn catalog_only(config: &ClientConfig) -> CatalogStore {
    CatalogStore::new(Arc::new(HttpCatalog::new(config.catalog_url.clone())))
}

impl std::fmt::Debug for Bazaar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bazaar")
            .field("catalog", &self.catalog)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{Area, ProductId, Role};

    use super::*;
    use crate::catalog::tests::product;
    use crate::error::Error;
    use crate::session::Destination;
    use crate::store::memory::{MemoryAuth, MemoryCatalog, MemoryDocuments, MemoryLocalStore};
    use crate::wishlist::AddOutcome;

    fn engine() -> Bazaar {
        let capabilities = Capabilities {
            auth: Arc::new(MemoryAuth::new()),
            documents: Arc::new(MemoryDocuments::new()),
            local: Arc::new(MemoryLocalStore::new()),
            catalog: Arc::new(MemoryCatalog::new(vec![
                product(1, "Phone", 500, "smartphones"),
                product(2, "Lamp", 30, "home"),
            ])),
        };
        Bazaar::new(capabilities, 2)
    }

    #[tokio::test]
    async fn test_buyer_journey() {
        let mut app = engine();
        app.catalog.load().await.unwrap();
        assert_eq!(app.catalog.categories(), vec!["smartphones", "home"]);

        app.session.select_role(Role::Buyer).await.unwrap();
        app.session
            .sign_up("ann@example.com", "hunter22", "ann")
            .await
            .unwrap();
        app.session.sign_in("ann@example.com", "hunter22").await.unwrap();
        assert_eq!(
            app.session.enter(Area::Buyer).await,
            Destination::Area(Area::Buyer)
        );

        let outcome = app
            .wishlist
            .add(app.session.session(), ProductId::new(2))
            .await
            .unwrap();
        assert_eq!(outcome, AddOutcome::Added);

        let listed = app.wishlist.list(app.session.session()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "Lamp");
    }

    #[test]
    fn test_connect_requires_firebase() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        let err = Bazaar::connect(&config).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_catalog_only_starts_idle() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        let store = catalog_only(&config);
        assert_eq!(store.state(), crate::catalog::CatalogState::Idle);
    }
}
