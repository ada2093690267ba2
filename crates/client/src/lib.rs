//! Bazaar Client - the storefront client engine.
//!
//! Everything a buyer/seller storefront needs beneath its screens:
//!
//! - [`catalog`] - Loads the product collection once and publishes categories
//! - [`filter`] - Pure search/filter engine and title suggestions
//! - [`session`] - Role selection, sign-in/up/out and the area guard
//! - [`wishlist`] - Remote-backed wishlist with optimistic removal
//! - [`store`] - Remote capability traits plus Firebase, HTTP, file and
//!   in-memory implementations
//!
//! # Example
//!
//! ```rust,ignore
//! use bazaar_client::{Bazaar, ClientConfig, FilterState};
//!
//! let config = ClientConfig::from_env()?;
//! let mut app = Bazaar::connect(&config)?;
//!
//! app.catalog.load().await?;
//! let view = app.catalog.view("phone", &FilterState::default());
//!
//! app.session.select_role(Role::Buyer).await?;
//! app.session.sign_in("buyer@example.com", "hunter22").await?;
//! app.wishlist.add(app.session.session(), ProductId::new(1)).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod filter;
pub mod session;
pub mod store;
pub mod wishlist;

pub use app::{Bazaar, Capabilities, catalog_only};
pub use catalog::{CatalogState, CatalogStore, FetchError, Product, ProductSummary, Review};
pub use config::{ClientConfig, ConfigError, FirebaseConfig};
pub use error::{Error, Result};
pub use filter::{CatalogView, FilterState, SUGGESTION_LIMIT};
pub use session::{AuthError, Destination, Session, SessionGuard, SessionState, UserProfile};
pub use wishlist::{AddOutcome, RemoveOutcome, WishlistError, WishlistSync};
