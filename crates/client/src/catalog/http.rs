//! [`CatalogSource`] over the public catalog HTTP endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use bazaar_core::ProductId;
use serde::Deserialize;
use tracing::{debug, instrument};
use url::Url;

use super::{FetchError, Product};
use crate::store::CatalogSource;

/// Characters of an error body kept for logs and errors.
const BODY_EXCERPT: usize = 200;

/// Envelope returned by `GET /products`.
#[derive(Debug, Deserialize)]
struct ProductPage {
    products: Vec<Product>,
    #[serde(default)]
    total: Option<u64>,
}

/// Catalog client.
///
/// Requests the whole collection in one call (`limit=0`) and single products
/// by id. A 404 on a single product means "not found", not an error.
#[derive(Clone)]
pub struct HttpCatalog {
    inner: Arc<HttpCatalogInner>,
}

struct HttpCatalogInner {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCatalog {
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Build on an existing `reqwest` client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: Url) -> Self {
        Self {
            inner: Arc::new(HttpCatalogInner { client, base_url }),
        }
    }

    /// `base_url` with `segments` appended to its path.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, FetchError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FetchError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET `url`; `Ok(None)` on 404.
    async fn get(&self, url: Url) -> Result<Option<String>, FetchError> {
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body = response.text().await?;

        if !status.is_success() {
            let excerpt: String = body.chars().take(BODY_EXCERPT).collect();
            tracing::error!(
                status = %status,
                body = %excerpt,
                "Catalog returned non-success status"
            );
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: excerpt,
            });
        }

        Ok(Some(body))
    }
}

fn parse<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %body.chars().take(BODY_EXCERPT).collect::<String>(),
            "Failed to parse catalog response"
        );
        FetchError::Parse(e)
    })
}

#[async_trait]
impl CatalogSource for HttpCatalog {
    #[instrument(skip(self))]
    async fn fetch_all(&self) -> Result<Vec<Product>, FetchError> {
        let mut url = self.endpoint(&["products"])?;
        url.query_pairs_mut().append_pair("limit", "0");

        let body = self.get(url).await?.ok_or_else(|| FetchError::Status {
            status: reqwest::StatusCode::NOT_FOUND.as_u16(),
            body: "product list not found".to_string(),
        })?;
        let page: ProductPage = parse(&body)?;

        debug!(
            received = page.products.len(),
            total = ?page.total,
            "Fetched product list"
        );
        Ok(page.products)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn fetch_one(&self, id: ProductId) -> Result<Option<Product>, FetchError> {
        let url = self.endpoint(&["products", &id.to_string()])?;
        match self.get(url).await? {
            Some(body) => parse(&body).map(Some),
            None => {
                debug!("Product not found");
                Ok(None)
            }
        }
    }
}
