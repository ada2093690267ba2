//! Product types as served by the catalog endpoint.

use bazaar_core::ProductId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Products with fewer units than this are flagged as low stock.
pub const LOW_STOCK_THRESHOLD: u32 = 10;

/// A catalog product.
///
/// Immutable once fetched. Fields the list endpoint may omit default to
/// empty values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub category: String,
    /// Average rating, `0.0..=5.0`.
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews: Option<Vec<Review>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
}

/// A customer review attached to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub reviewer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

/// The subset of a product shown in wishlist rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductSummary {
    pub id: ProductId,
    pub title: String,
    pub price: Decimal,
    pub rating: f64,
    pub thumbnail: String,
}

impl Product {
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock < LOW_STOCK_THRESHOLD
    }

    /// Images for the detail gallery: the thumbnail first, then every
    /// additional image that is not the thumbnail.
    #[must_use]
    pub fn gallery(&self) -> Vec<&str> {
        let mut gallery: Vec<&str> = Vec::new();
        let candidates = std::iter::once(self.thumbnail.as_str())
            .chain(self.images.iter().flatten().map(String::as_str));
        for image in candidates {
            if !image.is_empty() && !gallery.contains(&image) {
                gallery.push(image);
            }
        }
        gallery
    }

    #[must_use]
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id,
            title: self.title.clone(),
            price: self.price,
            rating: self.rating,
            thumbnail: self.thumbnail.clone(),
        }
    }
}

impl Review {
    /// Review timestamp, when present and RFC 3339.
    #[must_use]
    pub fn posted_at(&self) -> Option<DateTime<Utc>> {
        self.date
            .as_deref()
            .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
            .map(|d| d.with_timezone(&Utc))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const DETAIL_JSON: &str = r#"{
        "id": 1,
        "title": "Essence Mascara Lash Princess",
        "description": "A volumizing mascara.",
        "category": "beauty",
        "price": 9.99,
        "rating": 4.94,
        "stock": 5,
        "brand": "Essence",
        "sku": "RCH45Q1A",
        "reviews": [
            {
                "rating": 2,
                "comment": "Very unhappy with my purchase!",
                "date": "2024-05-23T08:56:21.618Z",
                "reviewerName": "John Doe",
                "reviewerEmail": "john.doe@x.dummyjson.com"
            }
        ],
        "images": ["https://cdn.test/1/1.png", "https://cdn.test/1/thumb.png"],
        "thumbnail": "https://cdn.test/1/thumb.png"
    }"#;

    #[test]
    fn test_deserialize_detail_record() {
        let product: Product = serde_json::from_str(DETAIL_JSON).unwrap();
        assert_eq!(product.id, ProductId::new(1));
        assert_eq!(product.price, "9.99".parse::<Decimal>().unwrap());
        assert_eq!(product.brand.as_deref(), Some("Essence"));
        let reviews = product.reviews.unwrap();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].reviewer_name, "John Doe");
        assert!(reviews[0].posted_at().is_some());
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let product: Product =
            serde_json::from_str(r#"{"id": 3, "title": "Lamp", "price": 40}"#).unwrap();
        assert_eq!(product.price, Decimal::from(40));
        assert!(product.description.is_empty());
        assert!(product.images.is_none());
        assert!(product.reviews.is_none());
    }

    #[test]
    fn test_low_stock_threshold() {
        let mut product: Product = serde_json::from_str(DETAIL_JSON).unwrap();
        product.stock = 9;
        assert!(product.is_low_stock());
        product.stock = 10;
        assert!(!product.is_low_stock());
    }

    #[test]
    fn test_gallery_puts_thumbnail_first_without_duplicates() {
        let product: Product = serde_json::from_str(DETAIL_JSON).unwrap();
        assert_eq!(
            product.gallery(),
            vec!["https://cdn.test/1/thumb.png", "https://cdn.test/1/1.png"]
        );
    }

    #[test]
    fn test_summary() {
        let product: Product = serde_json::from_str(DETAIL_JSON).unwrap();
        let summary = product.summary();
        assert_eq!(summary.id, product.id);
        assert_eq!(summary.title, product.title);
        assert_eq!(summary.price, product.price);
        assert_eq!(summary.thumbnail, product.thumbnail);
    }

    #[test]
    fn test_unparseable_review_date() {
        let review = Review {
            rating: 5.0,
            comment: String::new(),
            reviewer_name: String::new(),
            date: Some("yesterday".to_string()),
        };
        assert!(review.posted_at().is_none());
    }
}
