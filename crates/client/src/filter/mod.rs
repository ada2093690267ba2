//! Catalog search and filtering.
//!
//! Pure functions over an in-memory product collection. Re-run them on every
//! input change; nothing is cached or debounced.
//!
//! An item is kept when all of these hold:
//! - the query is a case-insensitive substring of its title or description
//! - its price is within the optional min/max bounds (inclusive)
//! - its rating is at least `min_rating`
//! - its category equals the selected category, if one is selected
//!
//! Output preserves the source order.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;

/// Maximum number of title suggestions.
pub const SUGGESTION_LIMIT: usize = 5;

/// Filter inputs as typed by the user.
///
/// Price bounds stay raw text; blank or unparseable text means "no bound".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    pub min_price: String,
    pub max_price: String,
    pub min_rating: f64,
    /// Exact category label; empty means every category.
    pub category: String,
}

impl FilterState {
    /// Parsed lower price bound.
    #[must_use]
    pub fn min_price_bound(&self) -> Option<Decimal> {
        parse_bound(&self.min_price)
    }

    /// Parsed upper price bound.
    #[must_use]
    pub fn max_price_bound(&self) -> Option<Decimal> {
        parse_bound(&self.max_price)
    }

    /// Whether any filter narrows the result beyond the text query.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.min_price_bound().is_some()
            || self.max_price_bound().is_some()
            || self.min_rating > 0.0
            || !self.category.is_empty()
    }

    /// Whether `product` passes the price, rating and category predicates.
    #[must_use]
    pub fn admits(&self, product: &Product) -> bool {
        let (min, max) = (self.min_price_bound(), self.max_price_bound());
        Bounds { min, max }.admits(product) && self.admits_rest(product)
    }

    fn admits_rest(&self, product: &Product) -> bool {
        product.rating >= self.min_rating
            && (self.category.is_empty() || product.category == self.category)
    }
}

#[derive(Clone, Copy)]
struct Bounds {
    min: Option<Decimal>,
    max: Option<Decimal>,
}

impl Bounds {
    fn admits(self, product: &Product) -> bool {
        self.min.is_none_or(|min| product.price >= min)
            && self.max.is_none_or(|max| product.price <= max)
    }
}

fn parse_bound(raw: &str) -> Option<Decimal> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Decimal::from_str(raw).ok()
}

/// Case-insensitive substring test; an empty needle matches everything.
fn contains_ignore_case(haystack: &str, needle_lower: &str) -> bool {
    needle_lower.is_empty() || haystack.to_lowercase().contains(needle_lower)
}

/// Products matching `query` and `filters`, in source order.
#[must_use]
pub fn apply(products: &[Product], query: &str, filters: &FilterState) -> Vec<Product> {
    let needle = query.to_lowercase();
    let bounds = Bounds {
        min: filters.min_price_bound(),
        max: filters.max_price_bound(),
    };

    products
        .iter()
        .filter(|p| {
            (contains_ignore_case(&p.title, &needle)
                || contains_ignore_case(&p.description, &needle))
                && bounds.admits(p)
                && filters.admits_rest(p)
        })
        .cloned()
        .collect()
}

/// Up to [`SUGGESTION_LIMIT`] titles containing `query`.
///
/// Only titles are matched and the other filters are ignored. An empty query
/// yields no suggestions.
#[must_use]
pub fn suggestions(products: &[Product], query: &str) -> Vec<String> {
    if query.is_empty() {
        return Vec::new();
    }
    let needle = query.to_lowercase();

    products
        .iter()
        .filter(|p| contains_ignore_case(&p.title, &needle))
        .map(|p| p.title.clone())
        .take(SUGGESTION_LIMIT)
        .collect()
}

/// Derived search screen state for one (query, filters) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogView {
    pub products: Vec<Product>,
    pub suggestions: Vec<String>,
}

impl CatalogView {
    #[must_use]
    pub fn new(products: &[Product], query: &str, filters: &FilterState) -> Self {
        Self {
            products: apply(products, query, filters),
            suggestions: suggestions(products, query),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::ProductId;

    use super::*;
    use crate::catalog::tests::product;

    fn priced() -> Vec<Product> {
        vec![
            product(1, "Budget Phone", 10, "smartphones"),
            product(2, "Mid Phone", 25, "smartphones"),
            product(3, "Desk Lamp", 40, "home-decoration"),
        ]
    }

    fn ids(products: &[Product]) -> Vec<i32> {
        products.iter().map(|p| p.id.as_i32()).collect()
    }

    #[test]
    fn test_default_filters_and_empty_query_return_everything() {
        let products = priced();
        assert_eq!(apply(&products, "", &FilterState::default()), products);
    }

    #[test]
    fn test_min_price_keeps_order() {
        let filters = FilterState {
            min_price: "20".to_string(),
            ..FilterState::default()
        };
        assert_eq!(ids(&apply(&priced(), "", &filters)), vec![2, 3]);
    }

    #[test]
    fn test_price_bounds_are_inclusive() {
        let filters = FilterState {
            min_price: "10".to_string(),
            max_price: "25".to_string(),
            ..FilterState::default()
        };
        assert_eq!(ids(&apply(&priced(), "", &filters)), vec![1, 2]);
    }

    #[test]
    fn test_unparseable_bound_is_no_bound() {
        let garbage = FilterState {
            min_price: "abc".to_string(),
            ..FilterState::default()
        };
        let blank = FilterState::default();
        assert_eq!(
            apply(&priced(), "", &garbage),
            apply(&priced(), "", &blank)
        );
        assert!(!garbage.is_active());
    }

    #[test]
    fn test_zero_bound_is_a_real_bound() {
        let filters = FilterState {
            max_price: "0".to_string(),
            ..FilterState::default()
        };
        assert!(apply(&priced(), "", &filters).is_empty());
        assert!(filters.is_active());
    }

    #[test]
    fn test_bound_with_whitespace_and_decimals() {
        let filters = FilterState {
            max_price: " 24.99 ".to_string(),
            ..FilterState::default()
        };
        assert_eq!(ids(&apply(&priced(), "", &filters)), vec![1]);
    }

    #[test]
    fn test_query_matches_title_or_description_case_insensitively() {
        let mut products = priced();
        products[2].description = "Warm LED light for a PHONE stand".to_string();
        assert_eq!(ids(&apply(&products, "phone", &FilterState::default())), vec![1, 2, 3]);
        assert_eq!(ids(&apply(&products, "LAMP", &FilterState::default())), vec![3]);
        assert!(apply(&products, "tablet", &FilterState::default()).is_empty());
    }

    #[test]
    fn test_rating_floor_is_inclusive() {
        let mut products = priced();
        products[0].rating = 3.5;
        products[1].rating = 4.5;
        products[2].rating = 2.0;
        let filters = FilterState {
            min_rating: 3.5,
            ..FilterState::default()
        };
        assert_eq!(ids(&apply(&products, "", &filters)), vec![1, 2]);
    }

    #[test]
    fn test_category_exact_match() {
        let filters = FilterState {
            category: "smartphones".to_string(),
            ..FilterState::default()
        };
        assert_eq!(ids(&apply(&priced(), "", &filters)), vec![1, 2]);

        let partial = FilterState {
            category: "smart".to_string(),
            ..FilterState::default()
        };
        assert!(apply(&priced(), "", &partial).is_empty());
    }

    #[test]
    fn test_all_predicates_combine() {
        let filters = FilterState {
            min_price: "15".to_string(),
            max_price: "100".to_string(),
            min_rating: 4.0,
            category: "smartphones".to_string(),
        };
        assert_eq!(ids(&apply(&priced(), "phone", &filters)), vec![2]);
    }

    #[test]
    fn test_suggestions_empty_query() {
        assert!(suggestions(&priced(), "").is_empty());
    }

    #[test]
    fn test_suggestions_match_titles_only() {
        let mut products = priced();
        products[2].description = "goes well with any phone".to_string();
        assert_eq!(
            suggestions(&products, "PHONE"),
            vec!["Budget Phone", "Mid Phone"]
        );
    }

    #[test]
    fn test_suggestions_capped() {
        let products: Vec<Product> = (1..=8)
            .map(|i| product(i, &format!("Phone {i}"), 10, "smartphones"))
            .collect();
        let titles = suggestions(&products, "phone");
        assert_eq!(titles.len(), SUGGESTION_LIMIT);
        assert_eq!(titles[0], "Phone 1");
    }

    #[test]
    fn test_view_ignores_filters_for_suggestions() {
        let filters = FilterState {
            min_price: "1000".to_string(),
            ..FilterState::default()
        };
        let view = CatalogView::new(&priced(), "phone", &filters);
        assert!(view.products.is_empty());
        assert_eq!(view.suggestions.len(), 2);
    }

    #[test]
    fn test_admits_matches_apply() {
        let filters = FilterState {
            min_price: "20".to_string(),
            ..FilterState::default()
        };
        let products = priced();
        assert!(!filters.admits(&products[0]));
        assert!(filters.admits(&products[1]));
    }

    mod proptest_tests {
        use proptest::prelude::*;

        use super::*;

        fn arb_product() -> impl Strategy<Value = Product> {
            (
                1..10_000i32,
                "[a-zA-Z ]{0,12}",
                "[a-zA-Z ]{0,24}",
                0..500i64,
                0.0..=5.0f64,
                prop::sample::select(vec!["beauty", "furniture", "groceries"]),
            )
                .prop_map(|(id, title, description, price, rating, category)| {
                    let mut p = product(id, &title, price, category);
                    p.description = description;
                    p.rating = rating;
                    p.id = ProductId::new(id);
                    p
                })
        }

        fn arb_filters() -> impl Strategy<Value = FilterState> {
            (
                prop::option::of(0..500i64),
                prop::option::of(0..500i64),
                prop::sample::select(vec!["", "abc", " "]),
                0.0..=5.0f64,
                prop::sample::select(vec!["", "beauty", "furniture", "toys"]),
            )
                .prop_map(|(min, max, junk, min_rating, category)| FilterState {
                    min_price: min.map_or_else(|| junk.to_string(), |v| v.to_string()),
                    max_price: max.map_or_else(String::new, |v| v.to_string()),
                    min_rating,
                    category: category.to_string(),
                })
        }

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: the result is an order-preserving subsequence of the input.
            #[test]
            fn apply_returns_ordered_subsequence(
                products in prop::collection::vec(arb_product(), 0..40),
                query in "[a-zA-Z]{0,3}",
                filters in arb_filters(),
            ) {
                let result = apply(&products, &query, &filters);
                let mut source = products.iter();
                for kept in &result {
                    prop_assert!(source.any(|p| p == kept));
                }
            }

            /// Property: every returned item satisfies all four predicates.
            #[test]
            fn apply_returns_only_matching_items(
                products in prop::collection::vec(arb_product(), 0..40),
                query in "[a-zA-Z]{0,3}",
                filters in arb_filters(),
            ) {
                let needle = query.to_lowercase();
                for p in apply(&products, &query, &filters) {
                    prop_assert!(
                        p.title.to_lowercase().contains(&needle)
                            || p.description.to_lowercase().contains(&needle)
                    );
                    if let Some(min) = filters.min_price_bound() {
                        prop_assert!(p.price >= min);
                    }
                    if let Some(max) = filters.max_price_bound() {
                        prop_assert!(p.price <= max);
                    }
                    prop_assert!(p.rating >= filters.min_rating);
                    prop_assert!(filters.category.is_empty() || p.category == filters.category);
                }
            }

            /// Property: items that pass every predicate are never dropped.
            #[test]
            fn apply_keeps_every_matching_item(
                products in prop::collection::vec(arb_product(), 0..40),
                query in "[a-zA-Z]{0,3}",
                filters in arb_filters(),
            ) {
                let needle = query.to_lowercase();
                let expected = products
                    .iter()
                    .filter(|p| {
                        (p.title.to_lowercase().contains(&needle)
                            || p.description.to_lowercase().contains(&needle))
                            && filters.admits(p)
                    })
                    .count();
                prop_assert_eq!(apply(&products, &query, &filters).len(), expected);
            }

            /// Property: empty query with default filters is the identity.
            #[test]
            fn default_filters_are_identity(
                products in prop::collection::vec(arb_product(), 0..40),
            ) {
                prop_assert_eq!(apply(&products, "", &FilterState::default()), products);
            }

            /// Property: suggestions never exceed the limit and are titles matching the query.
            #[test]
            fn suggestions_are_bounded(
                products in prop::collection::vec(arb_product(), 0..40),
                query in "[a-zA-Z]{0,2}",
            ) {
                let titles = suggestions(&products, &query);
                prop_assert!(titles.len() <= SUGGESTION_LIMIT);
                if query.is_empty() {
                    prop_assert!(titles.is_empty());
                }
                for title in titles {
                    prop_assert!(title.to_lowercase().contains(&query.to_lowercase()));
                }
            }
        }
    }
}
