//! Catalog browsing: search, categories and product detail.

use bazaar_client::{ClientConfig, Error, FilterState, Product, catalog_only};
use bazaar_core::ProductId;
use tracing::info;

/// Load the catalog and print the filtered products and title suggestions.
///
/// # Errors
///
/// Returns `Error::Fetch` if the catalog cannot be loaded.
#[allow(clippy::print_stdout)]
pub async fn search(
    config: &ClientConfig,
    query: &str,
    filters: &FilterState,
) -> bazaar_client::Result<()> {
    let store = catalog_only(config);
    store.load().await?;

    let view = store.view(query, filters);
    info!(
        query,
        filtered = filters.is_active(),
        results = view.products.len(),
        "Catalog searched"
    );

    if !view.suggestions.is_empty() {
        println!("Suggestions: {}", view.suggestions.join(", "));
        println!();
    }

    if view.products.is_empty() {
        println!("No products found.");
        return Ok(());
    }

    for product in &view.products {
        println!(
            "{:>5}  {:<40}  ${:>9}  {:.1}★  {}",
            product.id, product.title, product.price, product.rating, product.category
        );
    }
    println!();
    println!("{} product(s)", view.products.len());
    Ok(())
}

/// Load the catalog and print its categories in first-seen order.
///
/// # Errors
///
/// Returns `Error::Fetch` if the catalog cannot be loaded.
#[allow(clippy::print_stdout)]
pub async fn categories(config: &ClientConfig) -> bazaar_client::Result<()> {
    let store = catalog_only(config);
    store.load().await?;

    for category in store.categories() {
        println!("{category}");
    }
    Ok(())
}

/// Print one product in detail.
///
/// # Errors
///
/// Returns `Error::NotFound` for an unknown id and `Error::Fetch` if the
/// lookup fails.
pub async fn product(config: &ClientConfig, id: ProductId) -> bazaar_client::Result<()> {
    let store = catalog_only(config);
    let product = store
        .product(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("Product {id}")))?;

    print_detail(&product);
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_detail(product: &Product) {
    println!("{} (#{})", product.title, product.id);
    if let Some(brand) = &product.brand {
        println!("Brand:    {brand}");
    }
    println!("Category: {}", product.category);
    println!("Price:    ${}", product.price);
    println!("Rating:   {:.1}", product.rating);
    if product.is_low_stock() {
        println!("Stock:    only {} left", product.stock);
    } else {
        println!("Stock:    {}", product.stock);
    }
    if let Some(sku) = &product.sku {
        println!("SKU:      {sku}");
    }

    if !product.description.is_empty() {
        println!();
        println!("{}", product.description);
    }

    let gallery = product.gallery();
    if !gallery.is_empty() {
        println!();
        println!("Images:");
        for image in gallery {
            println!("  {image}");
        }
    }

    let reviews = product.reviews.as_deref().unwrap_or_default();
    if !reviews.is_empty() {
        println!();
        println!("Reviews:");
        for review in reviews {
            let posted = review
                .posted_at()
                .map(|at| at.format(" on %Y-%m-%d").to_string())
                .unwrap_or_default();
            println!(
                "  {:.1}★ {}{posted}: {}",
                review.rating, review.reviewer_name, review.comment
            );
        }
    }
}
