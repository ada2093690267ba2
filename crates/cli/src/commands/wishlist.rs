//! Buyer wishlist commands. The engine passed in is already signed in.

use bazaar_client::{AddOutcome, Bazaar, RemoveOutcome};
use bazaar_core::ProductId;

/// # Errors
///
/// Returns `Error::Wishlist` unless a buyer is signed in or if the remote
/// write fails.
#[allow(clippy::print_stdout)]
pub async fn add(engine: &mut Bazaar, id: ProductId) -> bazaar_client::Result<()> {
    match engine.wishlist.add(engine.session.session(), id).await? {
        AddOutcome::Added => println!("Added product {id} to your wishlist."),
        AddOutcome::AlreadyPresent => println!("Product {id} is already in your wishlist."),
    }
    Ok(())
}

/// Remove a product, retrying once through reconciliation if the first
/// remote write fails.
///
/// # Errors
///
/// Returns `Error::Wishlist` unless a buyer is signed in.
#[allow(clippy::print_stdout)]
pub async fn remove(engine: &mut Bazaar, id: ProductId) -> bazaar_client::Result<()> {
    let session = engine.session.session();
    match engine.wishlist.remove(session, id).await? {
        RemoveOutcome::Removed => println!("Removed product {id} from your wishlist."),
        RemoveOutcome::Pending => {
            let still_pending = engine.wishlist.reconcile(session).await?;
            if still_pending == 0 {
                println!("Removed product {id} from your wishlist.");
            } else {
                println!("Product {id} removed locally; the remote update is still pending.");
            }
        }
    }
    Ok(())
}

/// # Errors
///
/// Returns `Error::Wishlist` unless a buyer is signed in or if the buyer
/// document cannot be read.
#[allow(clippy::print_stdout)]
pub async fn list(engine: &mut Bazaar) -> bazaar_client::Result<()> {
    let summaries = engine.wishlist.list(engine.session.session()).await?;

    if summaries.is_empty() {
        println!("Your wishlist is empty.");
    }
    for summary in &summaries {
        println!(
            "{:>5}  {:<40}  ${:>9}  {:.1}★",
            summary.id, summary.title, summary.price, summary.rating
        );
    }

    let unresolved = engine.wishlist.unresolved();
    if !unresolved.is_empty() {
        println!();
        println!("{} saved item(s) could not be loaded.", unresolved.len());
    }
    Ok(())
}
