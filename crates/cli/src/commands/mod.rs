//! Command implementations.
//!
//! Session state that survives between invocations (selected role and the
//! authenticated flag) lives in the local state file. The identity token
//! does not, so commands acting as a user sign in first.

pub mod catalog;
pub mod session;
pub mod wishlist;

use bazaar_client::{Bazaar, ClientConfig};

/// Connect, restore the persisted session and sign in.
///
/// # Errors
///
/// Returns an error if Firebase is not configured, local state cannot be
/// read, or sign-in fails.
pub async fn signed_in(
    config: &ClientConfig,
    email: &str,
    password: &str,
) -> bazaar_client::Result<Bazaar> {
    let mut engine = Bazaar::connect(config)?;
    engine.session.restore().await?;
    engine.session.sign_in(email, password).await?;
    Ok(engine)
}
