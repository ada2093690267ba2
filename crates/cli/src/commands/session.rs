//! Role selection, account creation and the area guard.

use bazaar_client::{Bazaar, ClientConfig, Error};
use bazaar_core::{Area, Role};

use super::signed_in;

async fn restored(config: &ClientConfig) -> bazaar_client::Result<Bazaar> {
    let mut engine = Bazaar::connect(config)?;
    engine.session.restore().await?;
    Ok(engine)
}

/// Persist the role for the next sign-in or sign-up.
///
/// # Errors
///
/// Returns an error if Firebase is not configured or local state cannot be
/// written.
#[allow(clippy::print_stdout)]
pub async fn select_role(config: &ClientConfig, role: Role) -> bazaar_client::Result<()> {
    let mut engine = restored(config).await?;
    engine.session.select_role(role).await?;
    println!("Role set to {role}. Next: {}", engine.session.landing().path());
    Ok(())
}

/// Create an account for the selected role.
///
/// # Errors
///
/// Returns `Error::Auth` for missing fields, no selected role, an invalid
/// email, a provider rejection or a failed profile write.
#[allow(clippy::print_stdout)]
pub async fn sign_up(
    config: &ClientConfig,
    email: &str,
    password: &str,
    user_name: &str,
) -> bazaar_client::Result<()> {
    let mut engine = restored(config).await?;
    let identity = engine.session.sign_up(email, password, user_name).await?;
    println!("Account created for {}. Sign in to continue.", identity.email);
    Ok(())
}

/// Sign in and print the landing path.
///
/// # Errors
///
/// Returns `Error::Auth` if sign-in fails.
#[allow(clippy::print_stdout)]
pub async fn sign_in(
    config: &ClientConfig,
    email: &str,
    password: &str,
) -> bazaar_client::Result<()> {
    let engine = signed_in(config, email, password).await?;
    println!("Signed in. Next: {}", engine.session.landing().path());
    Ok(())
}

/// Sign out and print where navigation goes.
///
/// # Errors
///
/// Returns an error if local state cannot be cleared.
#[allow(clippy::print_stdout)]
pub async fn sign_out(config: &ClientConfig) -> bazaar_client::Result<()> {
    let mut engine = restored(config).await?;
    let destination = engine.session.sign_out().await?;
    println!("Signed out. Next: {}", destination.path());
    Ok(())
}

/// Print where navigating to `path` ends up, optionally signing in first.
///
/// # Errors
///
/// Returns `Error::Role` if `path` is not an area path and `Error::Auth` if
/// sign-in fails.
#[allow(clippy::print_stdout)]
pub async fn enter(
    config: &ClientConfig,
    path: &str,
    credentials: Option<(&str, &str)>,
) -> bazaar_client::Result<()> {
    let area = Area::from_path(path)?;
    let engine = match credentials {
        Some((email, password)) => signed_in(config, email, password).await?,
        None => restored(config).await?,
    };
    println!("{}", engine.session.enter(area).await.path());
    Ok(())
}

/// Sign in and print the user profile.
///
/// # Errors
///
/// Returns `Error::Auth` if sign-in or the profile read fails and
/// `Error::NotFound` if the user has no profile document.
#[allow(clippy::print_stdout)]
pub async fn account(
    config: &ClientConfig,
    email: &str,
    password: &str,
) -> bazaar_client::Result<()> {
    let engine = signed_in(config, email, password).await?;
    let profile = engine
        .session
        .profile()
        .await?
        .ok_or_else(|| Error::NotFound("Profile".to_string()))?;

    println!("Name:    {}", profile.user_name);
    println!("Email:   {}", profile.email);
    println!("Role:    {}", profile.role);
    println!("Joined:  {}", profile.created_at);
    Ok(())
}
