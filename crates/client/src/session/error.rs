//! Session and authentication error types.

use thiserror::Error;

use crate::store::{DocumentError, LocalStoreError};

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required form field was left blank.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Sign-in or sign-up attempted before choosing a role.
    #[error("no role selected")]
    RoleNotSelected,

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] bazaar_core::EmailError),

    /// The auth provider rejected the request; carries its message verbatim.
    #[error("{0}")]
    Rejected(String),

    /// Operation needs a signed-in identity.
    #[error("not signed in")]
    NotSignedIn,

    /// HTTP request to the auth provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The auth provider answered with something unexpected.
    #[error("unexpected auth response: {0}")]
    Unexpected(String),

    /// Reading or writing a profile document failed.
    #[error("profile error: {0}")]
    Profile(#[from] DocumentError),

    /// Local session state could not be read or written.
    #[error("local state error: {0}")]
    Local(#[from] LocalStoreError),
}
