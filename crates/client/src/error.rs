//! Unified error handling with Sentry integration.
//!
//! Every component has its own error enum; [`Error`] wraps them so callers
//! can use a single `Result<T>` and ask for the text to show the user.

use thiserror::Error;

use crate::catalog::FetchError;
use crate::config::ConfigError;
use crate::session::AuthError;
use crate::store::{DocumentError, LocalStoreError};
use crate::wishlist::WishlistError;

/// Client-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Catalog fetch failed.
    #[error("Catalog error: {0}")]
    Fetch(#[from] FetchError),

    /// Session operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Wishlist operation failed.
    #[error("Wishlist error: {0}")]
    Wishlist(#[from] WishlistError),

    /// Document store operation failed.
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Local persistence failed.
    #[error("Local state error: {0}")]
    Local(#[from] LocalStoreError),

    /// Role or area could not be parsed.
    #[error("Invalid input: {0}")]
    Role(#[from] bazaar_core::RoleError),

    /// Requested resource does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl Error {
    /// Text suitable for showing to the user.
    ///
    /// Internal details (URLs, status codes, parse errors) are never
    /// included; remote auth rejections are passed through verbatim.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.to_string(),
            Self::Fetch(_) => crate::catalog::LOAD_FAILED_MESSAGE.to_string(),
            Self::Auth(err) => match err {
                AuthError::MissingField(_) => "Please fill in all fields".to_string(),
                AuthError::RoleNotSelected => "Please select a role first".to_string(),
                AuthError::InvalidEmail(e) => format!("Invalid email address: {e}"),
                AuthError::Rejected(message) => message.clone(),
                AuthError::NotSignedIn => "Please sign in first".to_string(),
                AuthError::Profile(_) => {
                    "Your account was created, but saving your profile failed".to_string()
                }
                AuthError::Local(_) => "Could not save your session".to_string(),
                AuthError::Http(_) | AuthError::Unexpected(_) => {
                    "Authentication service unavailable".to_string()
                }
            },
            Self::Wishlist(WishlistError::NoIdentity) => {
                "Please sign in as a buyer to use the wishlist".to_string()
            }
            Self::Wishlist(WishlistError::Store(_)) => "Failed to update wishlist".to_string(),
            Self::Document(_) => "Remote storage error".to_string(),
            Self::Local(_) => "Could not access local state".to_string(),
            Self::Role(err) => err.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
        }
    }

    /// Whether this is an infrastructure failure worth reporting to Sentry
    /// (as opposed to a user input or precondition error).
    #[must_use]
    pub const fn is_reportable(&self) -> bool {
        match self {
            Self::Fetch(_) | Self::Document(_) | Self::Local(_) => true,
            Self::Auth(err) => matches!(
                err,
                AuthError::Http(_)
                    | AuthError::Unexpected(_)
                    | AuthError::Profile(_)
                    | AuthError::Local(_)
            ),
            Self::Wishlist(err) => matches!(err, WishlistError::Store(_)),
            Self::Config(_) | Self::Role(_) | Self::NotFound(_) => false,
        }
    }

    /// Log the error and capture reportable ones to Sentry.
    pub fn report(&self) {
        if self.is_reportable() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        } else {
            tracing::debug!(error = %self, "Operation rejected");
        }
    }
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Set the Sentry user context.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user
/// actions leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound("Product 7".to_string());
        assert_eq!(err.to_string(), "Not found: Product 7");
    }

    #[test]
    fn test_fetch_errors_hide_details() {
        let err = Error::from(FetchError::Status {
            status: 500,
            body: "stack trace".to_string(),
        });
        assert_eq!(err.user_message(), "Failed to fetch products");
        assert!(err.is_reportable());
    }

    #[test]
    fn test_auth_rejection_is_verbatim() {
        let err = Error::from(AuthError::Rejected("EMAIL_EXISTS".to_string()));
        assert_eq!(err.user_message(), "EMAIL_EXISTS");
        assert!(!err.is_reportable());
    }

    #[test]
    fn test_missing_field_message() {
        let err = Error::from(AuthError::MissingField("email"));
        assert_eq!(err.user_message(), "Please fill in all fields");
    }

    #[test]
    fn test_wishlist_messages() {
        assert_eq!(
            Error::from(WishlistError::NoIdentity).user_message(),
            "Please sign in as a buyer to use the wishlist"
        );
        let store = Error::from(WishlistError::Store(DocumentError::Unavailable(
            "offline".to_string(),
        )));
        assert_eq!(store.user_message(), "Failed to update wishlist");
        assert!(store.is_reportable());
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            Error::NotFound("Product 99".to_string()).user_message(),
            "Product 99 not found"
        );
    }
}
