//! User roles and the role-gated app areas.

use core::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Errors from parsing a [`Role`] or an [`Area`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleError {
    #[error("invalid role: {0} (expected buyer or seller)")]
    InvalidRole(String),
    #[error("not a role-specific area: {0}")]
    InvalidArea(String),
}

/// The role a user picks before signing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Buyer,
    Seller,
}

impl Role {
    /// Storage form of the role (`"buyer"` / `"seller"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Seller => "seller",
        }
    }

    /// The area a user with this role is allowed into.
    #[must_use]
    pub const fn area(self) -> Area {
        match self {
            Self::Buyer => Area::Buyer,
            Self::Seller => Area::Seller,
        }
    }

    /// Name of the remote collection holding role-specific profiles.
    #[must_use]
    pub const fn profile_collection(self) -> &'static str {
        match self {
            Self::Buyer => "buyers",
            Self::Seller => "sellers",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            other => Err(RoleError::InvalidRole(other.to_owned())),
        }
    }
}

/// A role-specific area of the app.
///
/// Every path under `/buyer/` belongs to [`Area::Buyer`], every path under
/// `/seller/` to [`Area::Seller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Buyer,
    Seller,
}

impl Area {
    /// Root path of the area.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Buyer => "/buyer/",
            Self::Seller => "/seller/",
        }
    }

    /// The only role allowed into this area.
    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::Buyer => Role::Buyer,
            Self::Seller => Role::Seller,
        }
    }

    /// Resolve the area a navigation path belongs to.
    ///
    /// # Errors
    ///
    /// Returns `RoleError::InvalidArea` for paths outside both areas.
    pub fn from_path(path: &str) -> Result<Self, RoleError> {
        let first = path
            .trim()
            .trim_start_matches('/')
            .split('/')
            .next()
            .unwrap_or_default();
        match first {
            "buyer" => Ok(Self::Buyer),
            "seller" => Ok(Self::Seller),
            _ => Err(RoleError::InvalidArea(path.to_owned())),
        }
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
