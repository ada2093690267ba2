//! Remote profile documents created at sign-up.

use bazaar_core::{Role, UserId};
use serde::{Deserialize, Serialize};

/// Collection holding the generic profile of every user.
pub const USERS_COLLECTION: &str = "users";

/// Generic profile stored at `users/{uid}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_name: String,
    pub email: String,
    pub role: Role,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Role-specific profile stored at `buyers/{uid}` or `sellers/{uid}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleProfile {
    pub user_id: UserId,
    pub user_name: String,
    pub email: String,
    pub created_at: String,
    #[serde(flatten)]
    pub lists: RoleLists,
}

/// Empty per-role lists a new account starts with.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum RoleLists {
    Buyer {
        wishlist: Vec<String>,
        orders: Vec<serde_json::Value>,
    },
    Seller {
        products: Vec<serde_json::Value>,
        #[serde(rename = "activeOrders")]
        active_orders: Vec<serde_json::Value>,
    },
}

impl RoleLists {
    #[must_use]
    pub const fn empty(role: Role) -> Self {
        match role {
            Role::Buyer => Self::Buyer {
                wishlist: Vec::new(),
                orders: Vec::new(),
            },
            Role::Seller => Self::Seller {
                products: Vec::new(),
                active_orders: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn role_profile(role: Role) -> RoleProfile {
        RoleProfile {
            user_id: UserId::new("uid-1"),
            user_name: "sam".to_string(),
            email: "sam@shop.test".to_string(),
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            lists: RoleLists::empty(role),
        }
    }

    #[test]
    fn test_buyer_profile_shape() {
        let value = serde_json::to_value(role_profile(Role::Buyer)).unwrap();
        assert_eq!(
            value,
            json!({
                "userId": "uid-1",
                "userName": "sam",
                "email": "sam@shop.test",
                "createdAt": "2026-01-01T00:00:00+00:00",
                "wishlist": [],
                "orders": []
            })
        );
    }

    #[test]
    fn test_seller_profile_shape() {
        let value = serde_json::to_value(role_profile(Role::Seller)).unwrap();
        assert_eq!(value["products"], json!([]));
        assert_eq!(value["activeOrders"], json!([]));
        assert!(value.get("wishlist").is_none());
    }

    #[test]
    fn test_user_profile_reads_remote_shape() {
        let profile: UserProfile = serde_json::from_value(json!({
            "userName": "sam",
            "email": "sam@shop.test",
            "role": "seller",
            "createdAt": "2026-01-01T00:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(profile.role, Role::Seller);
        assert_eq!(profile.user_name, "sam");
    }
}
