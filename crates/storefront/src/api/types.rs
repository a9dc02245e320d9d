//! Wire types for the shop REST API.
//!
//! Request bodies and response payloads as the backend spells them
//! (camelCase). Domain types from `cellshop-core` are used directly where
//! their serde shape already matches.

use std::fmt;

use cellshop_core::{CartItem, CartLines, Email, Pagination, Product, ProductId, Sku, UserId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Response envelope shared by every endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default, alias = "message")]
    pub msg: Option<String>,
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Serialize)]
pub(crate) struct LoginBody<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct LoginPayload {
    pub token: String,
    pub user: Account,
}

/// The signed-in account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

impl Account {
    /// Email parsed for display/masking; `None` if the backend sent junk.
    #[must_use]
    pub fn parsed_email(&self) -> Option<Email> {
        Email::parse(&self.email).ok()
    }
}

/// Result of a successful login. The token never appears in `Debug` output.
pub struct LoginSession {
    pub token: SecretString,
    pub account: Account,
}

impl fmt::Debug for LoginSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginSession")
            .field("token", &"[REDACTED]")
            .field("account", &self.account)
            .finish()
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddCartLineBody<'a> {
    pub product_id: &'a ProductId,
    pub sku: &'a Sku,
    pub quantity: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateCartLineBody<'a> {
    pub product_id: &'a ProductId,
    pub sku: &'a Sku,
    pub delta: i32,
}

/// `GET /cart` and every cart mutation answer with the whole cart.
#[derive(Deserialize)]
pub(crate) struct CartPayload {
    #[serde(default)]
    pub items: Vec<CartItem>,
}

impl From<CartPayload> for CartLines {
    fn from(payload: CartPayload) -> Self {
        Self::from_items(payload.items)
    }
}

// =============================================================================
// Wishlist
// =============================================================================

#[derive(Serialize)]
pub(crate) struct AddWishlistBody<'a> {
    pub product: &'a ProductId,
}

/// The backend returns either bare ids or populated product documents.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum WishlistEntry {
    Id(ProductId),
    Product {
        #[serde(alias = "_id")]
        id: ProductId,
    },
}

impl WishlistEntry {
    pub fn into_id(self) -> ProductId {
        match self {
            Self::Id(id) | Self::Product { id } => id,
        }
    }
}

#[derive(Deserialize)]
pub(crate) struct WishlistPayload {
    #[serde(default)]
    pub items: Vec<WishlistEntry>,
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Deserialize)]
pub(crate) struct ProductListPayload {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_without_data() {
        let envelope: Envelope<CartPayload> =
            serde_json::from_str(r#"{"success":false,"msg":"Hết hàng"}"#).unwrap();
        assert!(!envelope.success);
        assert!(envelope.data.is_none());
        assert_eq!(envelope.msg.as_deref(), Some("Hết hàng"));
    }

    #[test]
    fn test_envelope_message_alias() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"success":true,"message":"ok"}"#).unwrap();
        assert_eq!(envelope.msg.as_deref(), Some("ok"));
    }

    #[test]
    fn test_wishlist_entries_accept_ids_and_documents() {
        let payload: WishlistPayload =
            serde_json::from_str(r#"{"items":["a",{"_id":"b","name":"Phone"}]}"#).unwrap();
        let ids: Vec<ProductId> = payload.items.into_iter().map(WishlistEntry::into_id).collect();
        assert_eq!(ids, vec![ProductId::new("a"), ProductId::new("b")]);
    }

    #[test]
    fn test_update_body_shape() {
        let product = ProductId::new("p1");
        let sku = Sku::new("s1");
        let body = UpdateCartLineBody {
            product_id: &product,
            sku: &sku,
            delta: -1,
        };
        assert_eq!(
            serde_json::to_value(body).unwrap(),
            serde_json::json!({"productId": "p1", "sku": "s1", "delta": -1})
        );
    }

    #[test]
    fn test_login_session_debug_redacts_token() {
        let session = LoginSession {
            token: SecretString::from("tok_live_abc"),
            account: Account {
                id: UserId::new("u1"),
                email: "a@b.vn".into(),
                name: String::new(),
            },
        };
        let debug = format!("{session:?}");
        assert!(!debug.contains("tok_live_abc"));
        assert!(debug.contains("[REDACTED]"));
    }
}
