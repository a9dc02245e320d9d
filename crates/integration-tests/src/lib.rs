//! Integration tests for Cellshop.
//!
//! Every test runs against a [`MockShop`], a `wiremock` server speaking the
//! shop API's `{ success, data, msg }` envelope, so nothing here needs a real
//! backend.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cellshop-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_state` - Cart and wishlist invariants, device persistence
//! - `login_merge` - Merging the anonymous cart and wishlist on sign-in
//! - `catalog_navigation` - Filter changes, deduplication, stale responses
//! - `order_cancellation` - Cancellation gating and limits
//! - `transport` - Timeouts, device header, rejected tokens
//! - `admin_dashboard` - Admin order review and analytics

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use cellshop_storefront::{ApiConfig, LocalStorage, MemoryStorage, Session};
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Timeout used by test clients; short so timeout tests stay fast.
pub const TEST_TIMEOUT: Duration = Duration::from_millis(500);

/// A mock shop backend mounted under `/api`.
pub struct MockShop {
    pub server: MockServer,
}

impl MockShop {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Client settings pointing at this server.
    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig::new(Url::parse(&format!("{}/api", self.server.uri())).unwrap())
            .with_timeout(TEST_TIMEOUT)
    }

    /// Open a session backed by in-memory storage.
    pub async fn session(&self) -> (Session, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        let session = self.session_with(storage.clone()).await;
        (session, storage)
    }

    /// Open a session over the given storage.
    pub async fn session_with(&self, storage: Arc<dyn LocalStorage>) -> Session {
        Session::open(&self.api_config(), storage).await.unwrap()
    }

    /// Answer `method path` with a success envelope around `data`.
    pub async fn ok(&self, http_method: &str, api_path: &str, data: Value) {
        Mock::given(method(http_method))
            .and(path(format!("/api{api_path}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(data)))
            .mount(&self.server)
            .await;
    }

    /// Accept `POST /auth/login` and `GET /auth/me` for one account.
    pub async fn accept_login(&self, token: &str) {
        let user = json!({"_id": "u1", "email": "an@shop.vn", "name": "An"});
        self.ok("POST", "/auth/login", json!({"token": token, "user": user}))
            .await;
        self.ok("GET", "/auth/me", user).await;
    }
}

/// `{ "success": true, "data": ... }`
#[must_use]
pub fn success(data: Value) -> Value {
    json!({"success": true, "data": data})
}

/// `{ "success": false, "msg": ... }`
#[must_use]
pub fn failure(message: &str) -> Value {
    json!({"success": false, "msg": message})
}

/// A cart line as the server returns it.
#[must_use]
pub fn cart_line(product: &str, sku: &str, price: &str, quantity: u32) -> Value {
    json!({
        "productId": product,
        "sku": sku,
        "name": format!("Product {product}"),
        "price": price,
        "quantity": quantity
    })
}

/// A cart payload.
#[must_use]
pub fn cart(lines: Vec<Value>) -> Value {
    json!({"items": lines})
}

/// A wishlist payload of bare product ids.
#[must_use]
pub fn wishlist(ids: &[&str]) -> Value {
    json!({"items": ids})
}

/// A product listing payload for `page` of `pages`.
#[must_use]
pub fn product_page(names: &[&str], page: u32, pages: u32) -> Value {
    let products: Vec<Value> = names
        .iter()
        .map(|name| {
            json!({
                "_id": format!("id-{name}"),
                "name": name,
                "slug": name,
                "price": "10000000"
            })
        })
        .collect();
    json!({
        "products": products,
        "pagination": {"page": page, "limit": 20, "total": u64::from(pages) * 20, "pages": pages}
    })
}

/// An order in `status`.
#[must_use]
pub fn order(id: &str, status: &str, date: &str, total: &str) -> Value {
    json!({
        "_id": id,
        "orderDate": date,
        "orderStatus": status,
        "paymentStatus": "pending",
        "paymentMethod": "cod",
        "total": total,
        "items": [{"productId": "p1", "sku": "s1", "name": "Phone", "price": total, "quantity": 1}]
    })
}
