//! HTTP client adapter and typed endpoint methods.

use std::sync::{Arc, PoisonError, RwLock};

use cellshop_core::{
    CancellationSubmission, CartLineKey, CartLines, Coupon, CouponCode, DeviceId, Email, Order,
    OrderId, Product, ProductFilter, ProductId, ProductPage,
};
use moka::future::Cache;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

use super::ApiError;
use super::cache::{CacheValue, PRODUCTS_PREFIX, product_key, products_key};
use super::types::{
    Account, AddCartLineBody, AddWishlistBody, CartPayload, Envelope, LoginBody, LoginPayload,
    LoginSession, ProductListPayload, UpdateCartLineBody, WishlistEntry, WishlistPayload,
};
use crate::config::ApiConfig;

/// Header carrying the anonymous device id.
pub const DEVICE_ID_HEADER: &str = "uid";

/// Longest body excerpt kept in errors and logs.
const BODY_EXCERPT_CHARS: usize = 300;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the shop REST API.
///
/// Cheap to clone; clones share the token, the device id and the catalog
/// cache. Each session owns its own client.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    device_id: DeviceId,
    token: RwLock<Option<SecretString>>,
    cache: Cache<String, CacheValue>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("device_id", &self.inner.device_id)
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot carry path segments or the
    /// underlying HTTP client cannot be built.
    pub fn new(config: &ApiConfig, device_id: DeviceId) -> Result<Self, ApiError> {
        if config.base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("cellshop/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ApiError::Http)?;

        let cache = Cache::builder()
            .max_capacity(config.product_cache_capacity)
            .time_to_live(config.product_cache_ttl)
            .support_invalidation_closures()
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                device_id,
                token: RwLock::new(None),
                cache,
            }),
        })
    }

    /// The anonymous device id sent with every request.
    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.inner.device_id
    }

    /// Install or drop the bearer token.
    pub fn set_token(&self, token: Option<SecretString>) {
        *self
            .inner
            .token
            .write()
            .unwrap_or_else(PoisonError::into_inner) = token;
    }

    /// Whether a bearer token is installed.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn authorization(&self) -> Option<HeaderValue> {
        let guard = self
            .inner
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let token = guard.as_ref()?;
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret())).ok()?;
        value.set_sensitive(true);
        Some(value)
    }

    /// Build an endpoint URL from path segments; segments are percent-encoded.
    fn endpoint(&self, segments: &[&str], query: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl)?
            .pop_if_empty()
            .extend(segments);
        url.set_query(query.filter(|q| !q.is_empty()));
        Ok(url)
    }

    /// Send a request and unwrap the response envelope.
    ///
    /// Returns the envelope's `data`, which may legitimately be absent for
    /// mutations that only acknowledge.
    ///
    /// # Errors
    ///
    /// - [`ApiError::Timeout`] / [`ApiError::Http`] for transport failures
    /// - [`ApiError::Unauthorized`] for HTTP 401 without a readable envelope
    /// - [`ApiError::Business`] when the envelope says `success: false`,
    ///   whatever the HTTP status
    /// - [`ApiError::Status`] / [`ApiError::Parse`] for unreadable responses
    pub async fn request<T, B>(
        &self,
        method: Method,
        segments: &[&str],
        query: Option<&str>,
        body: Option<&B>,
    ) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let url = self.endpoint(segments, query)?;
        let mut request = self
            .inner
            .client
            .request(method.clone(), url)
            .header(DEVICE_ID_HEADER, self.inner.device_id.to_string());
        if let Some(value) = self.authorization() {
            request = request.header(AUTHORIZATION, value);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            let err = ApiError::from_transport(e);
            tracing::error!(%method, path = %segments.join("/"), error = %err, "Shop API request failed");
            err
        })?;
        let status = response.status();
        let text = response.text().await.map_err(ApiError::from_transport)?;

        let envelope: Envelope<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if status == reqwest::StatusCode::UNAUTHORIZED => {
                warn!(%method, path = %segments.join("/"), "Shop API rejected credentials");
                return Err(ApiError::Unauthorized);
            }
            Err(e) if status.is_success() => {
                tracing::error!(
                    error = %e,
                    body = %excerpt(&text),
                    "Failed to parse shop API response"
                );
                return Err(ApiError::Parse(e));
            }
            Err(_) => {
                tracing::error!(
                    status = %status,
                    body = %excerpt(&text),
                    "Shop API returned non-success status"
                );
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    body: excerpt(&text),
                });
            }
        };

        if !envelope.success {
            let message = envelope
                .msg
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| format!("request failed with HTTP {}", status.as_u16()));
            warn!(%method, path = %segments.join("/"), status = status.as_u16(), %message, "Shop API reported failure");
            return Err(ApiError::Business {
                status: status.as_u16(),
                message,
            });
        }

        Ok(envelope.data)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: Option<&str>,
    ) -> Result<T, ApiError> {
        self.request::<T, ()>(Method::GET, segments, query, None)
            .await?
            .ok_or(ApiError::MissingData)
    }

    async fn send_json<T, B>(&self, method: Method, segments: &[&str], body: &B) -> Result<Option<T>, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(method, segments, None, Some(body)).await
    }

    async fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<Option<T>, ApiError> {
        self.request::<T, ()>(Method::DELETE, segments, None, None)
            .await
    }

    // =========================================================================
    // Auth Methods
    // =========================================================================

    /// Exchange credentials for a bearer token.
    ///
    /// Does not install the token; the session decides when to do that.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    #[instrument(skip(self, email, password), fields(email = %email.masked()))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<LoginSession, ApiError> {
        let body = LoginBody {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        let payload: LoginPayload = self
            .send_json(Method::POST, &["auth", "login"], &body)
            .await?
            .ok_or(ApiError::MissingData)?;
        debug!(user_id = %payload.user.id, "Logged in");
        Ok(LoginSession {
            token: SecretString::from(payload.token),
            account: payload.user,
        })
    }

    /// Fetch the signed-in account.
    ///
    /// # Errors
    ///
    /// Returns an error for which [`ApiError::is_unauthorized`] holds if the
    /// token is missing or expired.
    #[instrument(skip(self))]
    pub async fn me(&self) -> Result<Account, ApiError> {
        self.get(&["auth", "me"], None).await
    }

    // =========================================================================
    // Cart Methods (not cached - mutable state)
    // =========================================================================

    /// Fetch the authoritative server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_cart(&self) -> Result<CartLines, ApiError> {
        let payload: CartPayload = self.get(&["cart"], None).await?;
        Ok(payload.into())
    }

    /// Add `quantity` units of a line on the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the line (e.g. out of stock).
    #[instrument(skip(self), fields(line = %key))]
    pub async fn add_cart_line(&self, key: &CartLineKey, quantity: u32) -> Result<CartLines, ApiError> {
        let body = AddCartLineBody {
            product_id: &key.product_id,
            sku: &key.sku,
            quantity,
        };
        let payload: CartPayload = self
            .send_json(Method::POST, &["cart"], &body)
            .await?
            .ok_or(ApiError::MissingData)?;
        Ok(payload.into())
    }

    /// Adjust a server cart line by `delta`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the change.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn update_cart_line(&self, key: &CartLineKey, delta: i32) -> Result<CartLines, ApiError> {
        let body = UpdateCartLineBody {
            product_id: &key.product_id,
            sku: &key.sku,
            delta,
        };
        let payload: CartPayload = self
            .send_json(Method::PUT, &["cart"], &body)
            .await?
            .ok_or(ApiError::MissingData)?;
        Ok(payload.into())
    }

    /// Remove a line from the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn remove_cart_line(&self, key: &CartLineKey) -> Result<Option<CartLines>, ApiError> {
        let payload: Option<CartPayload> = self
            .delete(&["cart", key.product_id.as_str(), key.sku.as_str()])
            .await?;
        Ok(payload.map(Into::into))
    }

    /// Empty the server cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), ApiError> {
        self.delete::<serde_json::Value>(&["cart"]).await?;
        Ok(())
    }

    // =========================================================================
    // Wishlist Methods
    // =========================================================================

    /// Fetch the server wishlist as product ids, in server order.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_wishlist(&self) -> Result<Vec<ProductId>, ApiError> {
        let payload: WishlistPayload = self.get(&["wishlist"], None).await?;
        Ok(payload.items.into_iter().map(WishlistEntry::into_id).collect())
    }

    /// Add a product to the server wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the product.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_to_wishlist(&self, product_id: &ProductId) -> Result<(), ApiError> {
        let body = AddWishlistBody {
            product: product_id,
        };
        self.send_json::<serde_json::Value, _>(Method::POST, &["wishlist"], &body)
            .await?;
        Ok(())
    }

    /// Remove a product from the server wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_wishlist(&self, product_id: &ProductId) -> Result<(), ApiError> {
        self.delete::<serde_json::Value>(&["wishlist", product_id.as_str()])
            .await?;
        Ok(())
    }

    /// Empty the server wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn clear_wishlist(&self) -> Result<(), ApiError> {
        self.delete::<serde_json::Value>(&["wishlist"]).await?;
        Ok(())
    }

    // =========================================================================
    // Catalog Methods (cached)
    // =========================================================================

    /// Fetch one page of products for a filter set.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, filter), fields(query = %filter.to_api_query()))]
    pub async fn fetch_products(&self, filter: &ProductFilter) -> Result<ProductPage, ApiError> {
        let query = filter.to_api_query();
        let cache_key = products_key(&query);

        if let Some(CacheValue::Products(page)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for products");
            return Ok(page);
        }

        let payload: ProductListPayload = self.get(&["products"], Some(&query)).await?;
        let page = ProductPage {
            products: payload.products,
            pagination: payload.pagination,
        };

        self.inner
            .cache
            .insert(cache_key, CacheValue::Products(page.clone()))
            .await;

        Ok(page)
    }

    /// Fetch a single product by slug.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_product(&self, slug: &str) -> Result<Product, ApiError> {
        let cache_key = product_key(slug);

        if let Some(CacheValue::Product(product)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for product");
            return Ok(*product);
        }

        let product: Product = self.get(&["products", slug], None).await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    // =========================================================================
    // Order Methods
    // =========================================================================

    /// List the signed-in buyer's orders.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn fetch_orders(&self) -> Result<Vec<Order>, ApiError> {
        self.get(&["orders"], None).await
    }

    /// Fetch one order.
    ///
    /// # Errors
    ///
    /// Returns an error if the order is not found or the API request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn fetch_order(&self, order_id: &OrderId) -> Result<Order, ApiError> {
        self.get(&["orders", order_id.as_str()], None).await
    }

    /// Submit a buyer cancellation. Returns the updated order when the
    /// backend includes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses the cancellation.
    #[instrument(skip(self, submission), fields(order_id = %order_id, reason = submission.kind.as_str()))]
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        submission: &CancellationSubmission,
    ) -> Result<Option<Order>, ApiError> {
        self.send_json(Method::PUT, &["orders", order_id.as_str(), "cancel"], submission)
            .await
    }

    // =========================================================================
    // Checkout Methods
    // =========================================================================

    /// Look up a coupon by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the coupon does not exist or the request fails.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn fetch_coupon(&self, code: &CouponCode) -> Result<Coupon, ApiError> {
        self.get(&["coupons", code.as_str()], None).await
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Drop every cached product listing.
    pub async fn invalidate_products(&self) {
        let result = self
            .inner
            .cache
            .invalidate_entries_if(|key, _| key.starts_with(PRODUCTS_PREFIX));
        if let Err(e) = result {
            warn!(error = %e, "Failed to schedule product cache invalidation");
            self.inner.cache.invalidate_all();
        }
        self.inner.cache.run_pending_tasks().await;
    }

    /// Drop all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn client(server: &MockServer) -> ApiClient {
        let config = ApiConfig::new(Url::parse(&format!("{}/api", server.uri())).unwrap())
            .with_timeout(Duration::from_millis(500));
        ApiClient::new(&config, DeviceId::generate()).unwrap()
    }

    #[tokio::test]
    async fn test_sends_device_id_and_bearer_token() {
        let server = MockServer::start().await;
        let client = client(&server);
        client.set_token(Some(SecretString::from("tok123")));

        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .and(header("authorization", "Bearer tok123"))
            .and(header("uid", client.device_id().to_string().as_str()))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": {"items": []}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let cart = client.fetch_cart().await.unwrap();
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_request_has_no_authorization() {
        let server = MockServer::start().await;
        let client = client(&server);

        Mock::given(method("GET"))
            .and(path("/api/wishlist"))
            .and(header_exists("uid"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "data": {"items": ["p1"]}})),
            )
            .mount(&server)
            .await;

        let ids = client.fetch_wishlist().await.unwrap();
        assert_eq!(ids, vec![ProductId::new("p1")]);
        let received = server.received_requests().await.unwrap();
        assert!(received[0].headers.get("authorization").is_none());
    }

    #[tokio::test]
    async fn test_success_flag_false_is_business_error_even_with_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cart"))
            .and(body_json(json!({"productId": "p1", "sku": "s1", "quantity": 2})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"success": false, "msg": "Out of stock"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .add_cart_line(&CartLineKey::new("p1", "s1"), 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Business { status: 200, ref message } if message == "Out of stock"));
    }

    #[tokio::test]
    async fn test_unauthorized_without_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orders"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_orders().await.unwrap_err();
        assert!(matches!(err, ApiError::Unauthorized));
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_unauthorized_envelope_keeps_server_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/orders"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"success": false, "msg": "jwt expired"})))
            .mount(&server)
            .await;

        let err = client(&server).fetch_orders().await.unwrap_err();
        assert!(matches!(err, ApiError::Business { status: 401, ref message } if message == "jwt expired"));
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn test_non_json_error_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_cart().await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn test_timeout_is_reported_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/cart"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"success": true, "data": {"items": []}}))
                    .set_delay(Duration::from_secs(2)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server).fetch_cart().await.unwrap_err();
        assert!(matches!(err, ApiError::Timeout));
    }

    #[tokio::test]
    async fn test_products_are_cached_per_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .and(query_param("ram", "8GB"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": {"products": [], "pagination": {"page": 1, "limit": 20, "total": 0, "pages": 0}}
            })))
            .expect(2)
            .mount(&server)
            .await;

        let client = client(&server);
        let filter = ProductFilter::from_query("ram=8GB");
        client.fetch_products(&filter).await.unwrap();
        client.fetch_products(&filter).await.unwrap();
        client.invalidate_products().await;
        client.fetch_products(&filter).await.unwrap();
    }

    #[tokio::test]
    async fn test_path_segments_are_encoded() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/cart/p1/black%2F256"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let removed = client(&server)
            .remove_cart_line(&CartLineKey::new("p1", "black/256"))
            .await
            .unwrap();
        assert!(removed.is_none());
    }
}
