//! Request plumbing: timeouts, the device header and saved tokens.

use std::sync::Arc;
use std::time::Duration;

use cellshop_core::ProductId;
use cellshop_integration_tests::{MockShop, TEST_TIMEOUT, cart, product_page, success, wishlist};
use cellshop_storefront::{
    ApiError, FileStorage, LocalStorage, Location, MemoryStorage, StoreError,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_slow_response_times_out_without_retry() {
    let shop = MockShop::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success(product_page(&["late"], 1, 1)))
                .set_delay(TEST_TIMEOUT * 4),
        )
        .expect(1)
        .mount(&shop.server)
        .await;
    let (session, _) = shop.session().await;
    let catalog = session.catalog(Location::parse("/products"));

    let err = catalog.load().await.unwrap_err();
    assert!(matches!(err, StoreError::Api(ApiError::Timeout)));
    assert!(err.is_transport());
    assert!(catalog.current_page().is_none());
}

#[tokio::test]
async fn test_device_header_is_stable_across_requests_and_restarts() {
    let shop = MockShop::start().await;
    let dir = tempfile::tempdir().unwrap();

    let first: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(dir.path()));
    let session = shop.session_with(first).await;
    let device_id = session.device_id().to_string();
    drop(session);

    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(header("uid", device_id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(product_page(&["a"], 1, 3))))
        .expect(3)
        .mount(&shop.server)
        .await;

    let reopened: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(dir.path()));
    let session = shop.session_with(reopened).await;
    assert_eq!(session.device_id().to_string(), device_id);

    let catalog = session.catalog(Location::parse("/products"));
    catalog.load().await.unwrap();
    catalog.go_to_page(2).await.unwrap();
    catalog.go_to_page(3).await.unwrap();
}

#[tokio::test]
async fn test_each_device_gets_its_own_id() {
    let shop = MockShop::start().await;
    let (one, _) = shop.session().await;
    let (two, _) = shop.session().await;
    assert_ne!(one.device_id(), two.device_id());
}

#[tokio::test]
async fn test_rejected_saved_token_is_discarded() {
    let shop = MockShop::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401).set_body_string("jwt expired"))
        .expect(1)
        .mount(&shop.server)
        .await;

    let storage = Arc::new(MemoryStorage::new());
    storage.set_item("auth_token", "expired").unwrap();
    let session = shop.session_with(storage.clone()).await;

    assert!(!session.is_authenticated());
    assert!(storage.get_item("auth_token").unwrap().is_none());
}

#[tokio::test]
async fn test_unverifiable_saved_token_is_kept() {
    let shop = MockShop::start().await;
    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success(serde_json::json!({"_id": "u1", "email": "an@shop.vn"})))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&shop.server)
        .await;
    shop.ok("GET", "/cart", cart(vec![])).await;
    shop.ok("GET", "/wishlist", wishlist(&["a"])).await;

    let storage = Arc::new(MemoryStorage::new());
    storage.set_item("auth_token", "still-good").unwrap();
    let session = shop.session_with(storage.clone()).await;

    assert!(session.is_authenticated());
    assert!(session.account().is_none());
    assert!(session.wishlist().contains(&ProductId::new("a")));
    assert_eq!(
        storage.get_item("auth_token").unwrap().as_deref(),
        Some("still-good")
    );
}
