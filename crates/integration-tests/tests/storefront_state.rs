//! Cart and wishlist invariants for a signed-out buyer, and device
//! persistence across sessions.

use std::sync::Arc;

use cellshop_core::{CartLineKey, NewCartItem, ProductId, Sku};
use cellshop_integration_tests::MockShop;
use cellshop_storefront::{FileStorage, LocalStorage, Session, StoreError};
use rust_decimal::Decimal;
use wiremock::matchers::any;
use wiremock::{Mock, ResponseTemplate};

fn item(product: &str, sku: &str, price: i64, quantity: u32) -> NewCartItem {
    NewCartItem {
        product_id: ProductId::new(product),
        sku: Sku::new(sku),
        name: format!("Product {product}"),
        price: Decimal::new(price, 0),
        quantity,
        color: None,
        variant_image: None,
    }
}

/// Signed-out stores never talk to the server.
async fn offline_shop() -> MockShop {
    let shop = MockShop::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&shop.server)
        .await;
    shop
}

fn expected_total(session: &Session) -> Decimal {
    session
        .cart()
        .snapshot()
        .items()
        .iter()
        .map(|line| line.price * Decimal::from(line.quantity))
        .sum()
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_cart_total_tracks_every_mutation() {
    let shop = offline_shop().await;
    let (session, _) = shop.session().await;
    let cart = session.cart();

    cart.add_item(item("p1", "black", 22_990_000, 1)).await.unwrap();
    cart.add_item(item("p2", "white", 5_490_000, 2)).await.unwrap();
    cart.add_item(item("p1", "black", 22_990_000, 2)).await.unwrap();
    assert_eq!(cart.total_amount(), expected_total(&session));
    assert_eq!(cart.total_amount(), Decimal::new(79_950_000, 0));

    cart.update_quantity(&CartLineKey::new("p2", "white"), -1)
        .await
        .unwrap();
    assert_eq!(cart.total_amount(), expected_total(&session));

    cart.remove_item(&CartLineKey::new("p1", "black")).await.unwrap();
    assert_eq!(cart.total_amount(), Decimal::new(5_490_000, 0));
    assert_eq!(cart.total_amount(), expected_total(&session));

    cart.clear_cart().await.unwrap();
    assert_eq!(cart.total_amount(), Decimal::ZERO);
    assert_eq!(cart.cart_count(), 0);
}

#[tokio::test]
async fn test_cart_rejects_invalid_changes_without_touching_state() {
    let shop = offline_shop().await;
    let (session, _) = shop.session().await;
    let cart = session.cart();
    cart.add_item(item("p1", "black", 1_000, 1)).await.unwrap();

    let err = cart.add_item(item("p2", "x", -5, 1)).await.unwrap_err();
    assert!(err.is_validation());
    let err = cart.add_item(item("p2", "x", 5, 0)).await.unwrap_err();
    assert!(err.is_validation());
    let err = cart
        .update_quantity(&CartLineKey::new("p1", "black"), -1)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    assert_eq!(cart.line_count(), 1);
    assert_eq!(cart.cart_count(), 1);
    assert!(cart.total_amount() >= Decimal::ZERO);
}

#[tokio::test]
async fn test_removing_missing_line_is_noop() {
    let shop = offline_shop().await;
    let (session, _) = shop.session().await;
    session
        .cart()
        .remove_item(&CartLineKey::new("ghost", "none"))
        .await
        .unwrap();
    assert_eq!(session.cart().line_count(), 0);
}

#[tokio::test]
async fn test_concurrent_adds_to_same_line_are_all_counted() {
    let shop = offline_shop().await;
    let (session, _) = shop.session().await;
    let cart = session.cart();

    let adds = (0..10).map(|_| {
        let cart = Arc::clone(&cart);
        tokio::spawn(async move { cart.add_item(item("p1", "black", 100, 1)).await })
    });
    for handle in adds.collect::<Vec<_>>() {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(cart.cart_count(), 10);
    assert_eq!(cart.line_count(), 1);
    assert_eq!(cart.total_amount(), Decimal::new(1_000, 0));
}

// =============================================================================
// Wishlist
// =============================================================================

#[tokio::test]
async fn test_wishlist_count_matches_items_including_noops() {
    let shop = offline_shop().await;
    let (session, _) = shop.session().await;
    let wishlist = session.wishlist();
    let a = ProductId::new("a");
    let b = ProductId::new("b");

    let check = || assert_eq!(wishlist.count(), wishlist.items().len());

    assert!(wishlist.add(&a).await.unwrap());
    check();
    assert!(!wishlist.add(&a).await.unwrap());
    check();
    assert!(wishlist.add(&b).await.unwrap());
    check();
    assert!(!wishlist.remove(&ProductId::new("zzz")).await.unwrap());
    check();
    assert!(wishlist.remove(&a).await.unwrap());
    check();
    assert_eq!(wishlist.count(), 1);

    wishlist.clear().await.unwrap();
    check();
    assert!(wishlist.is_empty());
}

#[tokio::test]
async fn test_wishlist_membership_follows_add_and_remove() {
    let shop = offline_shop().await;
    let (session, _) = shop.session().await;
    let wishlist = session.wishlist();
    let x = ProductId::new("iphone-15");

    wishlist.add(&x).await.unwrap();
    assert!(wishlist.contains(&x));
    wishlist.remove(&x).await.unwrap();
    assert!(!wishlist.contains(&x));
}

// =============================================================================
// Persistence
// =============================================================================

#[tokio::test]
async fn test_anonymous_state_survives_restart() {
    let shop = offline_shop().await;
    let dir = tempfile::tempdir().unwrap();

    let device_id = {
        let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(dir.path()));
        let session = shop.session_with(storage).await;
        session.cart().add_item(item("p1", "black", 500, 3)).await.unwrap();
        session.wishlist().add(&ProductId::new("a")).await.unwrap();
        session.device_id()
    };

    let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(dir.path()));
    let session = shop.session_with(storage).await;
    assert_eq!(session.device_id(), device_id);
    assert_eq!(session.cart().cart_count(), 3);
    assert_eq!(session.cart().total_amount(), Decimal::new(1_500, 0));
    assert!(session.wishlist().contains(&ProductId::new("a")));
}

#[tokio::test]
async fn test_corrupt_mirror_starts_empty() {
    let shop = offline_shop().await;
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(dir.path()));
    storage.set_item("cart", "{not json").unwrap();

    let session = shop.session_with(storage).await;
    assert_eq!(session.cart().line_count(), 0);
}
