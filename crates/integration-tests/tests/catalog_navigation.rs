//! Product listing: filters, page resets, deduplication and out-of-order
//! responses.

use std::time::Duration;

use cellshop_core::{FilterPatch, ValidationError};
use cellshop_integration_tests::{MockShop, product_page, success};
use cellshop_storefront::{FetchOutcome, Location, StoreError};
use url::form_urlencoded;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

fn pairs(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes()).into_owned().collect()
}

async fn serve_any_page(shop: &MockShop) {
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success(product_page(&["iphone-15"], 1, 5))),
        )
        .mount(&shop.server)
        .await;
}

#[tokio::test]
async fn test_facet_change_keeps_existing_facets_and_resets_page() {
    let shop = MockShop::start().await;
    serve_any_page(&shop).await;
    let (session, _) = shop.session().await;

    let catalog = session.catalog(Location::parse(
        "/products?storage=128GB+v%C3%A0+256GB&page=2",
    ));
    assert_eq!(catalog.filter().page(), 2);

    catalog
        .set_filters(&FilterPatch::new().set("ram", "8GB - 12GB"))
        .await
        .unwrap();

    let location = catalog.location();
    assert_eq!(location.path(), "/products");
    let visible = pairs(location.query());
    assert!(visible.contains(&("storage".into(), "128GB và 256GB".into())));
    assert!(visible.contains(&("ram".into(), "8GB - 12GB".into())));
    assert!(!visible.iter().any(|(key, _)| key == "page"));
    assert_eq!(catalog.filter().page(), 1);
}

#[tokio::test]
async fn test_api_query_always_carries_page_and_limit() {
    let shop = MockShop::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("brand", "apple"))
        .and(query_param("page", "1"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(product_page(&["a"], 1, 1))))
        .expect(1)
        .mount(&shop.server)
        .await;
    let (session, _) = shop.session().await;

    let catalog = session.catalog(Location::parse("/products?brand=apple"));
    let outcome = catalog.load().await.unwrap();
    assert!(matches!(outcome, FetchOutcome::Applied(_)));
    assert_eq!(catalog.location().query(), "brand=apple");
}

#[tokio::test]
async fn test_identical_filters_fetch_once() {
    let shop = MockShop::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(product_page(&["a"], 1, 3))))
        .expect(1)
        .mount(&shop.server)
        .await;
    let (session, _) = shop.session().await;
    let catalog = session.catalog(Location::parse("/products"));

    let patch = FilterPatch::new().set("brand", "samsung");
    catalog.set_filters(&patch).await.unwrap();
    let again = catalog.set_filters(&patch).await.unwrap();
    assert!(matches!(again, FetchOutcome::Unchanged));
    assert!(matches!(catalog.load().await.unwrap(), FetchOutcome::Unchanged));
}

#[tokio::test]
async fn test_last_requested_page_wins_over_slow_earlier_response() {
    let shop = MockShop::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success(product_page(&["slow"], 2, 5)))
                .set_delay(Duration::from_millis(250)),
        )
        .mount(&shop.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(product_page(&["fast"], 3, 5))))
        .mount(&shop.server)
        .await;
    let (session, _) = shop.session().await;
    let catalog = session.catalog(Location::parse("/products"));

    let first_patch = FilterPatch::new().page(2);
    let first = catalog.set_filters(&first_patch);
    let second = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        catalog.set_filters(&FilterPatch::new().page(3)).await
    };
    let (first, second) = tokio::join!(first, second);

    assert!(matches!(first.unwrap(), FetchOutcome::Stale));
    assert!(matches!(second.unwrap(), FetchOutcome::Applied(_)));
    assert_eq!(catalog.filter().page(), 3);
    let page = catalog.current_page().unwrap();
    assert_eq!(page.pagination.page, 3);
    assert_eq!(page.products[0].name, "fast");
    assert_eq!(catalog.location().query(), "page=3");
}

#[tokio::test]
async fn test_page_bounds_are_checked_before_fetching() {
    let shop = MockShop::start().await;
    serve_any_page(&shop).await;
    let (session, _) = shop.session().await;
    let catalog = session.catalog(Location::parse("/products"));
    catalog.load().await.unwrap();

    let err = catalog.go_to_page(0).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::PageOutOfRange { page: 0, .. })
    ));
    let err = catalog.go_to_page(6).await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::Validation(ValidationError::PageOutOfRange { page: 6, pages: 5 })
    ));
    assert!(catalog.go_to_page(5).await.is_ok());
}

#[tokio::test]
async fn test_failed_fetch_can_be_retried() {
    let shop = MockShop::start().await;
    Mock::given(method("GET"))
        .and(path("/api/products"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&shop.server)
        .await;
    serve_any_page(&shop).await;
    let (session, _) = shop.session().await;
    let catalog = session.catalog(Location::parse("/products?brand=apple"));

    assert!(catalog.load().await.is_err());
    assert!(catalog.current_page().is_none());
    assert!(matches!(catalog.load().await.unwrap(), FetchOutcome::Applied(_)));
}
