//! Product listing controller: filters, pagination and the address bar.
//!
//! The visible query string is the source of truth for the filters. Every
//! change rewrites it in place (never adding a history entry) and fetches the
//! matching page. Responses can arrive out of order; each fetch carries a
//! token and only the newest one may update the page.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cellshop_core::{FilterPatch, Product, ProductFilter, ProductPage, ValidationError};
use tracing::{debug, instrument};

use crate::api::ApiClient;
use crate::error::Result;

// =============================================================================
// Location
// =============================================================================

/// Path plus query string of the listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    path: String,
    query: String,
}

impl Location {
    /// Split `"/products?ram=8GB"` into path and query; a fragment is dropped.
    #[must_use]
    pub fn parse(href: &str) -> Self {
        let href = href.split_once('#').map_or(href, |(before, _)| before);
        let (path, query) = href.split_once('?').unwrap_or((href, ""));
        Self {
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query: query.to_string(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Overwrite the query string in place.
    pub fn replace_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    #[must_use]
    pub fn href(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.query.is_empty() {
            f.write_str(&self.path)
        } else {
            write!(f, "{}?{}", self.path, self.query)
        }
    }
}

// =============================================================================
// CatalogController
// =============================================================================

/// What a filter change did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was the newest and is now the current page.
    Applied(ProductPage),
    /// Same filters as the last fetch; nothing was sent.
    Unchanged,
    /// A newer fetch was issued while this one was in flight; its response
    /// was discarded.
    Stale,
}

#[derive(Debug)]
struct CatalogState {
    location: Location,
    filter: ProductFilter,
    /// Filters of the most recent fetch, cleared when that fetch fails.
    requested: Option<ProductFilter>,
    latest_token: u64,
    page: Option<ProductPage>,
}

/// Drives one product listing view.
#[derive(Debug)]
pub struct CatalogController {
    api: ApiClient,
    state: RwLock<CatalogState>,
    tokens: AtomicU64,
}

impl CatalogController {
    /// Controller for the listing at `location`; filters come from its query.
    #[must_use]
    pub fn new(api: ApiClient, location: Location) -> Self {
        let filter = ProductFilter::from_query(location.query());
        let mut location = location;
        location.replace_query(filter.to_query());
        Self {
            api,
            state: RwLock::new(CatalogState {
                location,
                filter,
                requested: None,
                latest_token: 0,
                page: None,
            }),
            tokens: AtomicU64::new(0),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[must_use]
    pub fn filter(&self) -> ProductFilter {
        self.read().filter.clone()
    }

    #[must_use]
    pub fn location(&self) -> Location {
        self.read().location.clone()
    }

    /// The page last applied, if any.
    #[must_use]
    pub fn current_page(&self) -> Option<ProductPage> {
        self.read().page.clone()
    }

    #[must_use]
    pub fn products(&self) -> Vec<Product> {
        self.read()
            .page
            .as_ref()
            .map(|page| page.products.clone())
            .unwrap_or_default()
    }

    /// Page count reported by the last applied response (0 before any).
    #[must_use]
    pub fn total_pages(&self) -> u32 {
        self.read().page.as_ref().map_or(0, |page| page.pagination.pages)
    }

    #[must_use]
    pub fn total_items(&self) -> u64 {
        self.read().page.as_ref().map_or(0, |page| page.pagination.total)
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Fetch the page for the current filters unless it was already fetched.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn load(&self) -> Result<FetchOutcome> {
        self.navigate(&FilterPatch::new(), false).await
    }

    /// Merge `patch` into the filters and fetch the matching page.
    ///
    /// Changing anything but the page sends the buyer back to page 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn set_filters(&self, patch: &FilterPatch) -> Result<FetchOutcome> {
        self.navigate(patch, false).await
    }

    /// Jump to a 1-based page.
    ///
    /// # Errors
    ///
    /// Returns a validation error for page 0 or a page past the last one
    /// reported by the server.
    pub async fn go_to_page(&self, page: u32) -> Result<FetchOutcome> {
        let pages = self.total_pages();
        let known = self.read().page.is_some();
        if page == 0 || (known && page > pages.max(1)) {
            return Err(ValidationError::PageOutOfRange { page, pages }.into());
        }
        self.navigate(&FilterPatch::new().page(page), false).await
    }

    /// Fetch the current filters again, even if nothing changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn refresh(&self) -> Result<FetchOutcome> {
        self.api.invalidate_products().await;
        self.navigate(&FilterPatch::new(), true).await
    }

    #[instrument(skip(self, patch), fields(token = tracing::field::Empty))]
    async fn navigate(&self, patch: &FilterPatch, force: bool) -> Result<FetchOutcome> {
        let (token, filter) = {
            let mut state = self.write();
            let mut next = state.filter.clone();
            next.apply(patch);
            if !force && state.requested.as_ref() == Some(&next) {
                debug!(query = %next.to_query(), "Filters unchanged; skipping fetch");
                return Ok(FetchOutcome::Unchanged);
            }

            let token = self.tokens.fetch_add(1, Ordering::SeqCst) + 1;
            state.location.replace_query(next.to_query());
            state.filter = next.clone();
            state.requested = Some(next.clone());
            state.latest_token = token;
            (token, next)
        };
        tracing::Span::current().record("token", token);

        let result = self.api.fetch_products(&filter).await;

        let mut state = self.write();
        if state.latest_token != token {
            debug!(latest = state.latest_token, "Discarding stale product page");
            return Ok(FetchOutcome::Stale);
        }
        match result {
            Ok(page) => {
                debug!(
                    products = page.products.len(),
                    total = page.pagination.total,
                    "Applied product page"
                );
                state.page = Some(page.clone());
                Ok(FetchOutcome::Applied(page))
            }
            Err(e) => {
                state.requested = None;
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use cellshop_core::DeviceId;
    use serde_json::json;
    use url::{Url, form_urlencoded};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::config::ApiConfig;
    use crate::error::StoreError;

    fn page_body(page: u32, pages: u32, names: &[&str]) -> serde_json::Value {
        let products: Vec<_> = names
            .iter()
            .map(|name| json!({"_id": name, "name": name, "slug": name, "price": "1000"}))
            .collect();
        json!({
            "success": true,
            "data": {
                "products": products,
                "pagination": {"page": page, "limit": 20, "total": u64::from(pages) * 20, "pages": pages}
            }
        })
    }

    fn controller(server: &MockServer, href: &str) -> CatalogController {
        let config = ApiConfig::new(Url::parse(&format!("{}/api", server.uri())).unwrap())
            .with_timeout(Duration::from_secs(2));
        let api = ApiClient::new(&config, DeviceId::generate()).unwrap();
        CatalogController::new(api, Location::parse(href))
    }

    #[test]
    fn test_location_parse_and_href() {
        let location = Location::parse("/products?brand=apple#top");
        assert_eq!(location.path(), "/products");
        assert_eq!(location.query(), "brand=apple");
        assert_eq!(location.href(), "/products?brand=apple");
        assert_eq!(Location::parse("").href(), "/");
    }

    #[tokio::test]
    async fn test_facet_change_resets_page_and_keeps_other_facets() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, 3, &["a"])))
            .mount(&server)
            .await;

        let catalog = controller(&server, "/products?storage=128GB+v%C3%A0+256GB&page=2");
        assert_eq!(catalog.filter().page(), 2);

        catalog
            .set_filters(&FilterPatch::new().set("ram", "8GB - 12GB"))
            .await
            .unwrap();

        let location = catalog.location();
        let pairs: Vec<(String, String)> = form_urlencoded::parse(location.query().as_bytes())
            .into_owned()
            .collect();
        assert!(pairs.contains(&("storage".into(), "128GB và 256GB".into())));
        assert!(pairs.contains(&("ram".into(), "8GB - 12GB".into())));
        assert_eq!(catalog.filter().page(), 1);
        assert!(!pairs.iter().any(|(key, _)| key == "page"));
    }

    #[tokio::test]
    async fn test_identical_filters_fetch_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, 1, &["a"])))
            .expect(1)
            .mount(&server)
            .await;

        let catalog = controller(&server, "/products");
        let patch = FilterPatch::new().set("brand", "apple");
        assert!(matches!(catalog.set_filters(&patch).await.unwrap(), FetchOutcome::Applied(_)));
        assert_eq!(catalog.set_filters(&patch).await.unwrap(), FetchOutcome::Unchanged);
        assert_eq!(catalog.load().await.unwrap(), FetchOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_out_of_order_responses_keep_latest_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .and(query_param("page", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(page_body(2, 5, &["slow"]))
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(3, 5, &["fast"])))
            .mount(&server)
            .await;

        let catalog = Arc::new(controller(&server, "/products"));
        let first_patch = FilterPatch::new().page(2);
        let (first, second) = tokio::join!(
            catalog.set_filters(&first_patch),
            async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                catalog.set_filters(&FilterPatch::new().page(3)).await
            }
        );

        assert_eq!(first.unwrap(), FetchOutcome::Stale);
        assert!(matches!(second.unwrap(), FetchOutcome::Applied(_)));
        let current = catalog.current_page().unwrap();
        assert_eq!(current.pagination.page, 3);
        assert_eq!(current.products[0].name, "fast");
        assert_eq!(catalog.filter().page(), 3);
    }

    #[tokio::test]
    async fn test_go_to_page_bounds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, 2, &["a"])))
            .mount(&server)
            .await;

        let catalog = controller(&server, "/products");
        catalog.load().await.unwrap();
        assert_eq!(catalog.total_pages(), 2);
        assert_eq!(catalog.total_items(), 40);

        let err = catalog.go_to_page(0).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Validation(ValidationError::PageOutOfRange { page: 0, .. })
        ));
        assert!(catalog.go_to_page(3).await.is_err());
        assert!(catalog.go_to_page(2).await.is_ok());
        assert_eq!(catalog.location().query(), "page=2");
    }

    #[tokio::test]
    async fn test_failed_fetch_can_be_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, 1, &["a"])))
            .mount(&server)
            .await;

        let catalog = controller(&server, "/products?brand=apple");
        assert!(catalog.load().await.is_err());
        assert!(catalog.current_page().is_none());
        assert!(matches!(catalog.load().await.unwrap(), FetchOutcome::Applied(_)));
    }

    #[tokio::test]
    async fn test_refresh_bypasses_dedup_and_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products"))
            .respond_with(ResponseTemplate::new(200).set_body_json(page_body(1, 1, &["a"])))
            .expect(2)
            .mount(&server)
            .await;

        let catalog = controller(&server, "/products");
        catalog.load().await.unwrap();
        assert!(matches!(catalog.refresh().await.unwrap(), FetchOutcome::Applied(_)));
    }
}
