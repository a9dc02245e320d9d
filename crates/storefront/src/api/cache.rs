//! Cache types for catalog responses.

use cellshop_core::{Product, ProductPage};

/// Cache key prefixes. Listing keys carry the full API query string so two
/// filter sets never share an entry.
pub const PRODUCTS_PREFIX: &str = "products:";
pub const PRODUCT_PREFIX: &str = "product:";

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(ProductPage),
    Product(Box<Product>),
}

#[must_use]
pub fn products_key(api_query: &str) -> String {
    format!("{PRODUCTS_PREFIX}{api_query}")
}

#[must_use]
pub fn product_key(slug: &str) -> String {
    format!("{PRODUCT_PREFIX}{slug}")
}
