//! Catalog types as the storefront consumes them.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::filter::Pagination;
use super::id::{CategoryId, ProductId, Sku};

/// A purchasable variant of a product (color × storage, typically).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductVariant {
    pub sku: Sku,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub storage: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: u32,
    #[serde(default)]
    pub image: Option<String>,
}

impl ProductVariant {
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub category: Option<CategoryId>,
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub variants: Vec<ProductVariant>,
}

impl Product {
    /// Price the buyer actually pays when no variant is chosen.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.sale_price
            .filter(|sale| *sale < self.price)
            .unwrap_or(self.price)
    }

    #[must_use]
    pub fn variant(&self, sku: &Sku) -> Option<&ProductVariant> {
        self.variants.iter().find(|variant| &variant.sku == sku)
    }
}

/// One page of a product listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub pagination: Pagination,
}
