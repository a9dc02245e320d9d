//! Request and response bodies for the admin endpoints.

use cellshop_core::{CategoryId, ProductVariant, Sku, ValidationError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub product_count: u32,
}

/// Body for creating or renaming a category.
#[derive(Debug, Serialize)]
pub(crate) struct CategoryBody<'a> {
    pub name: &'a str,
}

/// A product to add to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub slug: String,
    pub category: CategoryId,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<ProductVariant>,
}

impl NewProduct {
    /// Check the fields the backend would otherwise reject.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] for an empty name or slug, or a
    /// negative price on the product or any variant.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "name" });
        }
        if self.slug.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "slug" });
        }
        let prices = std::iter::once(self.price)
            .chain(self.sale_price)
            .chain(self.variants.iter().map(|variant| variant.price));
        for price in prices {
            if price.is_sign_negative() {
                return Err(ValidationError::NegativePrice);
            }
        }
        Ok(())
    }
}

/// New stock count for one variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub sku: Sku,
    pub stock: u32,
}

/// Partial product update: price and/or stock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_price: Option<Decimal>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stock: Vec<StockLevel>,
}

impl ProductUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.price.is_none() && self.sale_price.is_none() && self.stock.is_empty()
    }

    /// # Errors
    ///
    /// Returns [`ValidationError::NegativePrice`] for a negative price.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self
            .price
            .into_iter()
            .chain(self.sale_price)
            .any(|price| price.is_sign_negative())
        {
            return Err(ValidationError::NegativePrice);
        }
        Ok(())
    }
}

/// Body for changing an order's status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusBody {
    pub order_status: cellshop_core::OrderStatus,
}

/// Body for deciding a buyer's cancellation request.
#[derive(Debug, Serialize)]
pub(crate) struct CancelReviewBody {
    pub approve: bool,
}
