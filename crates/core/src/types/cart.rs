//! Cart line items and the derived totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ProductId, Sku};
use super::validation::ValidationError;

/// Identity of a cart line: the same product in two SKUs is two lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CartLineKey {
    pub product_id: ProductId,
    pub sku: Sku,
}

impl CartLineKey {
    #[must_use]
    pub fn new(product_id: impl Into<ProductId>, sku: impl Into<Sku>) -> Self {
        Self {
            product_id: product_id.into(),
            sku: sku.into(),
        }
    }
}

impl std::fmt::Display for CartLineKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.product_id, self.sku)
    }
}

/// A single cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: ProductId,
    pub sku: Sku,
    pub name: String,
    /// Unit price captured when the item was added.
    pub price: Decimal,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_image: Option<String>,
}

impl CartItem {
    #[must_use]
    pub fn key(&self) -> CartLineKey {
        CartLineKey::new(self.product_id.clone(), self.sku.clone())
    }

    /// `price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// Input for adding an item to the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartItem {
    pub product_id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub color: Option<String>,
    pub variant_image: Option<String>,
}

impl NewCartItem {
    /// Check quantity and price before anything touches the cart.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::QuantityTooLow`] for a zero quantity and
    /// [`ValidationError::NegativePrice`] for a negative price snapshot.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.quantity == 0 {
            return Err(ValidationError::QuantityTooLow);
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(ValidationError::NegativePrice);
        }
        Ok(())
    }

    #[must_use]
    pub fn key(&self) -> CartLineKey {
        CartLineKey::new(self.product_id.clone(), self.sku.clone())
    }

    #[must_use]
    pub fn into_item(self) -> CartItem {
        CartItem {
            product_id: self.product_id,
            sku: self.sku,
            name: self.name,
            price: self.price,
            quantity: self.quantity,
            color: self.color,
            variant_image: self.variant_image,
        }
    }
}

/// Ordered set of cart lines, unique by [`CartLineKey`].
///
/// Order is insertion order so the cart renders stably.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartLines(Vec<CartItem>);

impl CartLines {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Build from possibly-duplicated lines (e.g. a hand-edited local mirror).
    /// Duplicates are folded into the first occurrence; zero-quantity and
    /// negative-price lines are dropped.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut lines = Self::new();
        for item in items {
            if item.quantity == 0 || item.price < Decimal::ZERO {
                continue;
            }
            let key = item.key();
            if let Some(existing) = lines.get_mut(&key) {
                existing.quantity = existing.quantity.saturating_add(item.quantity);
            } else {
                lines.0.push(item);
            }
        }
        lines
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.0
    }

    #[must_use]
    pub fn get(&self, key: &CartLineKey) -> Option<&CartItem> {
        self.0
            .iter()
            .find(|item| item.product_id == key.product_id && item.sku == key.sku)
    }

    fn get_mut(&mut self, key: &CartLineKey) -> Option<&mut CartItem> {
        self.0
            .iter_mut()
            .find(|item| item.product_id == key.product_id && item.sku == key.sku)
    }

    /// Insert a new line or add to the quantity of an existing one.
    pub fn add(&mut self, item: CartItem) {
        let key = item.key();
        if let Some(existing) = self.get_mut(&key) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.0.push(item);
        }
    }

    /// Adjust a line's quantity by `delta`.
    ///
    /// # Errors
    ///
    /// Fails without changing anything when the line is missing or the
    /// resulting quantity would be below 1.
    pub fn adjust(&mut self, key: &CartLineKey, delta: i32) -> Result<u32, ValidationError> {
        let line = self.get_mut(key).ok_or(ValidationError::LineNotInCart)?;
        let resulting = i64::from(line.quantity) + i64::from(delta);
        if resulting < 1 {
            return Err(ValidationError::QuantityWouldDropBelowOne { resulting });
        }
        line.quantity = u32::try_from(resulting).unwrap_or(u32::MAX);
        Ok(line.quantity)
    }

    /// Remove a line, returning it if it was present.
    pub fn remove(&mut self, key: &CartLineKey) -> Option<CartItem> {
        let index = self
            .0
            .iter()
            .position(|item| item.product_id == key.product_id && item.sku == key.sku)?;
        Some(self.0.remove(index))
    }

    /// Put a line back exactly as it was (or drop it when `previous` is `None`).
    pub fn restore(&mut self, key: &CartLineKey, previous: Option<CartItem>) {
        match previous {
            Some(item) => {
                if let Some(existing) = self.get_mut(key) {
                    *existing = item;
                } else {
                    self.0.push(item);
                }
            }
            None => {
                self.remove(key);
            }
        }
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of `price × quantity` over every line.
    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        self.0.iter().map(CartItem::line_total).sum()
    }

    /// Total number of units in the cart (what the header badge shows).
    #[must_use]
    pub fn cart_count(&self) -> u64 {
        self.0.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(product: &str, sku: &str, price: i64, quantity: u32) -> CartItem {
        CartItem {
            product_id: ProductId::new(product),
            sku: Sku::new(sku),
            name: format!("{product} {sku}"),
            price: Decimal::new(price, 0),
            quantity,
            color: None,
            variant_image: None,
        }
    }

    #[test]
    fn test_add_increments_existing_line() {
        let mut lines = CartLines::new();
        lines.add(item("p1", "black-128", 100, 1));
        lines.add(item("p1", "black-128", 100, 2));
        lines.add(item("p1", "white-128", 100, 1));

        assert_eq!(lines.line_count(), 2);
        assert_eq!(lines.cart_count(), 4);
        assert_eq!(lines.total_amount(), Decimal::new(400, 0));
    }

    #[test]
    fn test_total_matches_sum_over_any_sequence() {
        let mut lines = CartLines::new();
        let ops: [(&str, bool); 7] = [
            ("a", true),
            ("b", true),
            ("a", true),
            ("c", true),
            ("b", false),
            ("a", false),
            ("d", true),
        ];
        for (i, (product, add)) in ops.into_iter().enumerate() {
            if add {
                lines.add(item(product, "s", 10 * (i64::try_from(i).unwrap() + 1), 1));
            } else {
                lines.remove(&CartLineKey::new(product, "s"));
            }
            let expected: Decimal = lines
                .items()
                .iter()
                .map(|l| l.price * Decimal::from(l.quantity))
                .sum();
            assert_eq!(lines.total_amount(), expected);
            assert!(!lines.total_amount().is_sign_negative());
        }
        assert_eq!(lines.line_count(), 2);
    }

    #[test]
    fn test_adjust_rejects_dropping_to_zero() {
        let mut lines = CartLines::new();
        lines.add(item("p1", "s", 5, 2));
        let key = CartLineKey::new("p1", "s");

        assert_eq!(lines.adjust(&key, -1).unwrap(), 1);
        assert_eq!(
            lines.adjust(&key, -1),
            Err(ValidationError::QuantityWouldDropBelowOne { resulting: 0 })
        );
        assert_eq!(lines.get(&key).unwrap().quantity, 1);
    }

    #[test]
    fn test_adjust_missing_line() {
        let mut lines = CartLines::new();
        assert_eq!(
            lines.adjust(&CartLineKey::new("x", "y"), 1),
            Err(ValidationError::LineNotInCart)
        );
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut lines = CartLines::new();
        lines.add(item("p1", "s", 5, 1));
        assert!(lines.remove(&CartLineKey::new("p2", "s")).is_none());
        assert_eq!(lines.line_count(), 1);
    }

    #[test]
    fn test_restore_previous_state() {
        let mut lines = CartLines::new();
        lines.add(item("p1", "s", 5, 1));
        let key = CartLineKey::new("p1", "s");
        let before = lines.get(&key).cloned();
        lines.add(item("p1", "s", 5, 3));
        lines.restore(&key, before);
        assert_eq!(lines.get(&key).unwrap().quantity, 1);

        lines.add(item("p2", "s", 5, 1));
        lines.restore(&CartLineKey::new("p2", "s"), None);
        assert_eq!(lines.line_count(), 1);
    }

    #[test]
    fn test_from_items_folds_duplicates() {
        let lines = CartLines::from_items([
            item("p1", "s", 5, 1),
            item("p1", "s", 5, 2),
            item("p2", "s", 5, 0),
        ]);
        assert_eq!(lines.line_count(), 1);
        assert_eq!(lines.cart_count(), 3);
    }

    #[test]
    fn test_from_items_drops_negative_prices() {
        let lines = CartLines::from_items([
            item("p1", "s", 200, 1),
            item("p2", "s", -5_000, 3),
            item("p3", "s", 0, 1),
        ]);
        assert_eq!(lines.line_count(), 2);
        assert!(lines.get(&CartLineKey::new("p2", "s")).is_none());
        assert_eq!(lines.total_amount(), Decimal::new(200, 0));
    }

    #[test]
    fn test_validate_new_item() {
        let mut new = NewCartItem {
            product_id: ProductId::new("p1"),
            sku: Sku::new("s"),
            name: "Phone".into(),
            price: Decimal::new(10, 0),
            quantity: 0,
            color: None,
            variant_image: None,
        };
        assert_eq!(new.validate(), Err(ValidationError::QuantityTooLow));
        new.quantity = 1;
        new.price = Decimal::new(-1, 0);
        assert_eq!(new.validate(), Err(ValidationError::NegativePrice));
        new.price = Decimal::ZERO;
        assert!(new.validate().is_ok());
    }

    #[test]
    fn test_wire_shape_is_camel_case() {
        let json = serde_json::to_value(item("p1", "s", 5, 1)).unwrap();
        assert_eq!(json["productId"], "p1");
        assert_eq!(json["price"], "5");
        assert!(json.get("color").is_none());
    }
}
