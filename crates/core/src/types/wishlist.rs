//! Wishlist state: an ordered set of product ids.

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::id::ProductId;

/// Ordered, duplicate-free list of wished-for products.
///
/// Membership checks go through a hash set kept beside the list. The count
/// is never stored separately; it is always the list length.
#[derive(Debug, Clone, Default)]
pub struct WishlistState {
    items: Vec<ProductId>,
    index: HashSet<ProductId>,
}

impl WishlistState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list that may contain duplicates; later duplicates are
    /// dropped.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = ProductId>) -> Self {
        let mut state = Self::new();
        for item in items {
            state.insert(item);
        }
        state
    }

    /// Add a product. Returns `false` when it was already present.
    pub fn insert(&mut self, product_id: ProductId) -> bool {
        if self.index.contains(&product_id) {
            return false;
        }
        self.index.insert(product_id.clone());
        self.items.push(product_id);
        true
    }

    /// Remove a product. Returns `false` when it was absent.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        if !self.index.remove(product_id) {
            return false;
        }
        self.items.retain(|item| item != product_id);
        true
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.index.contains(product_id)
    }

    #[must_use]
    pub fn items(&self) -> &[ProductId] {
        &self.items
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Union with another list, keeping `self`'s order first.
    /// Returns the ids that were new to `self`.
    pub fn union_with(&mut self, other: &[ProductId]) -> Vec<ProductId> {
        other
            .iter()
            .filter(|id| self.insert((*id).clone()))
            .cloned()
            .collect()
    }
}

impl PartialEq for WishlistState {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl Eq for WishlistState {}

#[derive(Serialize)]
struct WishlistRef<'a> {
    items: &'a [ProductId],
    count: usize,
}

#[derive(Deserialize)]
struct WishlistOwned {
    #[serde(default)]
    items: Vec<ProductId>,
}

// Persisted as `{"items": [...], "count": n}`; `count` is recomputed on load.
impl Serialize for WishlistState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        WishlistRef {
            items: &self.items,
            count: self.count(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for WishlistState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let owned = WishlistOwned::deserialize(deserializer)?;
        Ok(Self::from_items(owned.items))
    }
}
