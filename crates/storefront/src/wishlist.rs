//! Wishlist state store.
//!
//! Anonymous buyers keep the wishlist on this device only. Signed-in changes
//! go to the server first and are committed locally once it accepts them.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cellshop_core::{ProductId, WishlistState};
use tracing::{debug, info, instrument, warn};

use crate::api::ApiClient;
use crate::error::{Result, StoreError, add_breadcrumb};
use crate::storage::{LocalStorage, keys, load_json, save_json};
use crate::sync::{KeyedLocks, MergeSummary};

/// The buyer's wishlist.
pub struct WishlistStore {
    api: ApiClient,
    storage: Arc<dyn LocalStorage>,
    state: RwLock<WishlistState>,
    locks: KeyedLocks<ProductId>,
    persist_lock: Mutex<()>,
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore")
            .field("items", &self.read().items())
            .finish_non_exhaustive()
    }
}

impl WishlistStore {
    #[must_use]
    pub fn new(api: ApiClient, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            api,
            storage,
            state: RwLock::new(WishlistState::new()),
            locks: KeyedLocks::new(),
            persist_lock: Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, WishlistState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, WishlistState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.read().contains(product_id)
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.read().count()
    }

    #[must_use]
    pub fn items(&self) -> Vec<ProductId> {
        self.read().items().to_vec()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Add a product. Returns `false` if it was already wished for, in which
    /// case nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses, or if the device copy cannot
    /// be written; the wishlist is unchanged either way.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(&self, product_id: &ProductId) -> Result<bool> {
        let _guard = self.locks.lock(product_id).await;
        if self.contains(product_id) {
            return Ok(false);
        }

        if self.api.is_authenticated() {
            self.api.add_to_wishlist(product_id).await?;
            self.write().insert(product_id.clone());
        } else {
            self.write().insert(product_id.clone());
            self.persist().inspect_err(|_| {
                self.write().remove(product_id);
            })?;
        }
        add_breadcrumb("wishlist", "Added product", Some(&[("product_id", product_id.as_str())]));
        Ok(true)
    }

    /// Remove a product. Returns `false` if it was not there.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses; the wishlist is unchanged.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove(&self, product_id: &ProductId) -> Result<bool> {
        let _guard = self.locks.lock(product_id).await;
        if !self.contains(product_id) {
            return Ok(false);
        }

        if self.api.is_authenticated() {
            self.api.remove_from_wishlist(product_id).await?;
            self.write().remove(product_id);
        } else {
            self.write().remove(product_id);
            self.persist().inspect_err(|_| {
                self.write().insert(product_id.clone());
            })?;
        }
        Ok(true)
    }

    /// Empty the wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses; the wishlist is unchanged.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let _all = self.locks.lock_all().await;
        if self.api.is_authenticated() {
            self.api.clear_wishlist().await?;
            self.write().clear();
        } else {
            let previous = std::mem::take(&mut *self.write());
            self.persist().inspect_err(|_| *self.write() = previous)?;
        }
        Ok(())
    }

    /// Populate from the server when signed in, otherwise from the device.
    ///
    /// # Errors
    ///
    /// Returns an error if the server or local storage cannot be read.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<()> {
        let _all = self.locks.lock_all().await;
        let state = if self.api.is_authenticated() {
            WishlistState::from_items(self.api.fetch_wishlist().await?)
        } else {
            self.read_mirror()?
        };
        debug!(count = state.count(), "Wishlist loaded");
        *self.write() = state;
        Ok(())
    }

    /// Union the device wishlist into the signed-in buyer's server wishlist.
    ///
    /// Products only on this device are pushed to the server, the server
    /// list is re-read, and the device mirror is deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the server wishlist cannot be read; nothing
    /// changes and the mirror is kept for the next attempt. Products the
    /// server refuses are logged and counted in the summary.
    #[instrument(skip(self))]
    pub async fn merge_local_into_server(&self) -> Result<MergeSummary> {
        if !self.api.is_authenticated() {
            return Err(StoreError::NotAuthenticated);
        }
        let _all = self.locks.lock_all().await;

        let local = self.read_mirror()?;
        let mut merged = WishlistState::from_items(self.api.fetch_wishlist().await?);
        let mut summary = MergeSummary::default();

        for product_id in merged.union_with(local.items()) {
            match self.api.add_to_wishlist(&product_id).await {
                Ok(()) => summary.record(true),
                Err(e) => {
                    warn!(product_id = %product_id, error = %e, "Server refused merged wishlist item");
                    merged.remove(&product_id);
                    summary.record(false);
                }
            }
        }

        if summary.pushed > 0 {
            match self.api.fetch_wishlist().await {
                Ok(items) => merged = WishlistState::from_items(items),
                Err(e) => warn!(error = %e, "Could not re-read wishlist after merge"),
            }
        }
        *self.write() = merged;
        self.storage.remove_item(keys::WISHLIST)?;

        info!(pushed = summary.pushed, failed = summary.failed, "Wishlist merged");
        Ok(summary)
    }

    /// Whether a device mirror is still waiting to be merged.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage cannot be read.
    pub fn has_pending_merge(&self) -> Result<bool> {
        Ok(self.storage.get_item(keys::WISHLIST)?.is_some())
    }

    /// After a failed merge, show only what the server holds, or nothing
    /// when it cannot be read either. The device mirror is left in place.
    pub async fn fall_back_to_server(&self) {
        if let Err(e) = self.load().await {
            warn!(error = %e, "Server wishlist unreadable; showing an empty wishlist");
            self.reset();
        }
    }

    /// Forget everything held in memory.
    pub fn reset(&self) {
        self.write().clear();
    }

    fn read_mirror(&self) -> Result<WishlistState> {
        Ok(load_json(self.storage.as_ref(), keys::WISHLIST)?.unwrap_or_default())
    }

    fn persist(&self) -> Result<()> {
        let _io = self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let state = self.read().clone();
        save_json(self.storage.as_ref(), keys::WISHLIST, &state)?;
        Ok(())
    }
}
