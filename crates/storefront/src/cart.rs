//! Cart state store.
//!
//! Changes are applied locally first. While the buyer is anonymous the cart
//! lives only on this device and is mirrored to local storage after every
//! change. Once signed in, every change is sent to the server and the line
//! is then replaced by the server's copy; if the server refuses, the line is
//! reconciled against a fresh `GET /cart`, or rolled back when that fails
//! too, and the caller gets [`StoreError::Reconciliation`] either way.
//!
//! Only the line being changed is ever overwritten by a server response, so
//! concurrent changes to other lines are never clobbered.

use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cellshop_core::{CartItem, CartLineKey, CartLines, NewCartItem};
use rust_decimal::Decimal;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, ApiError};
use crate::error::{Result, StoreError, add_breadcrumb};
use crate::storage::{LocalStorage, keys, load_json, save_json};
use crate::sync::{KeyedLocks, MergeSummary};

/// The buyer's cart.
pub struct CartStore {
    api: ApiClient,
    storage: Arc<dyn LocalStorage>,
    lines: RwLock<CartLines>,
    locks: KeyedLocks<CartLineKey>,
    persist_lock: Mutex<()>,
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("lines", &*self.read())
            .finish_non_exhaustive()
    }
}

impl CartStore {
    /// An empty cart. Call [`CartStore::load`] to populate it.
    #[must_use]
    pub fn new(api: ApiClient, storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            api,
            storage,
            lines: RwLock::new(CartLines::new()),
            locks: KeyedLocks::new(),
            persist_lock: Mutex::new(()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, CartLines> {
        self.lines.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CartLines> {
        self.lines.write().unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Queries
    // =========================================================================

    #[must_use]
    pub fn snapshot(&self) -> CartLines {
        self.read().clone()
    }

    #[must_use]
    pub fn get(&self, key: &CartLineKey) -> Option<CartItem> {
        self.read().get(key).cloned()
    }

    #[must_use]
    pub fn total_amount(&self) -> Decimal {
        self.read().total_amount()
    }

    /// Total units in the cart.
    #[must_use]
    pub fn cart_count(&self) -> u64 {
        self.read().cart_count()
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.read().line_count()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add a line, or add to the quantity of an existing one.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] for a zero quantity or negative price,
    ///   before anything changes
    /// - [`StoreError::Reconciliation`] when the server refuses; the line
    ///   now matches a fresh `GET /cart`, or is rolled back when that could
    ///   not be read either
    /// - [`StoreError::Storage`] when the anonymous mirror cannot be written;
    ///   the line is rolled back
    #[instrument(skip(self, item), fields(line = %item.key(), quantity = item.quantity))]
    pub async fn add_item(&self, item: NewCartItem) -> Result<()> {
        item.validate()?;
        let key = item.key();
        let quantity = item.quantity;
        let _guard = self.locks.lock(&key).await;

        let previous = {
            let mut lines = self.write();
            let previous = lines.get(&key).cloned();
            lines.add(item.into_item());
            previous
        };
        add_breadcrumb("cart", "Added item", Some(&[("line", key.to_string().as_str())]));

        if !self.api.is_authenticated() {
            return self.persist_or_restore(&key, previous);
        }

        match self.api.add_cart_line(&key, quantity).await {
            Ok(server) => {
                self.adopt_line(&key, &server);
                Ok(())
            }
            Err(err) => Err(self.recover(&key, previous, err).await),
        }
    }

    /// Change a line's quantity by `delta`.
    ///
    /// A change that would leave fewer than one unit is refused; removing a
    /// line is always explicit.
    ///
    /// # Errors
    ///
    /// Same as [`CartStore::add_item`]; an unknown line is a validation error.
    #[instrument(skip(self), fields(line = %key))]
    pub async fn update_quantity(&self, key: &CartLineKey, delta: i32) -> Result<u32> {
        let _guard = self.locks.lock(key).await;

        let (previous, quantity) = {
            let mut lines = self.write();
            let previous = lines.get(key).cloned();
            let quantity = lines.adjust(key, delta)?;
            (previous, quantity)
        };
        if delta == 0 {
            return Ok(quantity);
        }

        if !self.api.is_authenticated() {
            self.persist_or_restore(key, previous)?;
            return Ok(quantity);
        }

        match self.api.update_cart_line(key, delta).await {
            Ok(server) => {
                self.adopt_line(key, &server);
                Ok(self.get(key).map_or(quantity, |line| line.quantity))
            }
            Err(err) => Err(self.recover(key, previous, err).await),
        }
    }

    /// Remove a line. Removing a line that is not in the cart does nothing.
    ///
    /// # Errors
    ///
    /// Same reconciliation errors as [`CartStore::add_item`].
    #[instrument(skip(self), fields(line = %key))]
    pub async fn remove_item(&self, key: &CartLineKey) -> Result<()> {
        let _guard = self.locks.lock(key).await;

        let Some(previous) = self.write().remove(key) else {
            debug!("Line not in cart");
            return Ok(());
        };
        add_breadcrumb("cart", "Removed item", Some(&[("line", key.to_string().as_str())]));

        if !self.api.is_authenticated() {
            return self.persist_or_restore(key, Some(previous));
        }

        match self.api.remove_cart_line(key).await {
            Ok(Some(server)) => {
                self.adopt_line(key, &server);
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(err) => Err(self.recover(key, Some(previous), err).await),
        }
    }

    /// Empty the cart. Waits for every in-flight line change to finish and
    /// holds new ones back until it is done.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Reconciliation`] if the server refuses; the cart
    /// then matches the server, or its previous contents when the server is
    /// unreachable.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<()> {
        let _all = self.locks.lock_all().await;

        let previous = std::mem::take(&mut *self.write());
        add_breadcrumb("cart", "Cleared cart", None);

        if !self.api.is_authenticated() {
            return self.persist().inspect_err(|_| *self.write() = previous);
        }

        let Err(err) = self.api.clear_cart().await else {
            return Ok(());
        };
        warn!(error = %err, "Server refused to clear cart; reconciling");
        match self.api.fetch_cart().await {
            Ok(server) => *self.write() = server,
            Err(refetch) => {
                warn!(error = %refetch, "Refetch failed; restoring previous cart");
                *self.write() = previous;
            }
        }
        Err(StoreError::Reconciliation {
            key: "cart".to_string(),
            source: err,
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Populate the cart: from the server when signed in, otherwise from the
    /// device mirror.
    ///
    /// # Errors
    ///
    /// Returns an error if the server or local storage cannot be read.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<()> {
        let _all = self.locks.lock_all().await;

        let lines = if self.api.is_authenticated() {
            self.api.fetch_cart().await?
        } else {
            self.read_mirror()?
        };
        debug!(lines = lines.line_count(), "Cart loaded");
        *self.write() = lines;
        Ok(())
    }

    /// Push the device mirror into the signed-in buyer's server cart.
    ///
    /// Lines only on this device are added; lines on both sides end up with
    /// the larger of the two quantities. The server cart is authoritative
    /// afterwards and the device mirror is deleted.
    ///
    /// # Errors
    ///
    /// Returns an error if the server cart cannot be read; nothing changes
    /// and the mirror is kept for the next attempt. Individual lines the
    /// server refuses are logged and counted in the summary.
    #[instrument(skip(self))]
    pub async fn merge_local_into_server(&self) -> Result<MergeSummary> {
        if !self.api.is_authenticated() {
            return Err(StoreError::NotAuthenticated);
        }
        let _all = self.locks.lock_all().await;

        let local = self.read_mirror()?;
        let mut server = self.api.fetch_cart().await?;
        let mut summary = MergeSummary::default();

        for line in local.items() {
            let key = line.key();
            let server_quantity = server.get(&key).map_or(0, |s| s.quantity);
            if line.quantity <= server_quantity {
                continue;
            }
            let result = if server_quantity == 0 {
                self.api.add_cart_line(&key, line.quantity).await
            } else {
                let delta = i32::try_from(line.quantity - server_quantity).unwrap_or(i32::MAX);
                self.api.update_cart_line(&key, delta).await
            };
            match result {
                Ok(updated) => {
                    server = updated;
                    summary.record(true);
                }
                Err(e) => {
                    warn!(line = %key, error = %e, "Server refused merged cart line");
                    summary.record(false);
                }
            }
        }

        let merged = if summary.pushed > 0 {
            self.api.fetch_cart().await.unwrap_or(server)
        } else {
            server
        };
        *self.write() = merged;
        self.storage.remove_item(keys::CART)?;

        info!(pushed = summary.pushed, failed = summary.failed, "Cart merged");
        Ok(summary)
    }

    /// Whether a device mirror is still waiting to be merged.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage cannot be read.
    pub fn has_pending_merge(&self) -> Result<bool> {
        Ok(self.storage.get_item(keys::CART)?.is_some())
    }

    /// After a failed merge, show only what the server holds, or nothing
    /// when it cannot be read either. The device mirror is left in place.
    pub async fn fall_back_to_server(&self) {
        if let Err(e) = self.load().await {
            warn!(error = %e, "Server cart unreadable; showing an empty cart");
            self.reset();
        }
    }

    /// Forget every line held in memory.
    pub fn reset(&self) {
        self.write().clear();
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn adopt_line(&self, key: &CartLineKey, server: &CartLines) {
        self.write().restore(key, server.get(key).cloned());
    }

    /// Reconcile one line after the server refused a change to it.
    async fn recover(
        &self,
        key: &CartLineKey,
        previous: Option<CartItem>,
        err: ApiError,
    ) -> StoreError {
        warn!(line = %key, error = %err, "Cart change rejected; reconciling with server");
        match self.api.fetch_cart().await {
            Ok(server) => self.adopt_line(key, &server),
            Err(refetch) => {
                warn!(line = %key, error = %refetch, "Refetch failed; rolling back line");
                self.write().restore(key, previous);
            }
        }
        StoreError::Reconciliation {
            key: key.to_string(),
            source: err,
        }
    }

    fn read_mirror(&self) -> Result<CartLines> {
        Ok(load_json::<CartLines>(self.storage.as_ref(), keys::CART)?
            .map(|stored| CartLines::from_items(stored.items().iter().cloned()))
            .unwrap_or_default())
    }

    fn persist(&self) -> Result<()> {
        let _io = self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let lines = self.snapshot();
        save_json(self.storage.as_ref(), keys::CART, &lines)?;
        Ok(())
    }

    /// Mirror the cart; memory never stays ahead of a failed write.
    fn persist_or_restore(&self, key: &CartLineKey, previous: Option<CartItem>) -> Result<()> {
        self.persist().inspect_err(|e| {
            warn!(line = %key, error = %e, "Could not save cart; undoing change");
            self.write().restore(key, previous);
        })
    }
}
