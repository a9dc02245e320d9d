//! One buyer session: API client, local storage and the stores built on them.
//!
//! Nothing here is global. Two sessions (e.g. two tests) never share state.

use std::sync::{Arc, PoisonError, RwLock};

use cellshop_core::{DeviceId, Email};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument, warn};

use crate::api::{Account, ApiClient};
use crate::cart::CartStore;
use crate::catalog::{CatalogController, Location};
use crate::checkout::CheckoutDraft;
use crate::config::{ApiConfig, StorefrontConfig};
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::orders::OrderBook;
use crate::storage::{FileStorage, LocalStorage, keys, load_or_create_device_id};
use crate::sync::MergeSummary;
use crate::wishlist::WishlistStore;

/// What happened when the buyer signed in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginOutcome {
    pub account: Account,
    /// Present when the device's anonymous state was merged.
    pub cart_merge: Option<MergeSummary>,
    pub wishlist_merge: Option<MergeSummary>,
}

/// A buyer session.
pub struct Session {
    api: ApiClient,
    storage: Arc<dyn LocalStorage>,
    cart: Arc<CartStore>,
    wishlist: Arc<WishlistStore>,
    orders: Arc<OrderBook>,
    account: RwLock<Option<Account>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("api", &self.api)
            .field("account", &self.account())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Open a session backed by the state directory from `config`.
    ///
    /// # Errors
    ///
    /// See [`Session::open`].
    pub async fn from_config(config: &StorefrontConfig) -> Result<Self> {
        let storage: Arc<dyn LocalStorage> = Arc::new(FileStorage::new(&config.state_dir));
        Self::open(&config.api, storage).await
    }

    /// Open a session: load or create the device id, restore a saved token,
    /// and load the cart and wishlist.
    ///
    /// A saved token the server no longer accepts is discarded and the
    /// session starts anonymous. When signed in, a device copy left behind
    /// by an earlier failed merge is merged now.
    ///
    /// # Errors
    ///
    /// Returns an error if local storage fails or the stores cannot be loaded.
    #[instrument(skip_all)]
    pub async fn open(api_config: &ApiConfig, storage: Arc<dyn LocalStorage>) -> Result<Self> {
        let device_id = load_or_create_device_id(storage.as_ref())?;
        let api = ApiClient::new(api_config, device_id)?;

        let session = Self {
            cart: Arc::new(CartStore::new(api.clone(), Arc::clone(&storage))),
            wishlist: Arc::new(WishlistStore::new(api.clone(), Arc::clone(&storage))),
            orders: Arc::new(OrderBook::new(api.clone())),
            api,
            storage,
            account: RwLock::new(None),
        };

        session.restore_token().await?;
        if session.is_authenticated() {
            session.sync_signed_in(false).await?;
        } else {
            session.cart.load().await?;
            session.wishlist.load().await?;
        }

        info!(
            device_id = %device_id,
            authenticated = session.is_authenticated(),
            "Session opened"
        );
        Ok(session)
    }

    async fn restore_token(&self) -> Result<()> {
        let Some(token) = self
            .storage
            .get_item(keys::AUTH_TOKEN)?
            .filter(|token| !token.trim().is_empty())
        else {
            return Ok(());
        };

        self.api.set_token(Some(SecretString::from(token.trim().to_string())));
        match self.api.me().await {
            Ok(account) => {
                set_sentry_user(&account.id, None);
                self.set_account(Some(account));
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Saved token was rejected; continuing signed out");
                self.api.set_token(None);
                self.storage.remove_item(keys::AUTH_TOKEN)?;
            }
            Err(e) => warn!(error = %e, "Could not verify saved token"),
        }
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    #[must_use]
    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    #[must_use]
    pub fn device_id(&self) -> DeviceId {
        self.api.device_id()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.api.is_authenticated()
    }

    #[must_use]
    pub fn account(&self) -> Option<Account> {
        self.account
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn cart(&self) -> Arc<CartStore> {
        Arc::clone(&self.cart)
    }

    #[must_use]
    pub fn wishlist(&self) -> Arc<WishlistStore> {
        Arc::clone(&self.wishlist)
    }

    #[must_use]
    pub fn orders(&self) -> Arc<OrderBook> {
        Arc::clone(&self.orders)
    }

    /// A listing controller for `location`.
    #[must_use]
    pub fn catalog(&self, location: Location) -> CatalogController {
        CatalogController::new(self.api.clone(), location)
    }

    /// A checkout draft over the current cart contents.
    #[must_use]
    pub fn checkout(&self) -> CheckoutDraft {
        CheckoutDraft::new(self.api.clone(), self.cart.snapshot())
    }

    fn set_account(&self, account: Option<Account>) {
        *self.account.write().unwrap_or_else(PoisonError::into_inner) = account;
    }

    // =========================================================================
    // Sign-in
    // =========================================================================

    /// Sign in and, coming from an anonymous session, merge this device's
    /// wishlist and cart into the account.
    ///
    /// A merge that fails is reported and leaves the device copy in place
    /// for the next sign-in or session open; the store shows only the server
    /// copy meanwhile. Signing in still succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected, the token cannot
    /// be saved, or an already signed-in account cannot be reloaded.
    #[instrument(skip(self, email, password), fields(email = %email.masked()))]
    pub async fn login(&self, email: &Email, password: &SecretString) -> Result<LoginOutcome> {
        let was_anonymous = !self.is_authenticated();
        let login = self.api.login(email, password).await?;

        self.storage
            .set_item(keys::AUTH_TOKEN, login.token.expose_secret())?;
        self.api.set_token(Some(login.token));
        set_sentry_user(&login.account.id, Some(email.as_str()));
        self.set_account(Some(login.account.clone()));
        self.orders.reset();

        let (wishlist_merge, cart_merge) = self.sync_signed_in(was_anonymous).await?;

        info!(user_id = %login.account.id, "Signed in");
        Ok(LoginOutcome {
            account: login.account,
            cart_merge,
            wishlist_merge,
        })
    }

    /// Bring both stores in line with the account. A store is merged when
    /// `merge` is set or its device mirror is still waiting; otherwise it is
    /// simply loaded from the server.
    async fn sync_signed_in(&self, merge: bool) -> Result<(Option<MergeSummary>, Option<MergeSummary>)> {
        let wishlist_merge = if merge || self.wishlist.has_pending_merge()? {
            match self.wishlist.merge_local_into_server().await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    e.report();
                    self.wishlist.fall_back_to_server().await;
                    None
                }
            }
        } else {
            self.wishlist.load().await?;
            None
        };

        let cart_merge = if merge || self.cart.has_pending_merge()? {
            match self.cart.merge_local_into_server().await {
                Ok(summary) => Some(summary),
                Err(e) => {
                    e.report();
                    self.cart.fall_back_to_server().await;
                    None
                }
            }
        } else {
            self.cart.load().await?;
            None
        };

        Ok((wishlist_merge, cart_merge))
    }

    /// Sign out. Server data stays on the server; this device starts over
    /// with an empty anonymous cart and wishlist.
    ///
    /// # Errors
    ///
    /// Returns an error if the saved token cannot be removed.
    #[instrument(skip(self))]
    pub fn logout(&self) -> Result<()> {
        self.api.set_token(None);
        self.storage.remove_item(keys::AUTH_TOKEN)?;
        self.storage.remove_item(keys::CART)?;
        self.storage.remove_item(keys::WISHLIST)?;
        self.cart.reset();
        self.wishlist.reset();
        self.orders.reset();
        self.set_account(None);
        clear_sentry_user();
        info!("Signed out");
        Ok(())
    }
}
