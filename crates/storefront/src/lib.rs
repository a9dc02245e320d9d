//! Cellshop Storefront library.
//!
//! Buyer-side client for the shop REST API: cart and wishlist stores that
//! work signed out and merge on sign-in, the product listing controller,
//! order cancellation and the checkout summary.
//!
//! Everything hangs off a [`Session`]; open one per buyer.
//!
//! ```rust,ignore
//! let config = StorefrontConfig::from_env()?;
//! let session = Session::from_config(&config).await?;
//! session.wishlist().add(&ProductId::new("iphone-15")).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod error;
pub mod orders;
pub mod session;
pub mod storage;
pub mod sync;
pub mod wishlist;

pub use api::{ApiClient, ApiError};
pub use cart::CartStore;
pub use catalog::{CatalogController, FetchOutcome, Location};
pub use checkout::{CheckoutDraft, CheckoutSummary};
pub use config::{ApiConfig, ConfigError, StorefrontConfig};
pub use error::StoreError;
pub use orders::{CancellationOutcome, OrderBook};
pub use session::{LoginOutcome, Session};
pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError};
pub use wishlist::WishlistStore;
