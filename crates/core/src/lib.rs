//! Cellshop Core - Shared domain types.
//!
//! This crate provides the types used across all Cellshop components:
//! - `storefront` - Buyer-side client: cart, wishlist, catalog, orders
//! - `admin` - Dashboard client for categories, products, orders and analytics
//! - `cli` - Command-line front end over both
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no storage,
//! no HTTP clients. Cart arithmetic, wishlist set semantics, filter/query
//! encoding and the cancellation rules all live here so they can be tested
//! without a network.
//!
//! # Modules
//!
//! - [`types`] - IDs, prices, statuses, cart lines, wishlist, filters, orders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
