//! Core types for Cellshop.
//!
//! This module provides type-safe wrappers and pure domain logic for the
//! storefront and admin clients.

pub mod cart;
pub mod coupon;
pub mod email;
pub mod filter;
pub mod id;
pub mod order;
pub mod price;
pub mod product;
pub mod status;
pub mod validation;
pub mod wishlist;

pub use cart::{CartItem, CartLineKey, CartLines, NewCartItem};
pub use coupon::{Coupon, CouponRejection, Discount};
pub use email::{Email, EmailError};
pub use filter::{FilterPatch, Pagination, ProductFilter};
pub use id::*;
pub use order::{
    CancelOrder, CancelReason, CancellationForm, CancellationMode, CancellationSubmission, Order,
    OrderLine, prepare_cancellation,
};
pub use price::{CurrencyCode, Price};
pub use product::{Product, ProductPage, ProductVariant};
pub use status::*;
pub use validation::ValidationError;
pub use wishlist::WishlistState;
