//! Cellshop Admin library.
//!
//! Dashboard client for the shop backend: category and product management,
//! order status changes, cancellation review and sales analytics.
//!
//! # Security
//!
//! This crate holds HIGH PRIVILEGE access through the admin token. Load it
//! with [`AdminConfig::from_env`], which rejects placeholder tokens.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use analytics::{MonthlyRevenue, StatusCount, orders_by_status, revenue_by_month};
pub use client::AdminClient;
pub use config::{AdminConfig, ConfigError};
pub use error::{AdminError, Result};
pub use types::{Category, NewProduct, ProductUpdate, StockLevel};
