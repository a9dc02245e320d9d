//! Subcommand implementations.
//!
//! Results go to stdout; logs go to stderr.

#![allow(clippy::print_stdout)]

use cellshop_core::{Price, ValidationError};
use cellshop_storefront::StoreError;
use rust_decimal::Decimal;
use thiserror::Error;

pub mod account;
pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;
pub mod wishlist;

/// Errors raised by the commands themselves.
#[derive(Debug, Error)]
pub enum CliError {
    /// A storefront operation failed; shown with its buyer-facing message.
    #[error("{}", .0.user_message())]
    Store(#[from] StoreError),

    /// An admin operation failed.
    #[error(transparent)]
    Admin(#[from] cellshop_admin::AdminError),

    /// A command-line value could not be understood.
    #[error("Invalid {field}: {message}")]
    InvalidArgument {
        field: &'static str,
        message: String,
    },
}

impl From<ValidationError> for CliError {
    fn from(err: ValidationError) -> Self {
        Self::Store(StoreError::Validation(err))
    }
}

impl CliError {
    fn invalid(field: &'static str, message: impl std::fmt::Display) -> Self {
        Self::InvalidArgument {
            field,
            message: message.to_string(),
        }
    }
}

/// Format an amount in the shop currency.
fn money(amount: Decimal) -> String {
    Price::new(amount, cellshop_core::CurrencyCode::default()).display()
}

/// Log and hand back a storefront error so Sentry sees transport failures.
fn reported(err: StoreError) -> CliError {
    err.report();
    CliError::Store(err)
}
