//! Unified error handling for admin.

use cellshop_core::{OrderId, ValidationError};
use cellshop_storefront::ApiError;
use thiserror::Error;

use crate::config::ConfigError;

/// Error type for admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Shop API call failed.
    #[error("Shop API error: {0}")]
    Api(#[from] ApiError),

    /// Rejected before anything was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The order has no cancellation request waiting for review.
    #[error("Order {0} has no pending cancellation request")]
    NoPendingCancelRequest(OrderId),
}

impl AdminError {
    /// Log the error. Transport failures also go to Sentry.
    pub fn report(&self) {
        match self {
            Self::Api(api) if api.is_transport() => {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    error = %self,
                    sentry_event_id = %event_id,
                    "Admin request error"
                );
            }
            _ => tracing::warn!(error = %self, "Admin operation rejected"),
        }
    }
}

/// Result type alias for admin operations.
pub type Result<T> = std::result::Result<T, AdminError>;
