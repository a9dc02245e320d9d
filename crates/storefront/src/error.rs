//! Unified error handling with Sentry integration.
//!
//! Every store operation returns `Result<T, StoreError>`. Front ends call
//! [`StoreError::report`] once per failure: it logs at a level matching the
//! kind of error and captures transport failures to Sentry.

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;
use cellshop_core::ValidationError;

/// Application-level error type for the storefront client.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The shop API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Reading or writing local storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Input rejected before any network call.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An optimistic change was rejected. The line now matches a fresh copy
    /// from the server, or was rolled back when that could not be read.
    #[error("Could not confirm change to {key}: {source}")]
    Reconciliation {
        key: String,
        #[source]
        source: ApiError,
    },

    /// The operation needs a signed-in buyer.
    #[error("Not signed in")]
    NotAuthenticated,

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Text suitable for a toast or inline message.
    ///
    /// Business refusals show the server's own wording; internals are hidden.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(err) | Self::Reconciliation { source: err, .. } => match err {
                ApiError::Business { message, .. } => message.clone(),
                ApiError::Timeout => {
                    "The shop is taking too long to respond. Please try again.".to_string()
                }
                ApiError::Unauthorized => "Please sign in to continue.".to_string(),
                _ => "Could not reach the shop. Your changes were not saved.".to_string(),
            },
            Self::NotAuthenticated => "Please sign in to continue.".to_string(),
            Self::Storage(_) => "Could not save data on this device.".to_string(),
            Self::Validation(err) => err.to_string(),
            Self::NotFound(what) => format!("{what} was not found"),
        }
    }

    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Whether the server was never reached (or never answered).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        match self {
            Self::Api(err) | Self::Reconciliation { source: err, .. } => err.is_transport(),
            _ => false,
        }
    }

    /// Log the error and capture unexpected failures to Sentry.
    pub fn report(&self) {
        match self {
            Self::Validation(_) | Self::NotFound(_) | Self::NotAuthenticated => {
                tracing::debug!(error = %self, "Operation refused");
            }
            Self::Api(ApiError::Business { .. } | ApiError::Unauthorized)
            | Self::Reconciliation {
                source: ApiError::Business { .. },
                ..
            } => {
                tracing::warn!(error = %self, "Shop API refused operation");
            }
            _ => {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    error = %self,
                    sentry_event_id = %event_id,
                    "Store operation failed"
                );
            }
        }
    }
}

/// Result type alias for `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Set the Sentry user context after sign-in.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context on sign-out.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Record a buyer action so error reports show what led up to them.
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("line", "p1/black-256")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
