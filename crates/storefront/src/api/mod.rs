//! REST API client for the shop backend.
//!
//! # Architecture
//!
//! - Every response is an envelope `{ success, data, msg }`; callers branch
//!   on `success`, not on the HTTP status
//! - Every request carries the anonymous device id as the `uid` header and,
//!   once signed in, a bearer token
//! - Product listings and details are cached in memory via `moka`
//! - A fixed per-request timeout; nothing is retried
//!
//! # Example
//!
//! ```rust,ignore
//! use cellshop_storefront::api::ApiClient;
//!
//! let client = ApiClient::new(&config.api, device_id)?;
//!
//! let page = client.fetch_products(&ProductFilter::from_query("ram=8GB")).await?;
//! let cart = client.add_cart_line(&CartLineKey::new("p1", "black-256"), 1).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::ApiClient;
pub use types::{Account, LoginSession};

use thiserror::Error;

/// Errors that can occur when talking to the shop API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport-level failure (connection refused, TLS, body read).
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The request exceeded the configured timeout. Never retried.
    #[error("Request timed out")]
    Timeout,

    /// HTTP 401 with no readable envelope.
    #[error("Not authorized")]
    Unauthorized,

    /// The server answered with `success: false`.
    #[error("{message}")]
    Business {
        /// HTTP status code of the response.
        status: u16,
        /// Message from the envelope's `msg` field.
        message: String,
    },

    /// Non-success HTTP status without a readable envelope.
    #[error("HTTP {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// First part of the response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The envelope reported success but carried no `data`.
    #[error("Response has no data")]
    MissingData,

    /// The base URL cannot carry path segments.
    #[error("Invalid base URL")]
    InvalidBaseUrl,
}

impl ApiError {
    /// Classify a `reqwest` error, pulling timeouts out into their own variant.
    #[must_use]
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }

    /// Whether the server understood the request and refused it.
    #[must_use]
    pub const fn is_business(&self) -> bool {
        matches!(self, Self::Business { .. })
    }

    /// Whether the server refused the credentials, with or without an
    /// envelope explaining why.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Business { status: 401, .. })
    }

    /// Whether the failure happened before a response arrived.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_business_error_shows_server_message() {
        let err = ApiError::Business {
            status: 400,
            message: "Sản phẩm đã hết hàng".to_string(),
        };
        assert_eq!(err.to_string(), "Sản phẩm đã hết hàng");
        assert!(err.is_business());
        assert!(!err.is_transport());
    }

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: 502,
            body: "Bad Gateway".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 502: Bad Gateway");
    }

    #[test]
    fn test_timeout_is_transport() {
        assert!(ApiError::Timeout.is_transport());
        assert_eq!(ApiError::Timeout.to_string(), "Request timed out");
    }
}
