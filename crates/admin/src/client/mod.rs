//! Admin API client (HIGH PRIVILEGE).
//!
//! # Security
//!
//! The admin token can rename and delete categories, change prices and stock,
//! move orders between statuses and decide cancellation requests. Keep it out
//! of buyer-facing processes.
//!
//! # Example
//!
//! ```rust,ignore
//! use cellshop_admin::{AdminClient, AdminConfig};
//!
//! let client = AdminClient::new(&AdminConfig::from_env()?)?;
//! let categories = client.list_categories().await?;
//! client.update_order_status(&order, OrderStatus::Preparing).await?;
//! ```

use std::sync::Arc;

use cellshop_core::DeviceId;
use cellshop_storefront::{ApiClient, ApiError};
use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::config::AdminConfig;
use crate::error::Result;

mod catalog;
mod orders;

/// Admin API client.
///
/// Shares the transport, envelope handling and timeout of the storefront
/// [`ApiClient`] with the admin token installed.
#[derive(Clone)]
pub struct AdminClient {
    inner: Arc<AdminClientInner>,
}

struct AdminClientInner {
    api: ApiClient,
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("api", &self.inner.api)
            .finish()
    }
}

impl AdminClient {
    /// Create a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &AdminConfig) -> Result<Self> {
        let api = ApiClient::new(&config.api, DeviceId::generate())?;
        api.set_token(Some(config.token()));
        debug!(device_id = %api.device_id(), "Admin client ready");
        Ok(Self::from_api(api))
    }

    /// Wrap an already-authenticated API client.
    #[must_use]
    pub fn from_api(api: ApiClient) -> Self {
        Self {
            inner: Arc::new(AdminClientInner { api }),
        }
    }

    /// The underlying API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    async fn fetch<T: DeserializeOwned>(&self, segments: &[&str], query: Option<&str>) -> Result<T> {
        self.inner
            .api
            .request::<T, ()>(Method::GET, segments, query, None)
            .await?
            .ok_or_else(|| ApiError::MissingData.into())
    }

    async fn send<T, B>(&self, method: Method, segments: &[&str], body: Option<&B>) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        Ok(self.inner.api.request(method, segments, None, body).await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod test_support {
    use std::time::Duration;

    use cellshop_storefront::ApiConfig;
    use secrecy::SecretString;
    use url::Url;
    use wiremock::MockServer;

    use super::*;

    pub const TOKEN: &str = "tK9vQ2mXw7LpR4zN8bY3hJ6f";

    pub fn client(server: &MockServer) -> AdminClient {
        let config = AdminConfig {
            api: ApiConfig::new(Url::parse(&format!("{}/api", server.uri())).unwrap())
                .with_timeout(Duration::from_secs(2)),
            token: SecretString::from(TOKEN),
        };
        AdminClient::new(&config).unwrap()
    }
}
