//! Order history and buyer cancellation.

use std::sync::{PoisonError, RwLock};

use cellshop_core::{
    CancellationForm, CancellationKind, CancellationMode, Order, OrderId, prepare_cancellation,
};
use chrono::Utc;
use tracing::{info, instrument};

use crate::api::{ApiClient, ApiError};
use crate::error::{Result, StoreError, add_breadcrumb};

/// Result of a successful cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationOutcome {
    /// A pending order was cancelled outright.
    Cancelled(Order),
    /// A preparing order now has a request waiting for an admin.
    RequestSubmitted(Order),
}

impl CancellationOutcome {
    #[must_use]
    pub const fn order(&self) -> &Order {
        match self {
            Self::Cancelled(order) | Self::RequestSubmitted(order) => order,
        }
    }

    /// Confirmation shown to the buyer.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::Cancelled(_) => "Your order has been cancelled.",
            Self::RequestSubmitted(_) => {
                "Your cancellation request was sent. We will let you know once it is reviewed."
            }
        }
    }
}

/// The signed-in buyer's orders.
#[derive(Debug)]
pub struct OrderBook {
    api: ApiClient,
    orders: RwLock<Vec<Order>>,
}

impl OrderBook {
    #[must_use]
    pub const fn new(api: ApiClient) -> Self {
        Self {
            api,
            orders: RwLock::new(Vec::new()),
        }
    }

    /// Which cancellation control to offer for `order`, if any.
    #[must_use]
    pub const fn cancellation_options(order: &Order) -> Option<CancellationMode> {
        order.cancellation_mode()
    }

    /// Orders from the last [`OrderBook::list`], with local changes applied.
    #[must_use]
    pub fn cached(&self) -> Vec<Order> {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Fetch the order history.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotAuthenticated`] when signed out, or an API error.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Order>> {
        self.require_auth()?;
        let orders = self.api.fetch_orders().await?;
        *self.orders.write().unwrap_or_else(PoisonError::into_inner) = orders.clone();
        Ok(orders)
    }

    /// Fetch one order and refresh its cached copy.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown order id.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get(&self, order_id: &OrderId) -> Result<Order> {
        self.require_auth()?;
        let order = self.api.fetch_order(order_id).await.map_err(|e| match e {
            ApiError::Business { status: 404, .. } | ApiError::Status { status: 404, .. } => {
                StoreError::NotFound(format!("order {order_id}"))
            }
            other => other.into(),
        })?;
        self.store(&order);
        Ok(order)
    }

    /// Cancel an order, or ask for it to be cancelled.
    ///
    /// The form is checked against the order before anything is sent.
    ///
    /// # Errors
    ///
    /// - [`StoreError::Validation`] when the order cannot be cancelled or the
    ///   form is incomplete; nothing is sent
    /// - [`StoreError::Api`] when the server refuses
    #[instrument(skip(self, order, form), fields(order_id = %order.order_id, status = %order.order_status))]
    pub async fn cancel(
        &self,
        order: &Order,
        form: &CancellationForm,
    ) -> Result<CancellationOutcome> {
        let submission = prepare_cancellation(order, form)?;
        self.require_auth()?;

        let updated = match self.api.cancel_order(&order.order_id, &submission).await? {
            Some(server) => server,
            None => {
                let mut local = order.clone();
                local.apply_cancellation(&submission, Utc::now());
                local
            }
        };
        self.store(&updated);
        add_breadcrumb(
            "orders",
            "Cancellation submitted",
            Some(&[
                ("order_id", order.order_id.as_str()),
                ("reason", submission.kind.as_str()),
            ]),
        );
        info!(kind = submission.kind.as_str(), "Cancellation accepted");

        Ok(match submission.kind {
            CancellationKind::BuyerCancel => CancellationOutcome::Cancelled(updated),
            CancellationKind::BuyerRequest => CancellationOutcome::RequestSubmitted(updated),
        })
    }

    /// Forget cached orders.
    pub fn reset(&self) {
        self.orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn require_auth(&self) -> Result<()> {
        if self.api.is_authenticated() {
            Ok(())
        } else {
            Err(StoreError::NotAuthenticated)
        }
    }

    fn store(&self, order: &Order) {
        let mut orders = self.orders.write().unwrap_or_else(PoisonError::into_inner);
        match orders.iter_mut().find(|o| o.order_id == order.order_id) {
            Some(existing) => *existing = order.clone(),
            None => orders.push(order.clone()),
        }
    }
}
