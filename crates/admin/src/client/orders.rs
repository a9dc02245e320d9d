//! Order management: listing, status changes and cancellation review.

use cellshop_core::{
    CancelRequestStatus, CancellationKind, Order, OrderStatus, ValidationError,
};
use reqwest::Method;
use tracing::{info, instrument};

use super::AdminClient;
use crate::error::{AdminError, Result};
use crate::types::{CancelReviewBody, StatusBody};

impl AdminClient {
    /// List orders, optionally only those in `status`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, status: Option<OrderStatus>) -> Result<Vec<Order>> {
        let query = status.map(|status| format!("status={}", status.as_str()));
        self.fetch(&["admin", "orders"], query.as_deref()).await
    }

    /// Move an order to `next`.
    ///
    /// The transition is checked locally first; an invalid one sends
    /// nothing. Returns the server's copy of the order when it sends one.
    ///
    /// # Errors
    ///
    /// - [`AdminError::Validation`] for a transition the lifecycle forbids
    /// - [`AdminError::Api`] when the server refuses
    #[instrument(skip(self, order), fields(order_id = %order.order_id, from = %order.order_status, to = %next))]
    pub async fn update_order_status(&self, order: &Order, next: OrderStatus) -> Result<Order> {
        let from = order.order_status;
        if !from.can_transition_to(next) {
            return Err(ValidationError::InvalidStatusTransition { from, to: next }.into());
        }

        let updated = self
            .send(
                Method::PUT,
                &["admin", "orders", order.order_id.as_str(), "status"],
                Some(&StatusBody { order_status: next }),
            )
            .await?
            .unwrap_or_else(|| {
                let mut local = order.clone();
                local.order_status = next;
                local
            });
        info!("Order status updated");
        Ok(updated)
    }

    /// Approve or reject a buyer's cancellation request.
    ///
    /// Approving cancels the order.
    ///
    /// # Errors
    ///
    /// - [`AdminError::NoPendingCancelRequest`] when there is nothing to
    ///   review; nothing is sent
    /// - [`AdminError::Api`] when the server refuses
    #[instrument(skip(self, order), fields(order_id = %order.order_id))]
    pub async fn review_cancel_request(&self, order: &Order, approve: bool) -> Result<Order> {
        let pending = order.cancel_order.as_ref().is_some_and(|request| {
            request.kind == CancellationKind::BuyerRequest
                && request.status == CancelRequestStatus::Pending
        });
        if !pending {
            return Err(AdminError::NoPendingCancelRequest(order.order_id.clone()));
        }

        let updated = self
            .send(
                Method::PUT,
                &["admin", "orders", order.order_id.as_str(), "cancel-request"],
                Some(&CancelReviewBody { approve }),
            )
            .await?
            .unwrap_or_else(|| apply_review(order, approve));
        info!(approve, "Cancellation request reviewed");
        Ok(updated)
    }
}

fn apply_review(order: &Order, approve: bool) -> Order {
    let mut local = order.clone();
    if let Some(request) = local.cancel_order.as_mut() {
        request.status = if approve {
            CancelRequestStatus::Approved
        } else {
            CancelRequestStatus::Rejected
        };
    }
    if approve {
        local.order_status = OrderStatus::Cancelled;
    }
    local
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::super::test_support::client;
    use super::*;

    fn order(status: &str, cancel: Option<serde_json::Value>) -> Order {
        let mut value = json!({
            "_id": "o1",
            "orderDate": "2026-03-01T08:00:00Z",
            "orderStatus": status,
            "paymentStatus": "pending",
            "paymentMethod": "cod",
            "total": "15990000",
            "items": []
        });
        if let Some(cancel) = cancel {
            value["cancelOrder"] = cancel;
        }
        serde_json::from_value(value).unwrap()
    }

    fn pending_request() -> serde_json::Value {
        json!({"reason": "buyer_request", "description": "Đặt nhầm màu", "status": "pending"})
    }

    #[tokio::test]
    async fn test_list_orders_filters_by_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/orders"))
            .and(query_param("status", "shipping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": []})))
            .expect(1)
            .mount(&server)
            .await;

        let orders = client(&server)
            .list_orders(Some(OrderStatus::Shipping))
            .await
            .unwrap();
        assert!(orders.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_transition_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .update_order_status(&order("delivered", None), OrderStatus::Pending)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AdminError::Validation(ValidationError::InvalidStatusTransition {
                from: OrderStatus::Delivered,
                to: OrderStatus::Pending
            })
        ));
    }

    #[tokio::test]
    async fn test_valid_transition_without_server_copy() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/admin/orders/o1/status"))
            .and(body_json(json!({"orderStatus": "preparing"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let updated = client(&server)
            .update_order_status(&order("pending", None), OrderStatus::Preparing)
            .await
            .unwrap();
        assert_eq!(updated.order_status, OrderStatus::Preparing);
    }

    #[tokio::test]
    async fn test_approving_request_cancels_order() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/admin/orders/o1/cancel-request"))
            .and(body_json(json!({"approve": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let updated = client(&server)
            .review_cancel_request(&order("preparing", Some(pending_request())), true)
            .await
            .unwrap();
        assert_eq!(updated.order_status, OrderStatus::Cancelled);
        assert_eq!(
            updated.cancel_order.unwrap().status,
            CancelRequestStatus::Approved
        );
    }

    #[tokio::test]
    async fn test_rejecting_request_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/admin/orders/o1/cancel-request"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(&server)
            .await;

        let updated = client(&server)
            .review_cancel_request(&order("preparing", Some(pending_request())), false)
            .await
            .unwrap();
        assert_eq!(updated.order_status, OrderStatus::Preparing);
        assert_eq!(
            updated.cancel_order.unwrap().status,
            CancelRequestStatus::Rejected
        );
    }

    #[tokio::test]
    async fn test_review_without_request_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .review_cancel_request(&order("preparing", None), true)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::NoPendingCancelRequest(_)));
    }
}
