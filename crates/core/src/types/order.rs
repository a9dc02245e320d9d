//! Read-only order view and the buyer cancellation rules.
//!
//! Only two kinds of order can be cancelled by the buyer:
//!
//! - `pending`: pick a reason from [`CancelReason`]; the cancel is immediate.
//! - `preparing`: write a short justification; this files a request that an
//!   admin must approve.
//!
//! Everything else (shipped, delivered, already cancelled, or an order that
//! already carries a request) is immutable from the buyer's side.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{OrderId, ProductId, Sku};
use super::status::{
    CancelRequestStatus, CancellationKind, OrderStatus, PaymentMethod, PaymentStatus,
};
use super::validation::ValidationError;

/// Longest justification accepted for a cancellation request, in characters.
pub const MAX_CANCEL_DESCRIPTION_CHARS: usize = 200;

/// A purchased line on an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: ProductId,
    pub sku: Sku,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
}

/// Cancellation attached to an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrder {
    #[serde(rename = "reason")]
    pub kind: CancellationKind,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: CancelRequestStatus,
    #[serde(default)]
    pub requested_at: Option<DateTime<Utc>>,
}

/// An order as shown in the buyer's order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(alias = "_id")]
    pub order_id: OrderId,
    pub order_date: DateTime<Utc>,
    pub order_status: OrderStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub total: Decimal,
    #[serde(default)]
    pub items: Vec<OrderLine>,
    #[serde(default)]
    pub cancel_order: Option<CancelOrder>,
}

/// Which cancellation control to show for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancellationMode {
    /// Pick one of [`CancelReason::ALL`]; cancels immediately.
    ChooseReason,
    /// Write a justification; files a request for approval.
    Justify,
}

impl Order {
    /// The cancellation control for this order, or `None` when it is hidden.
    #[must_use]
    pub const fn cancellation_mode(&self) -> Option<CancellationMode> {
        if self.cancel_order.is_some() {
            return None;
        }
        match self.order_status {
            OrderStatus::Pending => Some(CancellationMode::ChooseReason),
            OrderStatus::Preparing => Some(CancellationMode::Justify),
            _ => None,
        }
    }

    #[must_use]
    pub const fn can_cancel(&self) -> bool {
        self.cancellation_mode().is_some()
    }

    /// Reflect an accepted cancellation locally, without a reload.
    pub fn apply_cancellation(&mut self, submission: &CancellationSubmission, now: DateTime<Utc>) {
        match submission.kind {
            CancellationKind::BuyerCancel => {
                self.order_status = OrderStatus::Cancelled;
                self.cancel_order = Some(CancelOrder {
                    kind: CancellationKind::BuyerCancel,
                    description: submission.description.clone(),
                    status: CancelRequestStatus::Approved,
                    requested_at: Some(now),
                });
            }
            CancellationKind::BuyerRequest => {
                self.cancel_order = Some(CancelOrder {
                    kind: CancellationKind::BuyerRequest,
                    description: submission.description.clone(),
                    status: CancelRequestStatus::Pending,
                    requested_at: Some(now),
                });
            }
        }
    }
}

/// Fixed reasons offered for cancelling a pending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    ChangeDeliveryAddress,
    ChangeProductVariant,
    FoundBetterPrice,
    NoLongerNeeded,
    OrderedByMistake,
    PaymentProblem,
}

impl CancelReason {
    pub const ALL: [Self; 6] = [
        Self::ChangeDeliveryAddress,
        Self::ChangeProductVariant,
        Self::FoundBetterPrice,
        Self::NoLongerNeeded,
        Self::OrderedByMistake,
        Self::PaymentProblem,
    ];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ChangeDeliveryAddress => "change_delivery_address",
            Self::ChangeProductVariant => "change_product_variant",
            Self::FoundBetterPrice => "found_better_price",
            Self::NoLongerNeeded => "no_longer_needed",
            Self::OrderedByMistake => "ordered_by_mistake",
            Self::PaymentProblem => "payment_problem",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::ChangeDeliveryAddress => "I want to change the delivery address",
            Self::ChangeProductVariant => "I want a different color or capacity",
            Self::FoundBetterPrice => "I found a better price elsewhere",
            Self::NoLongerNeeded => "I no longer need the product",
            Self::OrderedByMistake => "I placed the order by mistake",
            Self::PaymentProblem => "I had a problem paying",
        }
    }
}

impl std::str::FromStr for CancelReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|reason| reason.code() == s)
            .ok_or_else(|| format!("unknown cancellation reason: {s}"))
    }
}

/// What the buyer filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancellationForm {
    /// Reason picker; `None` when nothing was selected.
    Reason(Option<CancelReason>),
    /// Free-text justification.
    Justification(String),
}

/// Body of the cancel call: `{"reason": "...", "description": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationSubmission {
    #[serde(rename = "reason")]
    pub kind: CancellationKind,
    pub description: String,
}

/// Validate a cancellation form against an order.
///
/// # Errors
///
/// Returns a [`ValidationError`] when the order cannot be cancelled, the form
/// does not match the order's status, no reason was selected, or the
/// justification is empty or longer than [`MAX_CANCEL_DESCRIPTION_CHARS`].
pub fn prepare_cancellation(
    order: &Order,
    form: &CancellationForm,
) -> Result<CancellationSubmission, ValidationError> {
    if order.cancel_order.is_some()
        && matches!(
            order.order_status,
            OrderStatus::Pending | OrderStatus::Preparing
        )
    {
        return Err(ValidationError::CancellationAlreadyRequested);
    }
    let mode = order
        .cancellation_mode()
        .ok_or(ValidationError::NotCancellable(order.order_status))?;

    match (mode, form) {
        (CancellationMode::ChooseReason, CancellationForm::Reason(reason)) => {
            let reason = reason.ok_or(ValidationError::MissingCancelReason)?;
            Ok(CancellationSubmission {
                kind: CancellationKind::BuyerCancel,
                description: reason.label().to_owned(),
            })
        }
        (CancellationMode::Justify, CancellationForm::Justification(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Err(ValidationError::EmptyDescription);
            }
            let actual = text.chars().count();
            if actual > MAX_CANCEL_DESCRIPTION_CHARS {
                return Err(ValidationError::DescriptionTooLong {
                    max: MAX_CANCEL_DESCRIPTION_CHARS,
                    actual,
                });
            }
            Ok(CancellationSubmission {
                kind: CancellationKind::BuyerRequest,
                description: text.to_owned(),
            })
        }
        _ => Err(ValidationError::WrongCancellationForm(order.order_status)),
    }
}
