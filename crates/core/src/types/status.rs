//! Status enums for orders, payments and cancellation requests.
//!
//! Wire values are `snake_case` strings as the backend sends them.

use serde::{Deserialize, Serialize};

/// Order fulfilment status.
///
/// The backend treats this as a closed set; values it adds later land in
/// [`OrderStatus::Unknown`] instead of failing the whole response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Preparing,
    Shipping,
    Delivered,
    Cancelled,
    Returned,
    #[serde(other)]
    Unknown,
}

impl OrderStatus {
    /// Every known status, in lifecycle order.
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Preparing,
        Self::Shipping,
        Self::Delivered,
        Self::Cancelled,
        Self::Returned,
    ];

    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Preparing => "preparing",
            Self::Shipping => "shipping",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Returned => "returned",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the status never changes again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Returned)
    }

    /// Whether an admin may move an order from `self` to `next`.
    ///
    /// `pending → preparing → shipping → delivered → returned`, and
    /// `pending | preparing → cancelled`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Preparing | Self::Cancelled)
                | (Self::Preparing, Self::Shipping | Self::Cancelled)
                | (Self::Shipping, Self::Delivered)
                | (Self::Delivered, Self::Returned)
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("invalid order status: {s}"))
    }
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
    Refunded,
}

/// Payment method chosen at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Cash on delivery.
    #[default]
    Cod,
    BankTransfer,
    Vnpay,
    Momo,
}

impl PaymentMethod {
    /// Label shown next to the payment option.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cod => "Cash on delivery",
            Self::BankTransfer => "Bank transfer",
            Self::Vnpay => "VNPay",
            Self::Momo => "MoMo wallet",
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "bank_transfer" => Ok(Self::BankTransfer),
            "vnpay" => Ok(Self::Vnpay),
            "momo" => Ok(Self::Momo),
            _ => Err(format!("invalid payment method: {s}")),
        }
    }
}

/// How a buyer cancellation was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationKind {
    /// Direct cancel of a pending order, effective immediately.
    BuyerCancel,
    /// Request to cancel a preparing order, awaiting admin approval.
    BuyerRequest,
}

impl CancellationKind {
    /// Wire representation, sent as the `reason` field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuyerCancel => "buyer_cancel",
            Self::BuyerRequest => "buyer_request",
        }
    }
}

/// Review state of a cancellation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CancelRequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}
