//! Discount coupons applied at checkout.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::CouponCode;

/// How a coupon reduces the order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage off the subtotal, e.g. `10` for 10%.
    Percent(Decimal),
    /// Fixed amount off the subtotal.
    Fixed(Decimal),
}

/// A coupon as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub code: CouponCode,
    pub discount: Discount,
    #[serde(default)]
    pub min_order_value: Decimal,
    #[serde(default)]
    pub max_discount: Option<Decimal>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Why a coupon cannot be used right now.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CouponRejection {
    #[error("coupon {0} is no longer active")]
    Inactive(CouponCode),
    #[error("coupon {0} has expired")]
    Expired(CouponCode),
    #[error("order must be at least {min} to use coupon {code}")]
    BelowMinimum { code: CouponCode, min: Decimal },
}

impl Coupon {
    /// Discount this coupon gives on `subtotal` at time `now`.
    ///
    /// The result is never negative and never more than the subtotal.
    ///
    /// # Errors
    ///
    /// Returns a [`CouponRejection`] when the coupon is inactive, expired, or
    /// the subtotal is below its minimum order value.
    pub fn discount_for(
        &self,
        subtotal: Decimal,
        now: DateTime<Utc>,
    ) -> Result<Decimal, CouponRejection> {
        if !self.active {
            return Err(CouponRejection::Inactive(self.code.clone()));
        }
        if self.expires_at.is_some_and(|expires| expires <= now) {
            return Err(CouponRejection::Expired(self.code.clone()));
        }
        if subtotal < self.min_order_value {
            return Err(CouponRejection::BelowMinimum {
                code: self.code.clone(),
                min: self.min_order_value,
            });
        }

        let raw = match self.discount {
            Discount::Percent(percent) => {
                (subtotal * percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
                    / Decimal::ONE_HUNDRED)
                    .round_dp(0)
            }
            Discount::Fixed(amount) => amount.max(Decimal::ZERO),
        };
        let capped = self.max_discount.map_or(raw, |cap| raw.min(cap));
        Ok(capped.min(subtotal).max(Decimal::ZERO))
    }
}
