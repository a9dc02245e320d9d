//! Checkout summary: cart subtotal, coupon discount and payment method.

use cellshop_core::{CartLines, Coupon, CouponCode, PaymentMethod, ValidationError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{debug, instrument};

use crate::api::{ApiClient, ApiError};
use crate::error::{Result, StoreError};

/// Totals shown before the order is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSummary {
    pub subtotal: Decimal,
    pub discount: Decimal,
    /// `subtotal - discount`, never negative.
    pub total: Decimal,
    pub item_count: u64,
    pub coupon: Option<CouponCode>,
    pub payment_method: PaymentMethod,
}

/// Checkout state built from a snapshot of the cart.
#[derive(Debug)]
pub struct CheckoutDraft {
    api: ApiClient,
    lines: CartLines,
    coupon: Option<Coupon>,
    payment_method: PaymentMethod,
}

impl CheckoutDraft {
    #[must_use]
    pub fn new(api: ApiClient, lines: CartLines) -> Self {
        Self {
            api,
            lines,
            coupon: None,
            payment_method: PaymentMethod::default(),
        }
    }

    #[must_use]
    pub const fn lines(&self) -> &CartLines {
        &self.lines
    }

    #[must_use]
    pub const fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn select_payment(&mut self, method: PaymentMethod) {
        self.payment_method = method;
    }

    /// Look up a coupon and apply it to the current subtotal.
    ///
    /// Returns the discount it gives.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the coupon does not exist or cannot
    /// be used for this cart; any previously applied coupon is kept.
    #[instrument(skip(self), fields(code = %code))]
    pub async fn apply_coupon(&mut self, code: &CouponCode) -> Result<Decimal> {
        let coupon = self.api.fetch_coupon(code).await.map_err(|e| match e {
            ApiError::Business { status: 404, .. } | ApiError::Status { status: 404, .. } => {
                StoreError::Validation(ValidationError::Coupon(format!(
                    "coupon {code} does not exist"
                )))
            }
            other => other.into(),
        })?;

        let discount = coupon
            .discount_for(self.lines.total_amount(), Utc::now())
            .map_err(|rejection| ValidationError::Coupon(rejection.to_string()))?;
        debug!(%discount, "Coupon applied");
        self.coupon = Some(coupon);
        Ok(discount)
    }

    pub fn remove_coupon(&mut self) {
        self.coupon = None;
    }

    /// Totals at `now`. A coupon that has since become unusable gives no
    /// discount.
    #[must_use]
    pub fn summary_at(&self, now: DateTime<Utc>) -> CheckoutSummary {
        let subtotal = self.lines.total_amount();
        let discount = self
            .coupon
            .as_ref()
            .and_then(|coupon| coupon.discount_for(subtotal, now).ok())
            .unwrap_or(Decimal::ZERO);
        CheckoutSummary {
            subtotal,
            discount,
            total: (subtotal - discount).max(Decimal::ZERO),
            item_count: self.lines.cart_count(),
            coupon: self.coupon.as_ref().map(|coupon| coupon.code.clone()),
            payment_method: self.payment_method,
        }
    }

    #[must_use]
    pub fn summary(&self) -> CheckoutSummary {
        self.summary_at(Utc::now())
    }
}
