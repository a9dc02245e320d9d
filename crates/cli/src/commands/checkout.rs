//! Checkout totals.

use cellshop_core::{CouponCode, PaymentMethod};
use cellshop_storefront::Session;

use super::{CliError, money, reported};

pub async fn run(session: &Session, coupon: Option<&str>, payment: &str) -> Result<(), CliError> {
    let method: PaymentMethod = payment
        .parse()
        .map_err(|e: String| CliError::invalid("payment method", e))?;

    let mut draft = session.checkout();
    draft.select_payment(method);
    if let Some(code) = coupon {
        draft
            .apply_coupon(&CouponCode::new(code.trim()))
            .await
            .map_err(reported)?;
    }

    let summary = draft.summary();
    println!("items:    {}", summary.item_count);
    println!("subtotal: {}", money(summary.subtotal));
    if let Some(code) = &summary.coupon {
        println!("coupon:   {code} (-{})", money(summary.discount));
    }
    println!("total:    {}", money(summary.total));
    println!("payment:  {}", summary.payment_method.label());
    Ok(())
}
