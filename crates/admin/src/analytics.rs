//! Dashboard chart series computed from an order list.
//!
//! Pure functions; fetch the orders with
//! [`AdminClient::list_orders`](crate::AdminClient::list_orders) first.

use std::collections::BTreeMap;

use cellshop_core::{Order, OrderStatus};
use rust_decimal::Decimal;
use serde::Serialize;

/// Revenue and order count for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    /// The month (YYYY-MM format).
    pub month: String,
    /// Sum of order totals in this month.
    pub revenue: Decimal,
    /// Number of orders counted.
    pub orders: u32,
}

/// Number of orders in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: OrderStatus,
    pub count: u32,
}

/// Revenue per month from delivered orders, oldest month first.
///
/// Months with no delivered orders are left out.
#[must_use]
pub fn revenue_by_month(orders: &[Order]) -> Vec<MonthlyRevenue> {
    let mut months: BTreeMap<String, (Decimal, u32)> = BTreeMap::new();
    for order in orders
        .iter()
        .filter(|order| order.order_status == OrderStatus::Delivered)
    {
        let entry = months
            .entry(order.order_date.format("%Y-%m").to_string())
            .or_insert((Decimal::ZERO, 0));
        entry.0 += order.total;
        entry.1 += 1;
    }

    months
        .into_iter()
        .map(|(month, (revenue, orders))| MonthlyRevenue {
            month,
            revenue,
            orders,
        })
        .collect()
}

/// Order count for every known status, in lifecycle order.
///
/// Statuses with no orders are included with a zero count so chart axes
/// stay stable. Orders in a status this client does not know are skipped.
#[must_use]
pub fn orders_by_status(orders: &[Order]) -> Vec<StatusCount> {
    OrderStatus::ALL
        .into_iter()
        .map(|status| StatusCount {
            status,
            count: u32::try_from(
                orders
                    .iter()
                    .filter(|order| order.order_status == status)
                    .count(),
            )
            .unwrap_or(u32::MAX),
        })
        .collect()
}
