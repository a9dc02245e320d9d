//! Order history and cancellation commands.
//!
//! # Usage
//!
//! ```bash
//! cellshop orders list
//! cellshop orders cancel 65f0c2 --reason found_better_price      # pending order
//! cellshop orders cancel 65f0c3 --description "Wrong colour"     # preparing order
//! ```

use cellshop_core::{
    CancelReason, CancellationForm, CancellationMode, Order, OrderId, ValidationError,
};
use cellshop_storefront::{OrderBook, Session};
use clap::Subcommand;

use super::{CliError, money, reported};

#[derive(Subcommand)]
pub enum OrdersAction {
    /// List your orders
    List,
    /// Show one order
    Show { id: String },
    /// Cancel an order, or ask for it to be cancelled
    Cancel {
        id: String,

        /// Reason code for a pending order
        #[arg(short, long)]
        reason: Option<String>,

        /// Justification for an order being prepared (max 200 characters)
        #[arg(short, long)]
        description: Option<String>,
    },
}

pub async fn run(session: &Session, action: OrdersAction) -> Result<(), CliError> {
    let orders = session.orders();
    match action {
        OrdersAction::List => {
            for order in orders.list().await.map_err(reported)? {
                print_summary(&order);
            }
        }
        OrdersAction::Show { id } => {
            let order = orders.get(&OrderId::new(id)).await.map_err(reported)?;
            print_summary(&order);
            for line in &order.items {
                println!(
                    "    {} x{} {}",
                    line.name,
                    line.quantity,
                    money(line.price)
                );
            }
            match OrderBook::cancellation_options(&order) {
                Some(CancellationMode::ChooseReason) => {
                    println!("  can be cancelled with one of:");
                    for reason in CancelReason::ALL {
                        println!("    {:<26} {}", reason.code(), reason.label());
                    }
                }
                Some(CancellationMode::Justify) => {
                    println!("  cancellation can be requested with a short description");
                }
                None => {}
            }
        }
        OrdersAction::Cancel {
            id,
            reason,
            description,
        } => {
            let order = orders.get(&OrderId::new(id)).await.map_err(reported)?;
            let form = cancellation_form(&order, reason.as_deref(), description)?;
            let outcome = orders.cancel(&order, &form).await.map_err(reported)?;
            println!("{}", outcome.message());
        }
    }
    Ok(())
}

/// Build the form the order's status calls for.
fn cancellation_form(
    order: &Order,
    reason: Option<&str>,
    description: Option<String>,
) -> Result<CancellationForm, CliError> {
    match order.cancellation_mode() {
        Some(CancellationMode::Justify) => Ok(CancellationForm::Justification(
            description.unwrap_or_default(),
        )),
        Some(CancellationMode::ChooseReason) => {
            let reason = reason
                .map(str::parse::<CancelReason>)
                .transpose()
                .map_err(|e| CliError::invalid("reason", e))?;
            Ok(CancellationForm::Reason(reason))
        }
        None if order.cancel_order.is_some() => {
            Err(ValidationError::CancellationAlreadyRequested.into())
        }
        None => Err(ValidationError::NotCancellable(order.order_status).into()),
    }
}

fn print_summary(order: &Order) {
    println!(
        "{}  {}  {:<10} {:>16}  {}",
        order.order_id,
        order.order_date.format("%Y-%m-%d"),
        order.order_status.as_str(),
        money(order.total),
        order.payment_method.label()
    );
    if let Some(request) = &order.cancel_order {
        println!(
            "  cancellation {}: {}",
            request.kind.as_str(),
            request.description
        );
    }
}
