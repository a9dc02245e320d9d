//! Admin dashboard commands.
//!
//! # Usage
//!
//! ```bash
//! cellshop admin categories
//! cellshop admin set-price iphone-15 21990000
//! cellshop admin orders --status preparing
//! cellshop admin review-cancel 65f0c3 --reject
//! cellshop admin revenue
//! ```
//!
//! # Environment Variables
//!
//! - `CELLSHOP_ADMIN_TOKEN` - Admin bearer token

use cellshop_admin::{
    AdminClient, AdminConfig, AdminError, ProductUpdate, StockLevel, orders_by_status,
    revenue_by_month,
};
use cellshop_core::{CategoryId, Order, OrderId, OrderStatus, ProductId, Sku};
use clap::Subcommand;
use rust_decimal::Decimal;

use super::{CliError, money};

#[derive(Subcommand)]
pub enum AdminAction {
    /// List categories
    Categories,
    /// Create a category
    CreateCategory { name: String },
    /// Rename a category
    RenameCategory { id: String, name: String },
    /// Delete a category
    DeleteCategory { id: String },
    /// Change a product's price
    SetPrice {
        product: String,
        price: Decimal,

        #[arg(long)]
        sale_price: Option<Decimal>,
    },
    /// Set stock for one variant
    SetStock {
        product: String,
        sku: String,
        stock: u32,
    },
    /// Delete a product
    DeleteProduct { id: String },
    /// List orders
    Orders {
        /// Only orders in this status
        #[arg(short, long)]
        status: Option<String>,
    },
    /// Move an order to a new status
    SetStatus { id: String, status: String },
    /// Approve (default) or reject a buyer's cancellation request
    ReviewCancel {
        id: String,

        #[arg(long)]
        reject: bool,
    },
    /// Revenue per month from delivered orders
    Revenue,
    /// Order count per status
    StatusCounts,
}

pub async fn run(action: AdminAction) -> Result<(), CliError> {
    let config = AdminConfig::from_env().map_err(AdminError::from)?;
    let client = AdminClient::new(&config)?;
    execute(&client, action).await.inspect_err(|e| {
        if let CliError::Admin(admin) = e {
            admin.report();
        }
    })
}

async fn execute(client: &AdminClient, action: AdminAction) -> Result<(), CliError> {
    match action {
        AdminAction::Categories => {
            for category in client.list_categories().await? {
                println!(
                    "  {:<26} {:<24} {} products",
                    category.id.as_str(),
                    category.name,
                    category.product_count
                );
            }
        }
        AdminAction::CreateCategory { name } => {
            let category = client.create_category(&name).await?;
            println!("Created {} ({})", category.name, category.id);
        }
        AdminAction::RenameCategory { id, name } => {
            client.rename_category(&CategoryId::new(id), &name).await?;
        }
        AdminAction::DeleteCategory { id } => {
            client.delete_category(&CategoryId::new(id)).await?;
        }
        AdminAction::SetPrice {
            product,
            price,
            sale_price,
        } => {
            let update = ProductUpdate {
                price: Some(price),
                sale_price,
                ..ProductUpdate::default()
            };
            client.update_product(&ProductId::new(product), &update).await?;
        }
        AdminAction::SetStock {
            product,
            sku,
            stock,
        } => {
            let update = ProductUpdate {
                stock: vec![StockLevel {
                    sku: Sku::new(sku),
                    stock,
                }],
                ..ProductUpdate::default()
            };
            client.update_product(&ProductId::new(product), &update).await?;
        }
        AdminAction::DeleteProduct { id } => {
            client.delete_product(&ProductId::new(id)).await?;
        }
        AdminAction::Orders { status } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            for order in client.list_orders(status).await? {
                println!(
                    "  {}  {}  {:<10} {:>16}",
                    order.order_id,
                    order.order_date.format("%Y-%m-%d"),
                    order.order_status.as_str(),
                    money(order.total)
                );
            }
        }
        AdminAction::SetStatus { id, status } => {
            let next = parse_status(&status)?;
            let order = find_order(client, &OrderId::new(id)).await?;
            let updated = client.update_order_status(&order, next).await?;
            println!("{} is now {}", updated.order_id, updated.order_status);
        }
        AdminAction::ReviewCancel { id, reject } => {
            let order = find_order(client, &OrderId::new(id)).await?;
            let updated = client.review_cancel_request(&order, !reject).await?;
            println!("{} is {}", updated.order_id, updated.order_status);
        }
        AdminAction::Revenue => {
            let orders = client.list_orders(Some(OrderStatus::Delivered)).await?;
            for month in revenue_by_month(&orders) {
                println!(
                    "  {}  {:>18}  {} orders",
                    month.month,
                    money(month.revenue),
                    month.orders
                );
            }
        }
        AdminAction::StatusCounts => {
            let orders = client.list_orders(None).await?;
            for entry in orders_by_status(&orders) {
                println!("  {:<10} {}", entry.status.as_str(), entry.count);
            }
        }
    }
    Ok(())
}

fn parse_status(raw: &str) -> Result<OrderStatus, CliError> {
    raw.parse().map_err(|e: String| CliError::invalid("status", e))
}

async fn find_order(client: &AdminClient, id: &OrderId) -> Result<Order, CliError> {
    client
        .list_orders(None)
        .await?
        .into_iter()
        .find(|order| &order.order_id == id)
        .ok_or_else(|| AdminError::NotFound(format!("order {id}")).into())
}
