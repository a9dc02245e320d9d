//! Cart commands.

use cellshop_core::{CartLineKey, NewCartItem, ProductId, Sku};
use cellshop_storefront::Session;
use clap::Subcommand;
use rust_decimal::Decimal;

use super::{CliError, money, reported};

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Add a variant to the cart
    Add {
        product: String,
        sku: String,

        /// Name shown on the cart line
        #[arg(long)]
        name: String,

        /// Unit price
        #[arg(long)]
        price: Decimal,

        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        #[arg(long)]
        color: Option<String>,
    },
    /// Change a line's quantity by a signed amount
    Update {
        product: String,
        sku: String,

        #[arg(allow_hyphen_values = true)]
        delta: i32,
    },
    /// Remove a line
    Remove { product: String, sku: String },
    /// Empty the cart
    Clear,
}

pub async fn run(session: &Session, action: CartAction) -> Result<(), CliError> {
    let cart = session.cart();
    match action {
        CartAction::Show => {}
        CartAction::Add {
            product,
            sku,
            name,
            price,
            quantity,
            color,
        } => {
            cart.add_item(NewCartItem {
                product_id: ProductId::new(product),
                sku: Sku::new(sku),
                name,
                price,
                quantity,
                color,
                variant_image: None,
            })
            .await
            .map_err(reported)?;
        }
        CartAction::Update {
            product,
            sku,
            delta,
        } => {
            let quantity = cart
                .update_quantity(&CartLineKey::new(product, sku), delta)
                .await
                .map_err(reported)?;
            tracing::info!(quantity, "Quantity updated");
        }
        CartAction::Remove { product, sku } => {
            cart.remove_item(&CartLineKey::new(product, sku))
                .await
                .map_err(reported)?;
        }
        CartAction::Clear => cart.clear_cart().await.map_err(reported)?,
    }

    let lines = cart.snapshot();
    for item in lines.items() {
        println!(
            "  {:<20} {:<24} x{:<3} {:>16}  {}",
            item.product_id.as_str(),
            item.sku.as_str(),
            item.quantity,
            money(item.price),
            item.name
        );
    }
    println!(
        "{} items, total {}",
        lines.cart_count(),
        money(lines.total_amount())
    );
    Ok(())
}
