//! Wishlist commands.

use cellshop_core::ProductId;
use cellshop_storefront::Session;
use clap::Subcommand;

use super::{CliError, reported};

#[derive(Subcommand)]
pub enum WishlistAction {
    /// Show saved products
    Show,
    /// Save a product
    Add { product: String },
    /// Remove a saved product
    Remove { product: String },
    /// Remove every saved product
    Clear,
}

pub async fn run(session: &Session, action: WishlistAction) -> Result<(), CliError> {
    let wishlist = session.wishlist();
    match action {
        WishlistAction::Show => {}
        WishlistAction::Add { product } => {
            if !wishlist.add(&ProductId::new(product)).await.map_err(reported)? {
                tracing::info!("Already saved");
            }
        }
        WishlistAction::Remove { product } => {
            if !wishlist
                .remove(&ProductId::new(product))
                .await
                .map_err(reported)?
            {
                tracing::info!("Was not saved");
            }
        }
        WishlistAction::Clear => wishlist.clear().await.map_err(reported)?,
    }

    for product_id in wishlist.items() {
        println!("  {product_id}");
    }
    println!("{} saved", wishlist.count());
    Ok(())
}
