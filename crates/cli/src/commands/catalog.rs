//! Catalog browsing commands.
//!
//! # Usage
//!
//! ```bash
//! cellshop products storage=256GB brand=apple --page 2
//! cellshop product iphone-15
//! ```

use cellshop_core::FilterPatch;
use cellshop_storefront::{FetchOutcome, Location, Session};

use super::{CliError, money, reported};

/// Apply `facets` (and `page`) to the product listing and print the page.
pub async fn list(session: &Session, facets: &[String], page: Option<u32>) -> Result<(), CliError> {
    let pairs = facets
        .iter()
        .map(|facet| {
            facet
                .split_once('=')
                .ok_or_else(|| CliError::invalid("facet", format!("expected key=value, got '{facet}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut patch = FilterPatch::from_pairs(pairs);
    if let Some(page) = page {
        patch = patch.page(page);
    }

    let catalog = session.catalog(Location::parse("/products"));
    catalog.load().await.map_err(reported)?;
    if !patch.is_empty() {
        match catalog.set_filters(&patch).await.map_err(reported)? {
            FetchOutcome::Stale => tracing::debug!("Listing superseded"),
            FetchOutcome::Applied(_) | FetchOutcome::Unchanged => {}
        }
    }

    println!("{}", catalog.location());
    for product in catalog.products() {
        println!(
            "  {:<28} {:>16}  {}",
            product.slug,
            money(product.effective_price()),
            product.name
        );
    }
    println!(
        "page {}/{} ({} products)",
        catalog.filter().page(),
        catalog.total_pages().max(1),
        catalog.total_items()
    );
    Ok(())
}

/// Print one product with its variants.
pub async fn show(session: &Session, slug: &str) -> Result<(), CliError> {
    let product = session
        .api()
        .fetch_product(slug)
        .await
        .map_err(|e| reported(e.into()))?;

    println!("{} ({})", product.name, product.id);
    println!("  price: {}", money(product.effective_price()));
    for variant in &product.variants {
        println!(
            "  {:<24} {:<10} {:<8} {:>16}  stock {}",
            variant.sku.as_str(),
            variant.color.as_deref().unwrap_or("-"),
            variant.storage.as_deref().unwrap_or("-"),
            money(variant.price),
            variant.stock
        );
    }
    Ok(())
}
