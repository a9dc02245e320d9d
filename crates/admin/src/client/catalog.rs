//! Category and product management.

use cellshop_core::{CategoryId, Product, ProductId, ValidationError};
use reqwest::Method;
use tracing::{info, instrument};

use super::AdminClient;
use crate::error::Result;
use crate::types::{Category, CategoryBody, NewProduct, ProductUpdate};

fn category_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyField { field: "category name" }.into());
    }
    Ok(name)
}

impl AdminClient {
    // =========================================================================
    // Categories
    // =========================================================================

    /// List every category.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.fetch(&["admin", "categories"], None).await
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name, or an API error.
    #[instrument(skip(self))]
    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let name = category_name(name)?;
        let created = self
            .send(Method::POST, &["admin", "categories"], Some(&CategoryBody { name }))
            .await?
            .ok_or(cellshop_storefront::ApiError::MissingData)?;
        info!(name, "Category created");
        Ok(created)
    }

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank name, or an API error.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn rename_category(&self, id: &CategoryId, name: &str) -> Result<()> {
        let name = category_name(name)?;
        self.send::<serde_json::Value, _>(
            Method::PUT,
            &["admin", "categories", id.as_str()],
            Some(&CategoryBody { name }),
        )
        .await?;
        Ok(())
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns an error if the server refuses (e.g. the category still has
    /// products).
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: &CategoryId) -> Result<()> {
        self.send::<serde_json::Value, ()>(Method::DELETE, &["admin", "categories", id.as_str()], None)
            .await?;
        info!("Category deleted");
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Add a product to the catalog.
    ///
    /// # Errors
    ///
    /// Returns a validation error for missing fields or negative prices, or
    /// an API error.
    #[instrument(skip(self, product), fields(slug = %product.slug))]
    pub async fn create_product(&self, product: &NewProduct) -> Result<Product> {
        product.validate()?;
        let created: Product = self
            .send(Method::POST, &["admin", "products"], Some(product))
            .await?
            .ok_or(cellshop_storefront::ApiError::MissingData)?;
        self.api().invalidate_products().await;
        info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    /// Change a product's price and/or stock.
    ///
    /// An empty update sends nothing.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a negative price, or an API error.
    #[instrument(skip(self, update), fields(product_id = %id))]
    pub async fn update_product(&self, id: &ProductId, update: &ProductUpdate) -> Result<()> {
        if update.is_empty() {
            return Ok(());
        }
        update.validate()?;
        self.send::<serde_json::Value, _>(
            Method::PUT,
            &["admin", "products", id.as_str()],
            Some(update),
        )
        .await?;
        self.api().invalidate_all().await;
        Ok(())
    }

    /// Remove a product from the catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: &ProductId) -> Result<()> {
        self.send::<serde_json::Value, ()>(Method::DELETE, &["admin", "products", id.as_str()], None)
            .await?;
        self.api().invalidate_all().await;
        info!("Product deleted");
        Ok(())
    }
}
