// storefront/src/services/catalog.rs

use crate::errors::{AppError, Result};
use crate::models::{NewProduct, Product, ProductPatch, ProductQuery};
use crate::store::Store;
use tracing::{info, instrument};
use uuid::Uuid;

pub async fn list_products(store: &dyn Store, query: &ProductQuery) -> Result<Vec<Product>> {
  store.list_products(query).await
}

pub async fn get_product(store: &dyn Store, id: Uuid) -> Result<Product> {
  store
    .get_product(id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))
}

#[instrument(name = "catalog::create_product", skip_all, fields(name = %input.name))]
pub async fn create_product(store: &dyn Store, input: NewProduct) -> Result<Product> {
  input.validate()?;
  let product = store.insert_product(&input).await?;
  info!(product_id = %product.id, "product created");
  Ok(product)
}

/// Partial update. Existing order items keep their captured prices.
#[instrument(name = "catalog::update_product", skip(store, patch))]
pub async fn update_product(store: &dyn Store, id: Uuid, patch: ProductPatch) -> Result<Product> {
  if patch.is_empty() {
    return Err(AppError::InvalidInput("Nothing to update".to_string()));
  }
  patch.validate()?;
  store
    .update_product(id, &patch)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Product {} not found", id)))
}
