// storefront/src/web/handlers/product_handlers.rs

use actix_web::{web, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::ProductQuery;
use crate::services::catalog;
use crate::state::AppState;

#[instrument(name = "handler::list_products", skip(app_state))]
pub async fn list_products_handler(
  app_state: web::Data<AppState>,
  query: web::Query<ProductQuery>,
) -> Result<HttpResponse, AppError> {
  let query = query.into_inner();
  let products = catalog::list_products(app_state.store.as_ref(), &query).await?;
  info!(count = products.len(), "products listed");
  Ok(HttpResponse::Ok().json(json!({
    "products": products,
    "limit": query.limit(),
    "offset": query.offset(),
  })))
}

#[instrument(name = "handler::get_product", skip(app_state, path), fields(product_id = %path.as_ref()))]
pub async fn get_product_handler(app_state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse, AppError> {
  let product = catalog::get_product(app_state.store.as_ref(), path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}
