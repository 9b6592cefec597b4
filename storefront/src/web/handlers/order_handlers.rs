// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::Principal;
use crate::services::orders;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
  pub session_id: String,
}

#[instrument(name = "handler::list_my_orders", skip(app_state, principal), fields(user_id = %principal.id))]
pub async fn list_my_orders_handler(app_state: web::Data<AppState>, principal: Principal) -> Result<HttpResponse, AppError> {
  let orders = app_state.store.list_orders_for_user(&principal.id).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders })))
}

#[instrument(name = "handler::get_order", skip(app_state, principal, path), fields(user_id = %principal.id, order_id = %path.as_ref()))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  principal: Principal,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let detail = orders::order_for(&app_state, &principal, path.into_inner()).await?;
  Ok(HttpResponse::Ok().json(detail))
}

/// Creates (or returns) the order for a completed payment session. 201 when
/// this call created it, 200 when it already existed.
#[instrument(name = "handler::create_order_from_session", skip(app_state, principal, body), fields(user_id = %principal.id, session_id = %body.session_id))]
pub async fn create_order_from_session_handler(
  app_state: web::Data<AppState>,
  principal: Principal,
  body: web::Json<CreateOrderPayload>,
) -> Result<HttpResponse, AppError> {
  let result = orders::reconcile(&app_state, &body.session_id, Some(principal)).await?;
  if result.created {
    Ok(HttpResponse::Created().json(result.order))
  } else {
    Ok(HttpResponse::Ok().json(result.order))
  }
}
