// storefront/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::models::Principal;
use crate::services::orders;
use crate::state::AppState;
use crate::workflows::CheckoutRequest;

/// Opens a hosted checkout and hands back where to send the buyer.
#[instrument(name = "handler::start_checkout", skip(app_state, principal, body), fields(user_id = %principal.id, lines = body.items.len()))]
pub async fn start_checkout_handler(
  app_state: web::Data<AppState>,
  principal: Principal,
  body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
  let session = orders::start_checkout(&app_state, principal, body.into_inner()).await?;
  info!(session_id = %session.session_id, "redirecting buyer to payment gateway");
  Ok(HttpResponse::Ok().json(session))
}

/// Client fallback poll after returning from the gateway. Payment errors are
/// surfaced so the client can try again shortly.
#[instrument(name = "handler::order_for_session", skip(app_state, principal, path), fields(user_id = %principal.id))]
pub async fn order_for_session_handler(
  app_state: web::Data<AppState>,
  principal: Principal,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let session_id = path.into_inner();
  let result = orders::reconcile(&app_state, &session_id, Some(principal)).await?;
  Ok(HttpResponse::Ok().json(result.order))
}
