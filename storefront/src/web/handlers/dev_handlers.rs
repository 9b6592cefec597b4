// storefront/src/web/handlers/dev_handlers.rs

//! Routes that only exist with the in-process payment gateway.

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::orders;
use crate::state::AppState;

/// Plays the hosted checkout page: marks the session paid, then reconciles
/// it the way a webhook delivery would.
#[instrument(name = "handler::dev_complete_payment", skip(app_state, path), fields(session_id = %path.as_ref()))]
pub async fn complete_mock_payment_handler(
  app_state: web::Data<AppState>,
  path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let session_id = path.into_inner();
  let mock = app_state
    .mock_gateway
    .as_ref()
    .ok_or_else(|| AppError::NotFound("Mock payments are disabled".to_string()))?;
  if !mock.mark_paid(&session_id) {
    return Err(AppError::PaymentNotFound(format!("No payment session {}", session_id)));
  }
  let result = orders::reconcile(&app_state, &session_id, None).await?;
  info!(order_id = %result.order.order.id, "mock payment completed");
  Ok(HttpResponse::Ok().json(result.order))
}
