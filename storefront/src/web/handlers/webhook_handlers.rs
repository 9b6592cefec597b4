// storefront/src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{info, instrument};

use crate::errors::AppError;
use crate::services::orders;
use crate::services::payments::signature::SIGNATURE_HEADER;
use crate::state::AppState;
use crate::workflows::WebhookOutcome;

/// Receives gateway events. A 2xx tells the gateway to stop redelivering, so
/// only genuine processing failures return an error status.
#[instrument(name = "handler::payment_webhook", skip(app_state, req, body), fields(bytes = body.len()))]
pub async fn payment_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> Result<HttpResponse, AppError> {
  let signature = req
    .headers()
    .get(SIGNATURE_HEADER)
    .and_then(|v| v.to_str().ok())
    .map(String::from);

  let outcome = orders::handle_webhook(&app_state, body.to_vec(), signature).await?;
  let body = match &outcome {
    WebhookOutcome::Reconciled { order_id, created } => {
      info!(%order_id, created, "webhook reconciled order");
      json!({ "received": true, "orderId": order_id, "created": created })
    }
    WebhookOutcome::AwaitingPayment => json!({ "received": true, "status": "awaiting_payment" }),
    WebhookOutcome::Ignored { event_type } => json!({ "received": true, "ignored": event_type }),
    WebhookOutcome::Pending => json!({ "received": true }),
  };
  Ok(HttpResponse::Ok().json(body))
}
