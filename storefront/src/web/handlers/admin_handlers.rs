// storefront/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{EmailStatus, NewProduct, OrderStatus, ProductPatch};
use crate::services::{catalog, orders};
use crate::state::AppState;
use crate::web::auth::AdminPrincipal;
use crate::workflows::NotificationOutcome;

const DEFAULT_EMAIL_LOG_LIMIT: i64 = 50;
const MAX_EMAIL_LOG_LIMIT: i64 = 200;
const DEFAULT_ORDER_PAGE: i64 = 50;
const MAX_ORDER_PAGE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct AdminOrdersQuery {
  pub status: Option<String>,
  pub limit: Option<i64>,
  pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatePayload {
  pub status: String,
  #[serde(default)]
  pub tracking_number: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EmailLogQuery {
  pub status: Option<String>,
  pub limit: Option<i64>,
}

#[instrument(name = "handler::admin_list_orders", skip(app_state, admin), fields(admin_id = %admin.0.id))]
pub async fn list_orders_handler(
  app_state: web::Data<AppState>,
  admin: AdminPrincipal,
  query: web::Query<AdminOrdersQuery>,
) -> Result<HttpResponse, AppError> {
  let status = match query.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
    Some(raw) => Some(raw.parse::<OrderStatus>()?),
    None => None,
  };
  let limit = query.limit.unwrap_or(DEFAULT_ORDER_PAGE).clamp(1, MAX_ORDER_PAGE);
  let offset = query.offset.unwrap_or(0).max(0);
  let orders = app_state.store.list_orders(status, limit, offset).await?;
  Ok(HttpResponse::Ok().json(json!({ "orders": orders, "limit": limit, "offset": offset })))
}

#[instrument(
  name = "handler::admin_update_order_status",
  skip(app_state, admin, path, body),
  fields(admin_id = %admin.0.id, order_id = %path.as_ref(), status = %body.status)
)]
pub async fn update_order_status_handler(
  app_state: web::Data<AppState>,
  admin: AdminPrincipal,
  path: web::Path<Uuid>,
  body: web::Json<StatusUpdatePayload>,
) -> Result<HttpResponse, AppError> {
  let StatusUpdatePayload { status, tracking_number } = body.into_inner();
  let change = orders::update_status(&app_state, path.into_inner(), &status, tracking_number).await?;
  let (sent, error) = match &change.notification {
    NotificationOutcome::Sent { .. } => (Some(true), None),
    NotificationOutcome::Failed { error } => (Some(false), Some(error.clone())),
    NotificationOutcome::NotApplicable | NotificationOutcome::NotAttempted => (None, None),
  };
  info!(order_id = %change.order.order.id, notification_sent = ?sent, "status updated by admin");
  Ok(HttpResponse::Ok().json(json!({
    "order": change.order,
    "notification": { "sent": sent, "error": error },
  })))
}

#[instrument(name = "handler::admin_create_product", skip(app_state, admin, body), fields(admin_id = %admin.0.id))]
pub async fn create_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminPrincipal,
  body: web::Json<NewProduct>,
) -> Result<HttpResponse, AppError> {
  let product = catalog::create_product(app_state.store.as_ref(), body.into_inner()).await?;
  Ok(HttpResponse::Created().json(product))
}

#[instrument(name = "handler::admin_update_product", skip(app_state, admin, path, body), fields(admin_id = %admin.0.id, product_id = %path.as_ref()))]
pub async fn update_product_handler(
  app_state: web::Data<AppState>,
  admin: AdminPrincipal,
  path: web::Path<Uuid>,
  body: web::Json<ProductPatch>,
) -> Result<HttpResponse, AppError> {
  let product = catalog::update_product(app_state.store.as_ref(), path.into_inner(), body.into_inner()).await?;
  Ok(HttpResponse::Ok().json(product))
}

#[instrument(name = "handler::admin_list_emails", skip(app_state, admin), fields(admin_id = %admin.0.id))]
pub async fn list_email_logs_handler(
  app_state: web::Data<AppState>,
  admin: AdminPrincipal,
  query: web::Query<EmailLogQuery>,
) -> Result<HttpResponse, AppError> {
  let status = match query.status.as_deref().map(|s| s.trim().to_ascii_uppercase()).as_deref() {
    None | Some("") => None,
    Some("SENT") => Some(EmailStatus::Sent),
    Some("FAILED") => Some(EmailStatus::Failed),
    Some(other) => {
      return Err(AppError::InvalidInput(format!(
        "'{}' is not an email status; expected SENT or FAILED",
        other
      )))
    }
  };
  let limit = query.limit.unwrap_or(DEFAULT_EMAIL_LOG_LIMIT).clamp(1, MAX_EMAIL_LOG_LIMIT);
  let emails = app_state.store.list_email_logs(status, limit).await?;
  Ok(HttpResponse::Ok().json(json!({ "emails": emails, "limit": limit })))
}
