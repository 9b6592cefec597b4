// storefront/src/services/orders.rs

//! Entry points for the order lifecycle. Each runs the matching workflow and
//! shapes its context into a result.

use crate::errors::{AppError, Result};
use crate::models::{OrderDetail, Principal};
use crate::services::payments::CheckoutSession;
use crate::state::AppState;
use crate::workflows::reconcile::send_confirmation;
use crate::workflows::status::notify_customer;
use crate::workflows::{
  CheckoutCtx, CheckoutRequest, NotificationOutcome, ReconcileCtx, StatusCtx, WebhookCtx, WebhookOutcome,
};
use glowmart_flow::FlowOutcome;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct Reconciled {
  pub order: OrderDetail,
  /// False when the order already existed.
  pub created: bool,
}

#[derive(Debug, Clone)]
pub struct StatusChange {
  pub order: OrderDetail,
  pub notification: NotificationOutcome,
}

#[instrument(name = "orders::start_checkout", skip(state, principal, request), fields(user_id = %principal.id))]
pub async fn start_checkout(state: &AppState, principal: Principal, request: CheckoutRequest) -> Result<CheckoutSession> {
  let (_, data) = state
    .run_workflow(CheckoutCtx::new(state.clone(), principal, request))
    .await?;
  let session = data.write().session.take();
  session.ok_or_else(|| AppError::Internal("Checkout finished without a session".to_string()))
}

/// Ensures exactly one order exists for `session_id`. The confirmation email
/// goes out after the workflow, so a slow mail provider cannot turn a
/// committed order into a timeout.
#[instrument(name = "orders::reconcile", skip(state, principal))]
pub async fn reconcile(state: &AppState, session_id: &str, principal: Option<Principal>) -> Result<Reconciled> {
  let (outcome, data) = state
    .run_workflow(ReconcileCtx::new(state.clone(), session_id, principal))
    .await?;
  send_confirmation(&data).await;
  let mut guard = data.write();
  let order = guard
    .order
    .take()
    .ok_or_else(|| AppError::Internal("Reconciliation finished without an order".to_string()))?;
  if let FlowOutcome::Halted { step } = &outcome {
    info!(order_id = %order.order.id, halted_at = %step, "returning existing order");
  }
  Ok(Reconciled {
    order,
    created: guard.created,
  })
}

/// Applies an admin status change. Notification trouble is reported, not
/// raised.
#[instrument(name = "orders::update_status", skip(state))]
pub async fn update_status(
  state: &AppState,
  order_id: Uuid,
  status: &str,
  tracking_number: Option<String>,
) -> Result<StatusChange> {
  let ctx = StatusCtx::new(state.clone(), order_id, status.to_string(), tracking_number);
  let (_, data) = state.run_workflow(ctx).await?;
  notify_customer(&data).await;
  let mut guard = data.write();
  let order = guard
    .updated
    .take()
    .ok_or_else(|| AppError::Internal("Status change finished without an order".to_string()))?;
  Ok(StatusChange {
    order,
    notification: guard.notification.clone(),
  })
}

#[instrument(name = "orders::handle_webhook", skip(state, payload, signature), fields(bytes = payload.len()))]
pub async fn handle_webhook(state: &AppState, payload: Vec<u8>, signature: Option<String>) -> Result<WebhookOutcome> {
  let (_, data) = state
    .run_workflow(WebhookCtx::new(state.clone(), payload, signature))
    .await?;
  let (outcome, reconciliation) = {
    let mut guard = data.write();
    (guard.outcome.clone(), guard.reconciliation.take())
  };
  if let Some(reconciliation) = reconciliation {
    send_confirmation(&reconciliation).await;
  }
  Ok(outcome)
}

/// An order as seen by `principal`: owners and admins only.
pub async fn order_for(state: &AppState, principal: &Principal, order_id: Uuid) -> Result<OrderDetail> {
  let detail = state
    .store
    .get_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
  if !principal.can_view(&detail.order.user_id) {
    return Err(AppError::Forbidden("You do not have access to this order".to_string()));
  }
  Ok(detail)
}
