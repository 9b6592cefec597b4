// storefront/src/workflows/status.rs

//! Admin-driven order status changes and their customer notifications.

use super::contexts::{NotificationOutcome, StatusCtx};
use crate::errors::AppError;
use crate::models::OrderStatus;
use glowmart_flow::{FlowData, StepControl, StepSpec, Workflow};
use tracing::{info, instrument, warn};

pub fn status_workflow() -> Workflow<StatusCtx, AppError> {
  let mut wf = Workflow::<StatusCtx, AppError>::new(
    "order_status_transition",
    vec![
      StepSpec::required("parse_status"),
      StepSpec::required("load_order"),
      StepSpec::required("check_transition"),
      StepSpec::required("apply_transition"),
    ],
  );

  wf.on("parse_status", |data: FlowData<StatusCtx>| async move {
    let target: OrderStatus = data.read().requested_status.parse()?;
    data.write().target = Some(target);
    Ok::<_, AppError>(StepControl::Continue)
  });

  wf.on("load_order", |data: FlowData<StatusCtx>| async move {
    let (store, order_id) = {
      let guard = data.read();
      (guard.app_state.store.clone(), guard.order_id)
    };
    let detail = store
      .get_order(order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
    data.write().current = Some(detail);
    Ok::<_, AppError>(StepControl::Continue)
  });

  wf.on("check_transition", check_transition);
  wf.on("apply_transition", apply_transition);
  wf
}

async fn check_transition(data: FlowData<StatusCtx>) -> Result<StepControl, AppError> {
  let guard = data.read();
  let (Some(current), Some(target)) = (guard.current.as_ref(), guard.target) else {
    return Err(AppError::Internal("Status transition inputs missing".to_string()));
  };
  let from = current.order.status;
  if !from.can_transition_to(target) {
    return Err(AppError::InvalidTransition(format!(
      "Order {} cannot move from {} to {}",
      current.order.id, from, target
    )));
  }
  if guard.tracking_number.is_some() && target != OrderStatus::Shipped {
    return Err(AppError::InvalidInput(
      "trackingNumber can only be set when marking an order SHIPPED".to_string(),
    ));
  }
  Ok(StepControl::Continue)
}

#[instrument(name = "status::apply_transition", skip_all)]
async fn apply_transition(data: FlowData<StatusCtx>) -> Result<StepControl, AppError> {
  let (store, order_id, from, target, tracking) = {
    let guard = data.read();
    let from = guard
      .current
      .as_ref()
      .map(|c| c.order.status)
      .ok_or_else(|| AppError::Internal("Order was not loaded".to_string()))?;
    let target = guard
      .target
      .ok_or_else(|| AppError::Internal("Target status was not parsed".to_string()))?;
    let tracking = guard
      .tracking_number
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .map(str::to_string);
    (guard.app_state.store.clone(), guard.order_id, from, target, tracking)
  };

  // Compare-and-set against the status we validated; a miss means another
  // writer changed the order in between.
  let updated = store
    .update_order_status(order_id, from, target, tracking.as_deref())
    .await?;
  if updated.is_none() {
    warn!(%order_id, %from, %target, "order changed while the transition was in flight");
    return Err(AppError::InvalidTransition(format!(
      "Order {} is no longer {}; reload and retry",
      order_id, from
    )));
  }
  let detail = store
    .get_order(order_id)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", order_id)))?;
  info!(%order_id, %from, %target, "order status changed");
  data.write().updated = Some(detail);
  Ok(StepControl::Continue)
}

/// Emails the customer about a committed transition and records the outcome
/// in the context. Runs after the workflow, outside the request timeout.
#[instrument(name = "status::notify_customer", skip_all)]
pub async fn notify_customer(data: &FlowData<StatusCtx>) {
  let (store, notifier, detail) = {
    let guard = data.read();
    (
      guard.app_state.store.clone(),
      guard.app_state.notifier.clone(),
      guard.updated.clone(),
    )
  };
  let Some(detail) = detail else {
    return;
  };
  let status = detail.order.status;

  let outcome = match store.get_user(&detail.order.user_id).await {
    Ok(Some(user)) => match notifier
      .notify_status(status, &detail, &user.email, user.name.as_deref())
      .await
    {
      Ok(Some(message_id)) => NotificationOutcome::Sent { message_id },
      Ok(None) => NotificationOutcome::NotApplicable,
      Err(e) => {
        warn!(order_id = %detail.order.id, error = %e, "status notification failed");
        NotificationOutcome::Failed { error: e.to_string() }
      }
    },
    Ok(None) => {
      warn!(order_id = %detail.order.id, "order owner has no account; notification skipped");
      NotificationOutcome::Failed {
        error: "order owner not found".to_string(),
      }
    }
    Err(e) => {
      warn!(order_id = %detail.order.id, error = %e, "could not load order owner");
      NotificationOutcome::Failed { error: e.to_string() }
    }
  };
  data.write().notification = outcome;
}
