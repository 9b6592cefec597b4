// storefront/src/workflows/webhook.rs

//! Intake for signed payment-gateway events.

use super::contexts::{ReconcileCtx, WebhookCtx, WebhookEvent, WebhookOutcome};
use crate::errors::AppError;
use glowmart_flow::{FlowData, StepControl, StepSpec, Workflow};
use tracing::{info, instrument, warn};

/// Event types that mean a checkout session may now be paid.
pub const SETTLEMENT_EVENTS: [&str; 2] = ["checkout.session.completed", "checkout.session.async_payment_succeeded"];

pub fn webhook_workflow() -> Workflow<WebhookCtx, AppError> {
  let mut wf = Workflow::<WebhookCtx, AppError>::new(
    "payment_webhook",
    vec![
      StepSpec::required("verify_signature"),
      StepSpec::required("parse_event"),
      StepSpec::required("reconcile_session"),
    ],
  );

  wf.on("verify_signature", |data: FlowData<WebhookCtx>| async move {
    let guard = data.read();
    let header = guard
      .signature
      .as_deref()
      .ok_or_else(|| AppError::Unauthorized("Missing webhook signature".to_string()))?;
    guard.app_state.webhook_verifier.verify(&guard.payload, header)?;
    Ok::<_, AppError>(StepControl::Continue)
  });

  wf.on("parse_event", parse_event);
  wf.on("reconcile_session", reconcile_session);
  wf
}

async fn parse_event(data: FlowData<WebhookCtx>) -> Result<StepControl, AppError> {
  let mut guard = data.write();
  let event: WebhookEvent = serde_json::from_slice(&guard.payload)
    .map_err(|e| AppError::InvalidInput(format!("Unreadable webhook payload: {}", e)))?;
  if !SETTLEMENT_EVENTS.contains(&event.event_type.as_str()) {
    info!(event_id = %event.id, event_type = %event.event_type, "ignoring webhook event");
    guard.outcome = WebhookOutcome::Ignored {
      event_type: event.event_type.clone(),
    };
    guard.event = Some(event);
    return Ok(StepControl::Halt);
  }
  guard.event = Some(event);
  Ok(StepControl::Continue)
}

/// Runs reconciliation for the event's session as a nested workflow.
#[instrument(name = "webhook::reconcile_session", skip_all)]
async fn reconcile_session(data: FlowData<WebhookCtx>) -> Result<StepControl, AppError> {
  let (app_state, event_id, session_id) = {
    let guard = data.read();
    let event = guard
      .event
      .as_ref()
      .ok_or_else(|| AppError::Internal("Webhook event was not parsed".to_string()))?;
    (guard.app_state.clone(), event.id.clone(), event.data.object.id.clone())
  };

  let ctx = ReconcileCtx::new(app_state.clone(), session_id.clone(), None);
  let outcome = match app_state.run_workflow(ctx).await {
    Ok((_, result)) => {
      let outcome = {
        let guard = result.read();
        let order = guard
          .order
          .as_ref()
          .ok_or_else(|| AppError::Internal("Reconciliation finished without an order".to_string()))?;
        WebhookOutcome::Reconciled {
          order_id: order.order.id,
          created: guard.created,
        }
      };
      data.write().reconciliation = Some(result);
      outcome
    }
    Err(AppError::PaymentIncomplete(reason)) => {
      // Delayed payment methods settle later and send another event.
      info!(%event_id, %session_id, %reason, "session not paid yet; acknowledging");
      WebhookOutcome::AwaitingPayment
    }
    Err(e) => {
      warn!(%event_id, %session_id, error = %e, "webhook reconciliation failed; gateway will redeliver");
      return Err(e);
    }
  };
  data.write().outcome = outcome;
  Ok(StepControl::Continue)
}
