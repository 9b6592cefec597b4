// storefront/src/workflows/reconcile.rs

//! Turns a paid gateway session into exactly one order.
//!
//! Safe to run any number of times for the same session, concurrently or not:
//! the early lookup short-circuits repeats, and the unique payment session id
//! in the store settles races between callers that both miss it.

use super::contexts::ReconcileCtx;
use crate::errors::AppError;
use crate::models::{NewUser, OrderDetail, OrderStatus, Principal};
use crate::services::payments::OrderMetadata;
use crate::store::{NewOrder, NewOrderItem};
use glowmart_flow::{FlowData, StepControl, StepSpec, Workflow};
use tracing::{debug, info, instrument, warn};

pub fn reconcile_workflow() -> Workflow<ReconcileCtx, AppError> {
  let mut wf = Workflow::<ReconcileCtx, AppError>::new(
    "reconcile_payment",
    vec![
      StepSpec::required("find_existing_order"),
      StepSpec::required("retrieve_payment_session"),
      StepSpec::required("verify_payment"),
      StepSpec::required("extract_order_data"),
      StepSpec::required("resolve_customer"),
      StepSpec::required("persist_order"),
    ],
  );
  wf.on("find_existing_order", find_existing_order);
  wf.on("retrieve_payment_session", retrieve_payment_session);
  wf.on("verify_payment", verify_payment);
  wf.on("extract_order_data", extract_order_data);
  wf.on("resolve_customer", resolve_customer);
  wf.on("persist_order", persist_order);
  wf
}

/// An existing order goes back only to its owner, an admin, or an anonymous
/// (webhook) caller.
fn ensure_visible(principal: Option<&Principal>, existing: &OrderDetail) -> Result<(), AppError> {
  match principal {
    Some(p) if !p.can_view(&existing.order.user_id) => {
      warn!(caller = %p.id, order_id = %existing.order.id, "caller asked for another user's order");
      Err(AppError::Forbidden("This payment belongs to another account".to_string()))
    }
    _ => Ok(()),
  }
}

#[instrument(name = "reconcile::find_existing_order", skip_all)]
async fn find_existing_order(data: FlowData<ReconcileCtx>) -> Result<StepControl, AppError> {
  let (store, session_id, principal) = {
    let guard = data.read();
    (guard.app_state.store.clone(), guard.session_id.clone(), guard.principal.clone())
  };
  if session_id.trim().is_empty() {
    return Err(AppError::InvalidInput("sessionId is required".to_string()));
  }
  match store.get_order_by_payment_session(&session_id).await? {
    Some(existing) => {
      debug!(order_id = %existing.order.id, "order already exists for session");
      ensure_visible(principal.as_ref(), &existing)?;
      data.write().order = Some(existing);
      Ok(StepControl::Halt)
    }
    None => Ok(StepControl::Continue),
  }
}

#[instrument(name = "reconcile::retrieve_payment_session", skip_all)]
async fn retrieve_payment_session(data: FlowData<ReconcileCtx>) -> Result<StepControl, AppError> {
  let (gateway, session_id) = {
    let guard = data.read();
    (guard.app_state.gateway.clone(), guard.session_id.clone())
  };
  let session = gateway
    .retrieve_session(&session_id)
    .await?
    .ok_or_else(|| AppError::PaymentNotFound(format!("No payment session {}", session_id)))?;
  data.write().payment = Some(session);
  Ok(StepControl::Continue)
}

async fn verify_payment(data: FlowData<ReconcileCtx>) -> Result<StepControl, AppError> {
  let guard = data.read();
  let status = guard
    .payment
    .as_ref()
    .map(|p| p.payment_status)
    .ok_or_else(|| AppError::Internal("Payment session was not loaded".to_string()))?;
  if !status.is_settled() {
    info!(session_id = %guard.session_id, status = status.as_str(), "payment not complete yet");
    return Err(AppError::PaymentIncomplete(format!(
      "Payment for session {} is {}",
      guard.session_id,
      status.as_str()
    )));
  }
  Ok(StepControl::Continue)
}

async fn extract_order_data(data: FlowData<ReconcileCtx>) -> Result<StepControl, AppError> {
  let mut guard = data.write();
  let payment = guard
    .payment
    .as_ref()
    .ok_or_else(|| AppError::Internal("Payment session was not loaded".to_string()))?;
  let metadata = OrderMetadata::decode(&payment.metadata).map_err(|e| {
    warn!(session_id = %payment.id, error = %e, "paid session carries no usable cart");
    e
  })?;
  guard.metadata = Some(metadata);
  Ok(StepControl::Continue)
}

/// Picks the order owner: the user recorded at checkout, matched to a local
/// account by id, then by email, and created lazily if neither exists.
#[instrument(name = "reconcile::resolve_customer", skip_all)]
async fn resolve_customer(data: FlowData<ReconcileCtx>) -> Result<StepControl, AppError> {
  let (store, principal, metadata, session_email) = {
    let guard = data.read();
    let metadata = guard
      .metadata
      .clone()
      .ok_or_else(|| AppError::Internal("Order data was not extracted".to_string()))?;
    let session_email = guard.payment.as_ref().and_then(|p| p.customer_email.clone());
    (guard.app_state.store.clone(), guard.principal.clone(), metadata, session_email)
  };

  let owner_id = metadata.user_id.clone();
  let caller_is_owner = principal.as_ref().is_some_and(|p| p.id == owner_id);
  if let Some(p) = &principal {
    if !caller_is_owner && !p.is_admin() {
      warn!(caller = %p.id, "caller tried to reconcile another user's payment");
      return Err(AppError::Forbidden("This payment belongs to another account".to_string()));
    }
  }

  let email = metadata
    .customer_email
    .clone()
    .or(session_email)
    .or_else(|| principal.as_ref().filter(|_| caller_is_owner).map(|p| p.email.clone()));
  let name = principal.as_ref().filter(|_| caller_is_owner).and_then(|p| p.name.clone());

  let user = match store.get_user(&owner_id).await? {
    Some(user) => user,
    None => {
      let email = email
        .clone()
        .ok_or_else(|| AppError::MissingOrderData("No customer email for a new account".to_string()))?;
      match store.get_user_by_email(&email).await? {
        Some(linked) => {
          info!(user_id = %linked.id, "linked payment to existing account by email");
          linked
        }
        None => {
          let inserted = store
            .insert_user_if_absent(&NewUser {
              id: owner_id.clone(),
              email: email.clone(),
              name: name.clone(),
            })
            .await?;
          debug!(inserted, "lazy account creation");
          // A concurrent caller may have won the insert; read back either way.
          match store.get_user(&owner_id).await? {
            Some(user) => user,
            None => store
              .get_user_by_email(&email)
              .await?
              .ok_or_else(|| AppError::Internal(format!("Account {} vanished after insert", owner_id)))?,
          }
        }
      }
    }
  };

  let mut guard = data.write();
  guard.customer_email = email.or_else(|| Some(user.email.clone()));
  guard.customer_name = name.or(user.name);
  guard.user_id = Some(user.id);
  Ok(StepControl::Continue)
}

#[instrument(name = "reconcile::persist_order", skip_all)]
async fn persist_order(data: FlowData<ReconcileCtx>) -> Result<StepControl, AppError> {
  let (store, new_order, principal) = {
    let guard = data.read();
    let missing = || AppError::Internal("Reconciliation reached persist_order without its inputs".to_string());
    let metadata = guard.metadata.as_ref().ok_or_else(missing)?;
    let payment = guard.payment.as_ref().ok_or_else(missing)?;
    let user_id = guard.user_id.clone().ok_or_else(missing)?;

    let items_total = metadata.items_total_cents();
    let total = payment.amount_total_cents.unwrap_or(items_total);
    if total != items_total {
      // Discounts, tax or shipping added at the gateway.
      warn!(charged = total, items_total, "charged amount differs from item total");
    }
    let new_order = NewOrder {
      user_id,
      total_amount_cents: total,
      currency: payment
        .currency
        .clone()
        .unwrap_or_else(|| guard.app_state.config.currency.clone()),
      shipping_address: metadata.shipping_address.clone(),
      payment_session_id: guard.session_id.clone(),
      items: metadata
        .items
        .iter()
        .map(|i| NewOrderItem {
          product_id: i.product_id,
          quantity: i.quantity,
          price_cents: i.price_cents,
        })
        .collect(),
    };
    (guard.app_state.store.clone(), new_order, guard.principal.clone())
  };

  match store.create_order(&new_order).await {
    Ok(detail) => {
      info!(order_id = %detail.order.id, total_cents = detail.order.total_amount_cents, "order created from payment");
      let mut guard = data.write();
      guard.order = Some(detail);
      guard.created = true;
      Ok(StepControl::Continue)
    }
    Err(AppError::DuplicatePayment(_)) => {
      // Lost the race to another caller; theirs is the order.
      let existing = store
        .get_order_by_payment_session(&new_order.payment_session_id)
        .await?
        .ok_or_else(|| AppError::Internal("Duplicate payment reported but no order found".to_string()))?;
      ensure_visible(principal.as_ref(), &existing)?;
      info!(order_id = %existing.order.id, "concurrent reconciliation already created the order");
      data.write().order = Some(existing);
      Ok(StepControl::Halt)
    }
    Err(e) => Err(e),
  }
}

/// Sends the order confirmation for a run that created the order. Called
/// once the workflow has finished, outside the request timeout, since the
/// order is already committed. Mail failures are logged and swallowed.
#[instrument(name = "reconcile::send_confirmation", skip_all)]
pub async fn send_confirmation(data: &FlowData<ReconcileCtx>) {
  let (notifier, detail, email, name) = {
    let guard = data.read();
    if !guard.created {
      return;
    }
    (
      guard.app_state.notifier.clone(),
      guard.order.clone(),
      guard.customer_email.clone(),
      guard.customer_name.clone(),
    )
  };
  let (Some(detail), Some(email)) = (detail, email) else {
    warn!("skipping confirmation: order or recipient missing");
    return;
  };
  match notifier
    .notify_status(OrderStatus::Processing, &detail, &email, name.as_deref())
    .await
  {
    Ok(_) => data.write().confirmation_sent = true,
    Err(e) => warn!(order_id = %detail.order.id, error = %e, "confirmation email failed"),
  }
}
