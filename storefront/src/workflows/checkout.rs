// storefront/src/workflows/checkout.rs

//! Opens a hosted checkout for a cart. Nothing is persisted here; the order
//! only exists once reconciliation sees a paid session.

use super::contexts::CheckoutCtx;
use crate::errors::AppError;
use crate::services::payments::{CheckoutLine, CheckoutSessionRequest, MetadataItem, OrderMetadata};
use glowmart_flow::{FlowData, StepControl, StepSpec, Workflow};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub const MAX_LINE_QUANTITY: i32 = 99;

pub fn checkout_workflow() -> Workflow<CheckoutCtx, AppError> {
  let mut wf = Workflow::<CheckoutCtx, AppError>::new(
    "checkout",
    vec![
      StepSpec::required("validate_cart"),
      StepSpec::required("price_cart"),
      StepSpec::required("create_gateway_session"),
    ],
  );
  wf.on("validate_cart", validate_cart);
  wf.on("price_cart", price_cart);
  wf.on("create_gateway_session", create_gateway_session);
  wf
}

#[instrument(name = "checkout::validate_cart", skip_all)]
async fn validate_cart(data: FlowData<CheckoutCtx>) -> Result<StepControl, AppError> {
  let mut guard = data.write();
  let request = &guard.request;
  if request.items.is_empty() {
    return Err(AppError::InvalidInput("Cart is empty".to_string()));
  }
  let email = request.email.trim();
  if email.is_empty() || !email.contains('@') {
    return Err(AppError::InvalidInput("A valid email is required".to_string()));
  }
  request.shipping_address.validate()?;

  let mut merged: Vec<(Uuid, i32)> = Vec::new();
  for line in &request.items {
    if line.quantity <= 0 {
      return Err(AppError::InvalidInput(format!(
        "Quantity for product {} must be positive",
        line.product_id
      )));
    }
    match merged.iter_mut().find(|(id, _)| *id == line.product_id) {
      Some((_, qty)) => *qty += line.quantity,
      None => merged.push((line.product_id, line.quantity)),
    }
  }
  if let Some((id, qty)) = merged.iter().find(|(_, qty)| *qty > MAX_LINE_QUANTITY) {
    return Err(AppError::InvalidInput(format!(
      "Quantity {} for product {} exceeds the limit of {}",
      qty, id, MAX_LINE_QUANTITY
    )));
  }
  guard.cart = merged;
  Ok(StepControl::Continue)
}

#[instrument(name = "checkout::price_cart", skip_all)]
async fn price_cart(data: FlowData<CheckoutCtx>) -> Result<StepControl, AppError> {
  let (store, cart, client_prices) = {
    let guard = data.read();
    let client_prices: Vec<(Uuid, Option<i64>)> =
      guard.request.items.iter().map(|l| (l.product_id, l.price_cents)).collect();
    (guard.app_state.store.clone(), guard.cart.clone(), client_prices)
  };

  let ids: Vec<Uuid> = cart.iter().map(|(id, _)| *id).collect();
  let products = store.get_products(&ids).await?;

  let mut lines = Vec::with_capacity(cart.len());
  for (product_id, quantity) in &cart {
    let product = products
      .iter()
      .find(|p| p.id == *product_id)
      .ok_or_else(|| AppError::NotFound(format!("Product {} not found", product_id)))?;
    if product.stock < *quantity {
      return Err(AppError::InsufficientStock(format!(
        "Only {} of {} left in stock",
        product.stock, product.name
      )));
    }
    let client_price = client_prices.iter().find(|(id, _)| id == product_id).and_then(|(_, p)| *p);
    if let Some(client_price) = client_price.filter(|p| *p != product.price_cents) {
      warn!(product_id = %product_id, client_price, catalog_price = product.price_cents, "cart price is stale; charging catalog price");
    }
    lines.push(CheckoutLine {
      product_id: product.id,
      name: format!("{} {}", product.brand, product.name),
      unit_amount_cents: product.price_cents,
      quantity: *quantity,
    });
  }

  let mut guard = data.write();
  let metadata = OrderMetadata {
    user_id: guard.principal.id.clone(),
    customer_email: Some(guard.request.email.trim().to_string()),
    shipping_address: guard.request.shipping_address.clone(),
    items: lines
      .iter()
      .map(|l| MetadataItem {
        product_id: l.product_id,
        quantity: l.quantity,
        price_cents: l.unit_amount_cents,
      })
      .collect(),
  };
  guard.lines = lines;
  guard.metadata = Some(metadata);
  Ok(StepControl::Continue)
}

#[instrument(name = "checkout::create_gateway_session", skip_all)]
async fn create_gateway_session(data: FlowData<CheckoutCtx>) -> Result<StepControl, AppError> {
  let (gateway, request) = {
    let guard = data.read();
    let metadata = guard
      .metadata
      .as_ref()
      .ok_or_else(|| AppError::Internal("Cart was not priced before opening a session".to_string()))?;
    let config = &guard.app_state.config;
    let request = CheckoutSessionRequest {
      lines: guard.lines.clone(),
      currency: config.currency.clone(),
      customer_email: guard.request.email.trim().to_string(),
      success_url: format!("{}/checkout/success?session_id={{CHECKOUT_SESSION_ID}}", config.app_base_url),
      cancel_url: format!("{}/cart", config.app_base_url),
      metadata: metadata.encode()?,
    };
    (guard.app_state.gateway.clone(), request)
  };

  let session = gateway.create_checkout_session(&request).await.map_err(|e| {
    warn!(gateway = gateway.name(), error = %e, "checkout session creation failed");
    AppError::CheckoutInitiationFailed(format!("Could not start checkout: {}", e))
  })?;
  info!(session_id = %session.session_id, amount_cents = request.amount_total_cents(), "checkout session opened");
  data.write().session = Some(session);
  Ok(StepControl::Continue)
}

