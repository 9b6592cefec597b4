// storefront/src/workflows/contexts.rs

//! Context types the workflows run over. Each handler receives these wrapped
//! in `FlowData`.

use crate::models::{OrderDetail, OrderStatus, Principal, ShippingAddress};
use crate::services::payments::{CheckoutLine, CheckoutSession, OrderMetadata, PaymentSession};
use crate::state::AppState;
use glowmart_flow::FlowData;
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub product_id: Uuid,
  pub quantity: i32,
  /// Display name from the client; the catalog name is used instead.
  #[serde(default)]
  pub name: Option<String>,
  /// Client-side price; the catalog price is charged instead.
  #[serde(default, alias = "price")]
  pub price_cents: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
  pub items: Vec<CartLine>,
  pub email: String,
  pub shipping_address: ShippingAddress,
}

#[derive(Clone)]
pub struct CheckoutCtx {
  pub app_state: AppState,
  pub principal: Principal,
  pub request: CheckoutRequest,
  /// Cart merged by product.
  pub cart: Vec<(Uuid, i32)>,
  pub lines: Vec<CheckoutLine>,
  pub metadata: Option<OrderMetadata>,
  pub session: Option<CheckoutSession>,
}

impl CheckoutCtx {
  pub fn new(app_state: AppState, principal: Principal, request: CheckoutRequest) -> Self {
    Self {
      app_state,
      principal,
      request,
      cart: Vec::new(),
      lines: Vec::new(),
      metadata: None,
      session: None,
    }
  }
}

#[derive(Clone)]
pub struct ReconcileCtx {
  pub app_state: AppState,
  pub session_id: String,
  /// `None` when driven by a webhook delivery.
  pub principal: Option<Principal>,
  pub payment: Option<PaymentSession>,
  pub metadata: Option<OrderMetadata>,
  pub user_id: Option<String>,
  pub customer_email: Option<String>,
  pub customer_name: Option<String>,
  pub order: Option<OrderDetail>,
  /// True only for the call that actually wrote the order.
  pub created: bool,
  pub confirmation_sent: bool,
}

impl ReconcileCtx {
  pub fn new(app_state: AppState, session_id: impl Into<String>, principal: Option<Principal>) -> Self {
    Self {
      app_state,
      session_id: session_id.into(),
      principal,
      payment: None,
      metadata: None,
      user_id: None,
      customer_email: None,
      customer_name: None,
      order: None,
      created: false,
      confirmation_sent: false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationOutcome {
  NotAttempted,
  /// The status has no email template.
  NotApplicable,
  Sent { message_id: String },
  Failed { error: String },
}

#[derive(Clone)]
pub struct StatusCtx {
  pub app_state: AppState,
  pub order_id: Uuid,
  pub requested_status: String,
  pub tracking_number: Option<String>,
  pub target: Option<OrderStatus>,
  pub current: Option<OrderDetail>,
  pub updated: Option<OrderDetail>,
  pub notification: NotificationOutcome,
}

impl StatusCtx {
  pub fn new(app_state: AppState, order_id: Uuid, requested_status: String, tracking_number: Option<String>) -> Self {
    Self {
      app_state,
      order_id,
      requested_status,
      tracking_number,
      target: None,
      current: None,
      updated: None,
      notification: NotificationOutcome::NotAttempted,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
  pub id: String,
  #[serde(rename = "type")]
  pub event_type: String,
  pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
  pub object: WebhookObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookObject {
  pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
  Pending,
  Ignored { event_type: String },
  Reconciled { order_id: Uuid, created: bool },
  /// Payment not settled yet; the gateway will send a later event.
  AwaitingPayment,
}

#[derive(Clone)]
pub struct WebhookCtx {
  pub app_state: AppState,
  pub payload: Vec<u8>,
  pub signature: Option<String>,
  pub event: Option<WebhookEvent>,
  pub outcome: WebhookOutcome,
  /// The nested reconciliation, kept so its confirmation can go out after
  /// the webhook run finishes.
  pub reconciliation: Option<FlowData<ReconcileCtx>>,
}

impl WebhookCtx {
  pub fn new(app_state: AppState, payload: Vec<u8>, signature: Option<String>) -> Self {
    Self {
      app_state,
      payload,
      signature,
      event: None,
      outcome: WebhookOutcome::Pending,
      reconciliation: None,
    }
  }
}
