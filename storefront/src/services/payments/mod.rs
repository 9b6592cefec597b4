// storefront/src/services/payments/mod.rs

//! Hosted-checkout gateway contract plus its adapters.

pub mod metadata;
pub mod mock;
pub mod signature;
pub mod stripe;

use crate::errors::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

pub use metadata::{MetadataItem, OrderMetadata};
pub use mock::MockGateway;
pub use signature::WebhookVerifier;
pub use stripe::StripeGateway;

/// A priced line sent to the hosted checkout page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutLine {
  pub product_id: Uuid,
  pub name: String,
  pub unit_amount_cents: i64,
  pub quantity: i32,
}

#[derive(Debug, Clone)]
pub struct CheckoutSessionRequest {
  pub lines: Vec<CheckoutLine>,
  pub currency: String,
  pub customer_email: String,
  pub success_url: String,
  pub cancel_url: String,
  pub metadata: BTreeMap<String, String>,
}

impl CheckoutSessionRequest {
  pub fn amount_total_cents(&self) -> i64 {
    self.lines.iter().map(|l| l.unit_amount_cents * l.quantity as i64).sum()
  }
}

/// Handle returned when a hosted checkout is opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
  pub session_id: String,
  pub redirect_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
  Paid,
  Unpaid,
  NoPaymentRequired,
}

impl PaymentStatus {
  /// Whether the buyer owes nothing more for this session.
  pub fn is_settled(&self) -> bool {
    matches!(self, PaymentStatus::Paid | PaymentStatus::NoPaymentRequired)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentStatus::Paid => "paid",
      PaymentStatus::Unpaid => "unpaid",
      PaymentStatus::NoPaymentRequired => "no_payment_required",
    }
  }
}

/// The gateway's authoritative view of a checkout session.
#[derive(Debug, Clone)]
pub struct PaymentSession {
  pub id: String,
  pub payment_status: PaymentStatus,
  pub amount_total_cents: Option<i64>,
  pub currency: Option<String>,
  pub customer_email: Option<String>,
  pub metadata: BTreeMap<String, String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  fn name(&self) -> &'static str;

  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession>;

  /// `Ok(None)` when the gateway has no such session.
  async fn retrieve_session(&self, session_id: &str) -> Result<Option<PaymentSession>>;
}
