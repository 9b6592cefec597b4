// storefront/src/services/payments/stripe.rs

use super::{CheckoutSession, CheckoutSessionRequest, PaymentGateway, PaymentSession, PaymentStatus};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{error, info, instrument};

#[derive(Debug, Deserialize)]
struct SessionBody {
  id: String,
  url: Option<String>,
  payment_status: Option<String>,
  amount_total: Option<i64>,
  currency: Option<String>,
  customer_email: Option<String>,
  customer_details: Option<CustomerDetails>,
  #[serde(default)]
  metadata: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct CustomerDetails {
  email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
  error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
  message: Option<String>,
}

/// Stripe Checkout over its form-encoded REST API.
#[derive(Clone)]
pub struct StripeGateway {
  client: reqwest::Client,
  secret_key: String,
  api_base: String,
}

impl StripeGateway {
  pub fn new(secret_key: impl Into<String>, api_base: impl Into<String>, timeout: Duration) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build payment HTTP client: {}", e)))?;
    Ok(Self {
      client,
      secret_key: secret_key.into(),
      api_base: api_base.into(),
    })
  }

  fn form_for(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
      ("mode".to_string(), "payment".to_string()),
      ("success_url".to_string(), request.success_url.clone()),
      ("cancel_url".to_string(), request.cancel_url.clone()),
      ("customer_email".to_string(), request.customer_email.clone()),
    ];
    for (idx, line) in request.lines.iter().enumerate() {
      let prefix = format!("line_items[{}]", idx);
      form.push((format!("{}[quantity]", prefix), line.quantity.to_string()));
      form.push((format!("{}[price_data][currency]", prefix), request.currency.clone()));
      form.push((format!("{}[price_data][unit_amount]", prefix), line.unit_amount_cents.to_string()));
      form.push((format!("{}[price_data][product_data][name]", prefix), line.name.clone()));
    }
    for (key, value) in &request.metadata {
      form.push((format!("metadata[{}]", key), value.clone()));
    }
    form
  }

  async fn api_error(response: reqwest::Response) -> AppError {
    let status = response.status();
    let message = match response.json::<ErrorBody>().await {
      Ok(body) => body.error.message.unwrap_or_default(),
      Err(_) => String::new(),
    };
    error!(status = %status, message = %message, "payment gateway returned an error");
    AppError::Upstream(format!("Payment gateway error ({}): {}", status, message))
  }
}

fn parse_payment_status(raw: Option<&str>) -> PaymentStatus {
  match raw {
    Some("paid") => PaymentStatus::Paid,
    Some("no_payment_required") => PaymentStatus::NoPaymentRequired,
    _ => PaymentStatus::Unpaid,
  }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
  fn name(&self) -> &'static str {
    "stripe"
  }

  #[instrument(name = "StripeGateway::create_checkout_session", skip_all, fields(lines = request.lines.len()))]
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession> {
    let response = self
      .client
      .post(format!("{}/v1/checkout/sessions", self.api_base))
      .bearer_auth(&self.secret_key)
      .form(&Self::form_for(request))
      .send()
      .await?;
    if !response.status().is_success() {
      return Err(Self::api_error(response).await);
    }
    let body: SessionBody = response
      .json()
      .await
      .map_err(|e| AppError::Upstream(format!("Unreadable checkout session response: {}", e)))?;
    let redirect_url = body
      .url
      .ok_or_else(|| AppError::Upstream("Checkout session has no redirect URL".to_string()))?;
    info!(session_id = %body.id, "checkout session created");
    Ok(CheckoutSession {
      session_id: body.id,
      redirect_url,
    })
  }

  #[instrument(name = "StripeGateway::retrieve_session", skip(self))]
  async fn retrieve_session(&self, session_id: &str) -> Result<Option<PaymentSession>> {
    let response = self
      .client
      .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
      .bearer_auth(&self.secret_key)
      .send()
      .await?;
    if response.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    if !response.status().is_success() {
      return Err(Self::api_error(response).await);
    }
    let body: SessionBody = response
      .json()
      .await
      .map_err(|e| AppError::Upstream(format!("Unreadable checkout session response: {}", e)))?;
    let customer_email = body
      .customer_details
      .and_then(|d| d.email)
      .or(body.customer_email);
    Ok(Some(PaymentSession {
      payment_status: parse_payment_status(body.payment_status.as_deref()),
      id: body.id,
      amount_total_cents: body.amount_total,
      currency: body.currency,
      customer_email,
      metadata: body.metadata,
    }))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::services::payments::CheckoutLine;
  use uuid::Uuid;

  #[test]
  fn form_encodes_lines_and_metadata() {
    let request = CheckoutSessionRequest {
      lines: vec![CheckoutLine {
        product_id: Uuid::nil(),
        name: "Relief Sun SPF50".into(),
        unit_amount_cents: 1800,
        quantity: 2,
      }],
      currency: "usd".into(),
      customer_email: "a@example.com".into(),
      success_url: "https://shop/success".into(),
      cancel_url: "https://shop/cart".into(),
      metadata: BTreeMap::from([("userId".to_string(), "u1".to_string())]),
    };
    let form = StripeGateway::form_for(&request);
    let has = |k: &str, v: &str| form.iter().any(|(fk, fv)| fk == k && fv == v);
    assert!(has("mode", "payment"));
    assert!(has("line_items[0][price_data][unit_amount]", "1800"));
    assert!(has("line_items[0][quantity]", "2"));
    assert!(has("metadata[userId]", "u1"));
  }

  #[test]
  fn unknown_payment_status_counts_as_unpaid() {
    assert_eq!(parse_payment_status(Some("paid")), PaymentStatus::Paid);
    assert_eq!(parse_payment_status(Some("no_payment_required")), PaymentStatus::NoPaymentRequired);
    assert_eq!(parse_payment_status(Some("processing")), PaymentStatus::Unpaid);
    assert_eq!(parse_payment_status(None), PaymentStatus::Unpaid);
  }
}
