// storefront/src/services/payments/mock.rs

use super::{CheckoutSession, CheckoutSessionRequest, PaymentGateway, PaymentSession, PaymentStatus};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

/// In-process gateway. Sessions start unpaid; `mark_paid` plays the buyer
/// completing the hosted page.
pub struct MockGateway {
  base_url: String,
  sessions: Mutex<HashMap<String, PaymentSession>>,
  fail_creation: Mutex<bool>,
}

impl MockGateway {
  pub fn new(base_url: impl Into<String>) -> Self {
    Self {
      base_url: base_url.into(),
      sessions: Mutex::new(HashMap::new()),
      fail_creation: Mutex::new(false),
    }
  }

  /// Returns `false` if the session does not exist.
  pub fn mark_paid(&self, session_id: &str) -> bool {
    match self.sessions.lock().get_mut(session_id) {
      Some(session) => {
        session.payment_status = PaymentStatus::Paid;
        info!(session_id, "mock session marked paid");
        true
      }
      None => false,
    }
  }

  pub fn insert_session(&self, session: PaymentSession) {
    self.sessions.lock().insert(session.id.clone(), session);
  }

  pub fn session(&self, session_id: &str) -> Option<PaymentSession> {
    self.sessions.lock().get(session_id).cloned()
  }

  /// Makes subsequent `create_checkout_session` calls fail.
  pub fn set_fail_creation(&self, fail: bool) {
    *self.fail_creation.lock() = fail;
  }
}

#[async_trait]
impl PaymentGateway for MockGateway {
  fn name(&self) -> &'static str {
    "mock"
  }

  #[instrument(name = "MockGateway::create_checkout_session", skip_all)]
  async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession> {
    if *self.fail_creation.lock() {
      return Err(AppError::Upstream("Mock gateway refused to open a session".to_string()));
    }
    let id = format!("cs_mock_{}", Uuid::new_v4().simple());
    self.insert_session(PaymentSession {
      id: id.clone(),
      payment_status: PaymentStatus::Unpaid,
      amount_total_cents: Some(request.amount_total_cents()),
      currency: Some(request.currency.clone()),
      customer_email: Some(request.customer_email.clone()),
      metadata: request.metadata.clone(),
    });
    info!(session_id = %id, "mock checkout session opened");
    Ok(CheckoutSession {
      redirect_url: format!("{}/api/v1/dev/payments/{}/complete", self.base_url, id),
      session_id: id,
    })
  }

  async fn retrieve_session(&self, session_id: &str) -> Result<Option<PaymentSession>> {
    Ok(self.session(session_id))
  }
}
