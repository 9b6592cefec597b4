// storefront/src/services/mail/resend.rs

use super::{MailTransport, OutgoingEmail};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{instrument, warn};

#[derive(Serialize)]
struct SendRequest<'a> {
  from: &'a str,
  to: [&'a str; 1],
  subject: &'a str,
  html: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
  id: String,
}

/// Transactional mail through the Resend HTTP API.
pub struct ResendTransport {
  client: reqwest::Client,
  api_key: String,
  api_base: String,
  sender: String,
}

impl ResendTransport {
  pub fn new(
    api_key: impl Into<String>,
    api_base: impl Into<String>,
    sender: impl Into<String>,
    timeout: Duration,
  ) -> Result<Self> {
    let client = reqwest::Client::builder()
      .timeout(timeout)
      .build()
      .map_err(|e| AppError::Config(format!("Failed to build mail HTTP client: {}", e)))?;
    Ok(Self {
      client,
      api_key: api_key.into(),
      api_base: api_base.into(),
      sender: sender.into(),
    })
  }
}

#[async_trait]
impl MailTransport for ResendTransport {
  fn name(&self) -> &'static str {
    "resend"
  }

  #[instrument(name = "ResendTransport::send", skip_all, fields(to = %email.to))]
  async fn send(&self, email: &OutgoingEmail) -> Result<String> {
    let response = self
      .client
      .post(format!("{}/emails", self.api_base))
      .bearer_auth(&self.api_key)
      .json(&SendRequest {
        from: &self.sender,
        to: [email.to.as_str()],
        subject: &email.subject,
        html: &email.html,
      })
      .send()
      .await?;
    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      warn!(status = %status, body = %body, "mail provider rejected message");
      return Err(AppError::Upstream(format!("Mail provider error ({})", status)));
    }
    let sent: SendResponse = response
      .json()
      .await
      .map_err(|e| AppError::Upstream(format!("Unreadable mail provider response: {}", e)))?;
    Ok(sent.id)
  }
}
