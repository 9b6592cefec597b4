// storefront/src/services/mail/log.rs

use super::{MailTransport, OutgoingEmail};
use crate::errors::Result;
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

/// Logs messages instead of delivering them. Default for local runs.
pub struct LogTransport {
  sender: String,
}

impl LogTransport {
  pub fn new(sender: impl Into<String>) -> Self {
    Self { sender: sender.into() }
  }
}

#[async_trait]
impl MailTransport for LogTransport {
  fn name(&self) -> &'static str {
    "log"
  }

  async fn send(&self, email: &OutgoingEmail) -> Result<String> {
    let preview: String = email.html.chars().take(80).collect();
    let message_id = format!("log_{}", Uuid::new_v4().simple());
    info!(
      from = %self.sender,
      to = %email.to,
      subject = %email.subject,
      message_id = %message_id,
      preview = %preview,
      "email logged instead of sent"
    );
    Ok(message_id)
  }
}
