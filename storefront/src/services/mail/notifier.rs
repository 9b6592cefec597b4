// storefront/src/services/mail/notifier.rs

use super::templates::{self, RenderedEmail};
use super::{MailTransport, OutgoingEmail};
use crate::errors::{AppError, Result};
use crate::models::{EmailStatus, NewEmailLog, OrderDetail, OrderStatus};
use crate::store::Store;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// Sends notifications with a fixed-count retry and records every outcome in
/// the email log.
pub struct Notifier {
  transport: Arc<dyn MailTransport>,
  store: Arc<dyn Store>,
  max_attempts: u32,
  retry_delay: Duration,
  attempt_timeout: Duration,
}

const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(30);

struct Delivery {
  attempts: u32,
  outcome: Result<String>,
}

impl Notifier {
  pub fn new(transport: Arc<dyn MailTransport>, store: Arc<dyn Store>, max_attempts: u32, retry_delay: Duration) -> Self {
    Self {
      transport,
      store,
      max_attempts: max_attempts.max(1),
      retry_delay,
      attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
    }
  }

  /// Bounds a single transport call; an attempt that runs over counts as a
  /// failed attempt.
  pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
    self.attempt_timeout = timeout;
    self
  }

  pub fn transport_name(&self) -> &'static str {
    self.transport.name()
  }

  /// Tries up to `max_attempts` times, sleeping `retry_delay` between tries.
  /// Returns the provider message id or the last error.
  pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<String> {
    let email = OutgoingEmail {
      to: to.to_string(),
      subject: subject.to_string(),
      html: html.to_string(),
    };
    self.deliver(&email).await.outcome
  }

  async fn deliver(&self, email: &OutgoingEmail) -> Delivery {
    let mut attempt = 0;
    loop {
      attempt += 1;
      let sent = tokio::time::timeout(self.attempt_timeout, self.transport.send(email))
        .await
        .unwrap_or_else(|_| {
          Err(AppError::Timeout(format!(
            "Mail transport did not answer within {}ms",
            self.attempt_timeout.as_millis()
          )))
        });
      match sent {
        Ok(message_id) => {
          return Delivery {
            attempts: attempt,
            outcome: Ok(message_id),
          }
        }
        Err(e) if attempt < self.max_attempts => {
          warn!(attempt, max_attempts = self.max_attempts, error = %e, "email send failed, retrying");
          tokio::time::sleep(self.retry_delay).await;
        }
        Err(e) => {
          error!(attempt, error = %e, "email send failed, giving up");
          return Delivery {
            attempts: attempt,
            outcome: Err(e),
          };
        }
      }
    }
  }

  /// Sends a rendered order email and writes the email log row.
  #[instrument(name = "Notifier::dispatch", skip(self, email, detail), fields(order_id = %detail.order.id, template = email.template))]
  pub async fn dispatch(&self, to: &str, email: RenderedEmail, detail: &OrderDetail) -> Result<String> {
    let outgoing = OutgoingEmail {
      to: to.to_string(),
      subject: email.subject,
      html: email.html,
    };
    let delivery = self.deliver(&outgoing).await;

    let (status, message_id, last_error) = match &delivery.outcome {
      Ok(id) => (EmailStatus::Sent, Some(id.clone()), None),
      Err(e) => (EmailStatus::Failed, None, Some(e.to_string())),
    };
    let log = NewEmailLog {
      recipient: outgoing.to.clone(),
      subject: outgoing.subject.clone(),
      template: email.template.to_string(),
      order_id: Some(detail.order.id),
      status,
      attempts: delivery.attempts as i32,
      last_error,
      provider_message_id: message_id,
    };
    if let Err(e) = self.store.insert_email_log(&log).await {
      error!(error = %e, "failed to record email log");
    }
    if delivery.outcome.is_ok() {
      info!(attempts = delivery.attempts, "order email sent");
    }
    delivery.outcome
  }

  /// Renders and sends the email for `status`. `Ok(None)` when the status
  /// has no template.
  pub async fn notify_status(
    &self,
    status: OrderStatus,
    detail: &OrderDetail,
    to: &str,
    customer_name: Option<&str>,
  ) -> Result<Option<String>> {
    let Some(email) = templates::for_status(status, detail, customer_name) else {
      return Ok(None);
    };
    if to.trim().is_empty() {
      return Err(AppError::InvalidInput("Notification recipient is empty".to_string()));
    }
    self.dispatch(to, email, detail).await.map(Some)
  }
}
