// storefront/src/services/mail/mod.rs

pub mod log;
pub mod notifier;
pub mod resend;
pub mod templates;

use crate::errors::Result;
use async_trait::async_trait;

pub use self::log::LogTransport;
pub use notifier::Notifier;
pub use resend::ResendTransport;
pub use templates::RenderedEmail;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
  pub to: String,
  pub subject: String,
  pub html: String,
}

/// Hands one message to a mail provider. Returns the provider's message id.
#[async_trait]
pub trait MailTransport: Send + Sync {
  fn name(&self) -> &'static str;

  async fn send(&self, email: &OutgoingEmail) -> Result<String>;
}
