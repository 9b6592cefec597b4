// storefront/src/state.rs

use crate::config::AppConfig;
use crate::errors::{AppError, Result};
use crate::services::mail::Notifier;
use crate::services::payments::{MockGateway, PaymentGateway, WebhookVerifier};
use crate::store::Store;
use glowmart_flow::{FlowData, FlowOutcome, Registry};
use std::any::type_name;
use std::sync::Arc;

/// Everything a handler or workflow step needs, built once in `main` (or a
/// test) and cloned into each request.
#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub store: Arc<dyn Store>,
  pub gateway: Arc<dyn PaymentGateway>,
  /// Set when the in-process gateway is active; enables the dev payment route.
  pub mock_gateway: Option<Arc<MockGateway>>,
  pub notifier: Arc<Notifier>,
  pub webhook_verifier: Arc<WebhookVerifier>,
  pub workflows: Arc<Registry<AppError>>,
}

impl AppState {
  /// Wires the shared services together and registers every workflow.
  pub fn assemble(
    config: AppConfig,
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    mock_gateway: Option<Arc<MockGateway>>,
    notifier: Arc<Notifier>,
  ) -> Self {
    let webhook_verifier = Arc::new(WebhookVerifier::new(
      config.webhook_secret.clone(),
      config.webhook_tolerance,
    ));
    let workflows = Arc::new(Registry::new());
    crate::workflows::register_all(&workflows);
    Self {
      config: Arc::new(config),
      store,
      gateway,
      mock_gateway,
      notifier,
      webhook_verifier,
      workflows,
    }
  }

  /// Runs the workflow registered for `T`, bounded by the request timeout.
  /// The returned handle carries whatever the steps wrote into the context.
  pub async fn run_workflow<T>(&self, ctx: T) -> Result<(FlowOutcome, FlowData<T>)>
  where
    T: Send + Sync + 'static,
  {
    let data = FlowData::new(ctx);
    let run = self.workflows.run(data.clone());
    match tokio::time::timeout(self.config.request_timeout, run).await {
      Ok(outcome) => Ok((outcome?, data)),
      Err(_) => {
        tracing::error!(context = type_name::<T>(), timeout = ?self.config.request_timeout, "workflow timed out");
        Err(AppError::Timeout(format!(
          "Operation did not finish within {}s",
          self.config.request_timeout.as_secs()
        )))
      }
    }
  }
}
