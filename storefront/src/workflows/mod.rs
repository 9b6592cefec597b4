// storefront/src/workflows/mod.rs

//! Every multi-stage storefront operation runs as a workflow registered here
//! once at startup, keyed by its context type.

pub mod checkout;
pub mod contexts;
pub mod reconcile;
pub mod status;
pub mod webhook;

use crate::errors::AppError;
use glowmart_flow::Registry;
use tracing::info;

pub use contexts::{
  CartLine, CheckoutCtx, CheckoutRequest, NotificationOutcome, ReconcileCtx, StatusCtx, WebhookCtx, WebhookOutcome,
};

pub fn register_all(registry: &Registry<AppError>) {
  registry.register(checkout::checkout_workflow());
  registry.register(reconcile::reconcile_workflow());
  registry.register(status::status_workflow());
  registry.register(webhook::webhook_workflow());
  info!(count = registry.len(), "workflows registered");
}
