// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use glowmart_flow::FlowError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Unauthorized: {0}")]
  Unauthorized(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Not found: {0}")]
  NotFound(String),

  #[error("Invalid status: {0}")]
  InvalidStatus(String),

  #[error("Invalid input: {0}")]
  InvalidInput(String),

  #[error("Invalid status transition: {0}")]
  InvalidTransition(String),

  #[error("Payment session not found: {0}")]
  PaymentNotFound(String),

  #[error("Payment incomplete: {0}")]
  PaymentIncomplete(String),

  #[error("Missing order data: {0}")]
  MissingOrderData(String),

  #[error("Insufficient stock: {0}")]
  InsufficientStock(String),

  /// Another order already claimed this payment session. Reconciliation turns
  /// this into "return the existing order"; it is never shown to a client.
  #[error("Payment session {0} already has an order")]
  DuplicatePayment(String),

  #[error("Checkout initiation failed: {0}")]
  CheckoutInitiationFailed(String),

  #[error("Upstream service failed: {0}")]
  Upstream(String),

  #[error("Operation timed out: {0}")]
  Timeout(String),

  #[error("Configuration error: {0}")]
  Config(String),

  #[error("Database error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Workflow error: {source}")]
  Workflow {
    #[from]
    source: FlowError,
  },

  #[error("Internal error: {0}")]
  Internal(String),
}

impl AppError {
  /// Stable machine-readable code for the JSON error body.
  pub fn code(&self) -> &'static str {
    match self {
      AppError::Unauthorized(_) => "unauthorized",
      AppError::Forbidden(_) => "forbidden",
      AppError::NotFound(_) => "not_found",
      AppError::InvalidStatus(_) => "invalid_status",
      AppError::InvalidInput(_) => "invalid_input",
      AppError::InvalidTransition(_) => "invalid_transition",
      AppError::PaymentNotFound(_) => "payment_not_found",
      AppError::PaymentIncomplete(_) => "payment_incomplete",
      AppError::MissingOrderData(_) => "missing_order_data",
      AppError::InsufficientStock(_) => "insufficient_stock",
      AppError::DuplicatePayment(_) => "duplicate_payment",
      AppError::CheckoutInitiationFailed(_) => "checkout_initiation_failed",
      AppError::Upstream(_) => "upstream_failure",
      AppError::Timeout(_) => "timeout",
      AppError::Config(_) => "configuration",
      AppError::Database(_) => "database",
      AppError::Workflow { .. } => "workflow",
      AppError::Internal(_) => "internal",
    }
  }

  /// Message safe to hand to a client.
  fn public_message(&self) -> String {
    match self {
      AppError::Database(_) => "Database operation failed".to_string(),
      AppError::Workflow { .. } | AppError::Internal(_) | AppError::Config(_) => {
        "An internal error occurred".to_string()
      }
      AppError::PaymentNotFound(_) | AppError::PaymentIncomplete(_) => {
        format!("{} Your order is not ready yet, please check back shortly.", self)
      }
      other => other.to_string(),
    }
  }
}

// Handlers that lean on `anyhow` end up here; AppErrors that were wrapped on
// the way are recovered instead of flattened into Internal.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    match err.downcast::<AppError>() {
      Ok(app_err) => app_err,
      Err(err) => match err.downcast::<sqlx::Error>() {
        Ok(db_err) => AppError::Database(db_err),
        Err(err) => AppError::Internal(err.to_string()),
      },
    }
  }
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      AppError::Timeout(err.to_string())
    } else {
      AppError::Upstream(err.to_string())
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
      AppError::Forbidden(_) => StatusCode::FORBIDDEN,
      AppError::NotFound(_) | AppError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
      AppError::InvalidStatus(_) | AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
      AppError::InvalidTransition(_) | AppError::InsufficientStock(_) | AppError::DuplicatePayment(_) => {
        StatusCode::CONFLICT
      }
      AppError::PaymentIncomplete(_) => StatusCode::PAYMENT_REQUIRED,
      AppError::MissingOrderData(_) => StatusCode::UNPROCESSABLE_ENTITY,
      AppError::CheckoutInitiationFailed(_) | AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
      AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
      AppError::Config(_) | AppError::Database(_) | AppError::Workflow { .. } | AppError::Internal(_) => {
        StatusCode::INTERNAL_SERVER_ERROR
      }
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(error = %self, code = self.code(), "responding with error");
    } else {
      tracing::warn!(error = %self, code = self.code(), "responding with error");
    }
    HttpResponse::build(status).json(json!({
      "error": self.code(),
      "message": self.public_message(),
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
