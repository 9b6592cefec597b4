// core/src/error.rs
use anyhow::Error as AnyhowError;
use thiserror::Error;

/// Failures raised by the engine itself, as opposed to failures raised by
/// the handlers a workflow runs. Application error types must be
/// constructible from this so a run can report both through one type.
#[derive(Debug, Error)]
pub enum FlowError {
  #[error("required step '{step}' has no handlers")]
  HandlerMissing { step: String },

  #[error("no workflow registered for context type {context_type}")]
  NotRegistered { context_type: String },

  #[error("context type mismatch at dispatch (expected {expected})")]
  TypeMismatch { expected: String },

  #[error("handler failed: {source}")]
  Handler {
    #[source]
    source: AnyhowError,
  },
}

impl From<AnyhowError> for FlowError {
  fn from(source: AnyhowError) -> Self {
    match source.downcast::<FlowError>() {
      Ok(flow_err) => flow_err,
      Err(source) => FlowError::Handler { source },
    }
  }
}

pub type FlowResult<T, E = FlowError> = std::result::Result<T, E>;
