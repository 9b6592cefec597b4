// core/src/flow/step.rs
use super::data::FlowData;
use std::sync::Arc;

/// Predicate evaluated right before a step runs; `true` skips the step.
pub type SkipPredicate<T> = Arc<dyn Fn(&FlowData<T>) -> bool + Send + Sync + 'static>;

/// A named step of a workflow.
#[derive(Clone)]
pub struct StepSpec<T: Send + Sync + 'static> {
  pub name: String,
  /// Optional steps may have no handlers at all; required ones may not.
  pub optional: bool,
  pub skip_if: Option<SkipPredicate<T>>,
}

impl<T: Send + Sync + 'static> StepSpec<T> {
  pub fn required(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: false,
      skip_if: None,
    }
  }

  pub fn optional(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      optional: true,
      skip_if: None,
    }
  }

  pub fn skip_when(mut self, predicate: impl Fn(&FlowData<T>) -> bool + Send + Sync + 'static) -> Self {
    self.skip_if = Some(Arc::new(predicate));
    self
  }
}

impl<T: Send + Sync + 'static> std::fmt::Debug for StepSpec<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("StepSpec")
      .field("name", &self.name)
      .field("optional", &self.optional)
      .field("has_skip_predicate", &self.skip_if.is_some())
      .finish()
  }
}
