// core/src/workflow/definition.rs
use crate::error::FlowError;
use crate::flow::control::StepControl;
use crate::flow::data::FlowData;
use crate::flow::handler::{boxed, Handler};
use crate::flow::step::StepSpec;
use std::collections::HashMap;
use std::future::Future;

/// Handlers attached to one step, grouped by phase.
pub(crate) struct StepHooks<T: Send + Sync + 'static, E> {
  pub(crate) before: Vec<Handler<T, E>>,
  pub(crate) on: Vec<Handler<T, E>>,
  pub(crate) after: Vec<Handler<T, E>>,
}

impl<T: Send + Sync + 'static, E> Default for StepHooks<T, E> {
  fn default() -> Self {
    Self {
      before: Vec::new(),
      on: Vec::new(),
      after: Vec::new(),
    }
  }
}

impl<T: Send + Sync + 'static, E> StepHooks<T, E> {
  pub(crate) fn is_empty(&self) -> bool {
    self.before.is_empty() && self.on.is_empty() && self.after.is_empty()
  }
}

#[derive(Clone, Copy)]
enum Phase {
  Before,
  On,
  After,
}

/// An ordered set of steps over context `T` whose handlers fail with `E`.
///
/// `E` has to absorb [`FlowError`] so engine failures (a required step with
/// nothing attached, for instance) surface through the same channel as
/// handler failures.
pub struct Workflow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub(crate) name: String,
  pub(crate) steps: Vec<StepSpec<T>>,
  pub(crate) hooks: HashMap<String, StepHooks<T, E>>,
}

impl<T, E> Workflow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Panics if two steps share a name; step tables are static program data.
  pub fn new(name: impl Into<String>, steps: Vec<StepSpec<T>>) -> Self {
    let name = name.into();
    for (idx, step) in steps.iter().enumerate() {
      if steps[..idx].iter().any(|s| s.name == step.name) {
        panic!("workflow '{}' declares step '{}' twice", name, step.name);
      }
    }
    Self {
      name,
      steps,
      hooks: HashMap::new(),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name.as_str()).collect()
  }

  pub fn before<F, Fut, HE>(&mut self, step: &str, handler: F) -> &mut Self
  where
    F: Fn(FlowData<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepControl, HE>> + Send + 'static,
    HE: Into<E> + 'static,
  {
    self.attach(Phase::Before, step, boxed(handler))
  }

  pub fn on<F, Fut, HE>(&mut self, step: &str, handler: F) -> &mut Self
  where
    F: Fn(FlowData<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepControl, HE>> + Send + 'static,
    HE: Into<E> + 'static,
  {
    self.attach(Phase::On, step, boxed(handler))
  }

  pub fn after<F, Fut, HE>(&mut self, step: &str, handler: F) -> &mut Self
  where
    F: Fn(FlowData<T>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<StepControl, HE>> + Send + 'static,
    HE: Into<E> + 'static,
  {
    self.attach(Phase::After, step, boxed(handler))
  }

  /// Attaches an already boxed handler to the `on` phase.
  pub fn on_boxed(&mut self, step: &str, handler: Handler<T, E>) -> &mut Self {
    self.attach(Phase::On, step, handler)
  }

  // Panics: a hook on an undeclared step is a setup bug.
  fn attach(&mut self, phase: Phase, step: &str, handler: Handler<T, E>) -> &mut Self {
    if !self.steps.iter().any(|s| s.name == step) {
      panic!("workflow '{}' has no step named '{}'", self.name, step);
    }
    let hooks = self.hooks.entry(step.to_string()).or_default();
    match phase {
      Phase::Before => hooks.before.push(handler),
      Phase::On => hooks.on.push(handler),
      Phase::After => hooks.after.push(handler),
    }
    self
  }
}
