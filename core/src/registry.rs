// core/src/registry.rs

//! A registry of workflows keyed by the type of context they run on.

use crate::error::FlowError;
use crate::flow::control::FlowOutcome;
use crate::flow::data::FlowData;
use crate::workflow::Workflow;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Object-safe face of a `Workflow<T, E>` with `T` erased.
#[async_trait]
trait ErasedWorkflow<E>: Send + Sync {
  /// `data` must be a boxed `FlowData<T>` for the workflow's own `T`.
  async fn run_erased(&self, data: Box<dyn Any + Send>) -> Result<FlowOutcome, E>;

  fn name(&self) -> &str;
}

#[async_trait]
impl<T, E> ErasedWorkflow<E> for Workflow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  async fn run_erased(&self, data: Box<dyn Any + Send>) -> Result<FlowOutcome, E> {
    let data = match data.downcast::<FlowData<T>>() {
      Ok(data) => *data,
      Err(_) => {
        let expected = type_name::<FlowData<T>>();
        error!(expected, "registry handed the wrong context type to a workflow");
        return Err(E::from(FlowError::TypeMismatch {
          expected: expected.to_string(),
        }));
      }
    };
    self.run(data).await
  }

  fn name(&self) -> &str {
    &self.name
  }
}

/// Holds one workflow per context type. Every workflow in a registry fails
/// with the same application error `E`.
pub struct Registry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  workflows: RwLock<HashMap<TypeId, Arc<dyn ErasedWorkflow<E>>>>,
}

impl<E> Default for Registry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  fn default() -> Self {
    Self::new()
  }
}

impl<E> Registry<E>
where
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  pub fn new() -> Self {
    Self {
      workflows: RwLock::new(HashMap::new()),
    }
  }

  /// Registers `workflow` for context type `T`, replacing any previous one.
  pub fn register<T>(&self, workflow: Workflow<T, E>)
  where
    T: Send + Sync + 'static,
  {
    let context_type = type_name::<T>();
    debug!(workflow = %workflow.name(), context_type, "registering workflow");
    let previous = self
      .workflows
      .write()
      .insert(TypeId::of::<T>(), Arc::new(workflow));
    if let Some(previous) = previous {
      warn!(replaced = %previous.name(), context_type, "workflow replaced an earlier registration");
    }
  }

  pub fn is_registered<T: Send + Sync + 'static>(&self) -> bool {
    self.workflows.read().contains_key(&TypeId::of::<T>())
  }

  pub fn len(&self) -> usize {
    self.workflows.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.workflows.read().is_empty()
  }

  /// Runs the workflow registered for `T`. The caller keeps its own clone of
  /// `data` to read results afterwards.
  pub async fn run<T>(&self, data: FlowData<T>) -> Result<FlowOutcome, E>
  where
    T: Send + Sync + 'static,
  {
    // Clone the Arc out so the map lock is released before awaiting.
    let workflow = self.workflows.read().get(&TypeId::of::<T>()).cloned();
    let Some(workflow) = workflow else {
      let context_type = type_name::<T>();
      error!(context_type, "no workflow registered");
      return Err(E::from(FlowError::NotRegistered {
        context_type: context_type.to_string(),
      }));
    };
    workflow.run_erased(Box::new(data)).await
  }
}
