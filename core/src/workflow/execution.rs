// core/src/workflow/execution.rs
use super::definition::{StepHooks, Workflow};
use crate::error::FlowError;
use crate::flow::control::{FlowOutcome, StepControl};
use crate::flow::data::FlowData;
use crate::flow::handler::Handler;
use crate::flow::step::StepSpec;
use tracing::{debug, error, info, info_span, instrument, Instrument};

impl<T, E> Workflow<T, E>
where
  T: Send + Sync + 'static,
  E: std::error::Error + From<FlowError> + Send + Sync + 'static,
{
  /// Runs every step in declaration order against `data`.
  ///
  /// Within a step the phases run `before`, `on`, `after`; handlers within a
  /// phase run in registration order. The first `Halt` ends the run with
  /// [`FlowOutcome::Halted`], the first error ends it with that error.
  #[instrument(name = "workflow", skip_all, fields(workflow = %self.name, steps = self.steps.len()), err(Display))]
  pub async fn run(&self, data: FlowData<T>) -> Result<FlowOutcome, E> {
    for (index, step) in self.steps.iter().enumerate() {
      let span = info_span!("step", step = %step.name, index, optional = step.optional);
      if let StepControl::Halt = self.run_step(step, &data).instrument(span).await? {
        info!(step = %step.name, "workflow halted");
        return Ok(FlowOutcome::Halted {
          step: step.name.clone(),
        });
      }
    }
    debug!("workflow completed");
    Ok(FlowOutcome::Completed)
  }

  async fn run_step(&self, step: &StepSpec<T>, data: &FlowData<T>) -> Result<StepControl, E> {
    if let Some(skip_if) = &step.skip_if {
      if skip_if(data) {
        debug!("step skipped by predicate");
        return Ok(StepControl::Continue);
      }
    }

    let hooks = match self.hooks.get(&step.name) {
      Some(hooks) if !hooks.is_empty() => hooks,
      _ if step.optional => {
        debug!("optional step has no handlers");
        return Ok(StepControl::Continue);
      }
      _ => {
        error!("required step has no handlers");
        return Err(E::from(FlowError::HandlerMissing {
          step: step.name.clone(),
        }));
      }
    };

    for (phase, handlers) in phases(hooks) {
      for handler in handlers {
        match handler(data.clone()).await {
          Ok(StepControl::Continue) => {}
          Ok(StepControl::Halt) => {
            debug!(phase, "handler halted the run");
            return Ok(StepControl::Halt);
          }
          Err(err) => {
            error!(phase, error = %err, "handler failed");
            return Err(err);
          }
        }
      }
    }
    Ok(StepControl::Continue)
  }
}

fn phases<T: Send + Sync + 'static, E>(hooks: &StepHooks<T, E>) -> [(&'static str, &[Handler<T, E>]); 3] {
  [
    ("before", hooks.before.as_slice()),
    ("on", hooks.on.as_slice()),
    ("after", hooks.after.as_slice()),
  ]
}
