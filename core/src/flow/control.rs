// core/src/flow/control.rs

/// What a handler tells the engine after it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepControl {
  /// Run the remaining handlers of this step, then the following steps.
  Continue,
  /// Stop the whole run here. Nothing after the current handler executes.
  Halt,
}

/// How a run that did not fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowOutcome {
  /// Every step ran (or was skipped by its own rules).
  Completed,
  /// A handler of `step` returned [`StepControl::Halt`].
  Halted { step: String },
}

impl FlowOutcome {
  pub fn is_completed(&self) -> bool {
    matches!(self, FlowOutcome::Completed)
  }

  /// Name of the step that halted the run, if any.
  pub fn halted_at(&self) -> Option<&str> {
    match self {
      FlowOutcome::Completed => None,
      FlowOutcome::Halted { step } => Some(step.as_str()),
    }
  }
}
