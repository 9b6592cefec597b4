// core/src/lib.rs

//! glowmart-flow: a small async workflow engine.
//!
//! A [`Workflow`] is an ordered list of named steps. Each step can carry
//! `before`, `on` and `after` handlers that receive the shared [`FlowData`]
//! and answer with a [`StepControl`]. Handlers either let the run continue,
//! halt it cleanly, or fail it with the workflow's error type.
//!
//! Workflows are registered in a [`Registry`] keyed by their context type, so
//! callers only need a context value to dispatch:
//!
//! ```ignore
//! let registry = Registry::<AppError>::new();
//! registry.register(checkout_workflow());
//! let outcome = registry.run(FlowData::new(CheckoutCtx::new(..))).await?;
//! ```

pub mod error;
pub mod flow;
pub mod registry;
pub mod workflow;

pub use crate::error::{FlowError, FlowResult};
pub use crate::flow::control::{FlowOutcome, StepControl};
pub use crate::flow::data::FlowData;
pub use crate::flow::handler::Handler;
pub use crate::flow::step::{SkipPredicate, StepSpec};
pub use crate::registry::Registry;
pub use crate::workflow::Workflow;
