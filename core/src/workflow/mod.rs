// core/src/workflow/mod.rs

//! The [`Workflow`] type: definition and hook registration live in
//! `definition`, the step loop in `execution`.

mod definition;
mod execution;

pub use definition::Workflow;
