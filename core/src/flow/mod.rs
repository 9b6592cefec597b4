// core/src/flow/mod.rs

//! Building blocks shared by workflows and the registry.

pub mod control;
pub mod data;
pub mod handler;
pub mod step;
