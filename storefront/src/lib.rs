// storefront/src/lib.rs

//! GlowMart storefront: catalog, hosted checkout, payment reconciliation,
//! order lifecycle and the admin back-office.

pub mod config;
pub mod errors;
pub mod models;
pub mod services;
pub mod state;
pub mod store;
pub mod telemetry;
pub mod web;
pub mod workflows;

pub use errors::{AppError, Result};
pub use state::AppState;
