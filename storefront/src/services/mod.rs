// storefront/src/services/mod.rs

pub mod catalog;
pub mod mail;
pub mod orders;
pub mod payments;
