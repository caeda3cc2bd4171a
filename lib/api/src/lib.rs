//! # Remedex API
//!
//! actix-web REST endpoints over the ranking pipeline and the catalog.

pub mod rest;

pub use rest::{configure, ApiError, RestApi, ServiceState};
