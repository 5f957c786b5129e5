//! # Service abstractions.
//!
//! - [`Service`] - trait with the `service` entry point and `cleanup` hook
//! - [`ServiceFn`] - closure-backed implementation
//! - [`ServiceRef`] - shared reference (`Arc<dyn Service>`)

mod service;
mod service_fn;

pub use service::{Service, ServiceRef};
pub use service_fn::ServiceFn;
