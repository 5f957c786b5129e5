//! # Service: the unit of work a task runs.
//!
//! A [`Service`] has a stable [`name`](Service::name), an async
//! [`service`](Service::service) entry point that runs on the task's own
//! execution context, and a synchronous [`cleanup`](Service::cleanup) hook.
//!
//! `cleanup` is only ever invoked by `Supervisor::terminate_all`, from the
//! supervisor's context, before the task's context is deleted. A service that
//! finishes on its own is never cleaned up; it simply self-exits.
//!
//! # Example
//! ```
//! use async_trait::async_trait;
//! use taskparent::{Service, TaskError};
//!
//! struct Collector;
//!
//! #[async_trait]
//! impl Service for Collector {
//!     fn name(&self) -> &str { "collector" }
//!
//!     async fn service(&self) -> Result<(), TaskError> {
//!         // accumulate counters...
//!         Ok(())
//!     }
//!
//!     fn cleanup(&self) {
//!         // flush counters before forced teardown
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;

/// Shared reference to a service.
pub type ServiceRef = Arc<dyn Service>;

/// Unit of work bound to one task.
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Returns a stable, human-readable name; also used as the context name.
    fn name(&self) -> &str;

    /// Runs the unit of work to completion (or forever, for a supervisory service).
    ///
    /// May be cut short at any `.await` by forced termination.
    async fn service(&self) -> Result<(), TaskError>;

    /// Teardown invoked by forced termination only. Must not block indefinitely.
    ///
    /// Runs while `service` may still be suspended on the task's own context.
    fn cleanup(&self) {}
}
