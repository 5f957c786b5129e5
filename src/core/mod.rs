//! Runtime core: supervisor, registry and task lifecycle.
//!
//! The public API from this module is [`Supervisor`] (with its builder) and
//! the [`Task`] record it hands out.
//!
//! Internal modules:
//! - [`registry`]: guarded set of live children, the ownership claim;
//! - [`task`]: one service bound to one execution context, both teardown paths;
//! - [`supervisor`]: register/deregister, `terminate_all`, drop semantics;
//! - [`builder`]: wiring of bus, scheduler and subscribers;
//! - [`shutdown`]: cross-platform shutdown signal handling.

mod builder;
mod registry;
mod shutdown;
mod supervisor;
mod task;

pub use builder::SupervisorBuilder;
pub use supervisor::Supervisor;
pub use task::{Task, TaskId, TaskRef, TaskState};
