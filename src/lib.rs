//! # taskparent
//!
//! **Taskparent** is a hierarchical task-lifecycle supervisor.
//!
//! A [`Supervisor`] spawns services on their own execution contexts, keeps the
//! live ones in a guarded registry and can forcibly terminate all of them.
//! Each child is destroyed **exactly once**: either by itself, when its
//! service returns, or by the supervisor's `terminate_all`, never both.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Service    │   │   Service    │   │   Service    │
//!     │  (user #1)   │   │  (user #2)   │   │  (user #3)   │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor                                                       │
//! │  - Registry (guarded children, newest first)                      │
//! │  - Scheduler (create / delete / exit_current)                     │
//! │  - Bus (broadcast lifecycle events)                               │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │     Task     │   │     Task     │   │     Task     │   │
//!     │  (context)   │   │  (context)   │   │  (context)   │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ TaskSpawned      │ ServiceReturned  │ ExitRaceLost    │ TerminateRequested
//!      │ SelfExited       │ ServiceFailed    │ TaskTerminated  │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                  (capacity: Config::bus_capacity)                 │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                           (per-sub queues)
//!                        ┌─────────┼─────────┐
//!                        ▼         ▼         ▼
//!                     worker1   worker2   workerN
//! ```
//!
//! ### Lifecycle
//! ```text
//! Supervisor::spawn ──► Scheduler::create (gated) ──► register ──► open gate
//!
//! service() returns ──► deregister(self)
//!                         ├─ true  ──► SelfExited ──► exit_current (never returns)
//!                         └─ false ──► ExitRaceLost ──► park until released
//!
//! terminate_all ──► drain registry (one critical section)
//!                   └─ for each child, outside the guard:
//!                        cleanup() ──► delete(context) ──► TaskTerminated ──► release
//!
//! terminate(task) ──► deregister(task) == true ──► same per-child teardown
//! ```
//!
//! `delete` returns only once the service can no longer run, so a task
//! reported `Destroyed` runs no more user code.
//!
//! ## Features
//! | Area              | Description                                              | Key types / traits                     |
//! |-------------------|----------------------------------------------------------|----------------------------------------|
//! | **Supervision**   | Spawn, track and terminate child tasks.                  | [`Supervisor`], [`SupervisorBuilder`]  |
//! | **Services**      | User work with an optional cleanup hook.                 | [`Service`], [`ServiceFn`]             |
//! | **Scheduling**    | Pluggable execution-context capability.                  | [`Scheduler`], [`TokioScheduler`]      |
//! | **Subscriber API**| Hook into lifecycle events.                              | [`Subscribe`], [`Event`]               |
//! | **Errors**        | Typed spawn and service errors.                          | [`SpawnError`], [`TaskError`]          |
//! | **Configuration** | Bus capacity, context limits, spawn defaults.            | [`Config`]                             |
//!
//! ## Optional features
//! - `logging`: exports [`LogWriter`], a subscriber that emits `tracing` records.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use taskparent::{Config, ServiceFn, SpawnOptions, Supervisor, TaskError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn taskparent::Subscribe>> = vec![Arc::new(taskparent::LogWriter)];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn taskparent::Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(cfg.clone()).with_subscribers(subs).build();
//!
//!     let hello = ServiceFn::arc("hello", || async {
//!         println!("hello from a child");
//!         Ok::<(), TaskError>(())
//!     });
//!     let task = sup.spawn(hello, SpawnOptions::with_defaults(&cfg))?;
//!     println!("spawned {}", task.id());
//!
//!     sup.terminate_all();
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod scheduler;
mod services;
mod subscribers;

#[cfg(test)]
mod test_support;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{Supervisor, SupervisorBuilder, Task, TaskId, TaskRef, TaskState};
pub use error::{SpawnError, TaskError};
pub use events::{Bus, Event, EventKind};
pub use scheduler::{
    ContextHandle, EntryFuture, GatedEntry, Scheduler, SpawnOptions, TokioScheduler,
};
pub use services::{Service, ServiceFn, ServiceRef};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: a built-in subscriber that forwards events to `tracing`.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
