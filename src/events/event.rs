//! # Lifecycle events emitted by the supervisor and its tasks.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Spawn events**: a task was (or could not be) handed to the scheduler
//! - **Self-exit events**: the service returned and the task detached itself
//! - **Termination events**: the supervisor forcibly tore tasks down
//! - **Subscriber events**: delivery problems inside the fan-out
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task
//! name and id, reasons, and counts.
//!
//! ## Ordering
//! `seq` is process-wide and strictly increasing in creation order. For one
//! task, `TaskSpawned` always precedes its single destruction event
//! (`SelfExited` or `TaskTerminated`).
//!
//! ## Example
//! ```rust
//! use taskparent::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ServiceFailed)
//!     .with_task("collector")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::ServiceFailed);
//! assert_eq!(ev.task.as_deref(), Some("collector"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::TaskId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Spawn events ===
    /// Execution context created and the task released to run.
    ///
    /// Sets:
    /// - `task`, `task_id`
    /// - `priority`: advisory priority handed to the scheduler
    TaskSpawned,

    /// Scheduler refused to create the execution context.
    ///
    /// Sets:
    /// - `task`: requested name
    /// - `reason`: `SpawnError` label
    SpawnFailed,

    // === Self-exit events ===
    /// Service returned `Ok`.
    ///
    /// Sets:
    /// - `task`, `task_id`
    ServiceReturned,

    /// Service returned an error or panicked.
    ///
    /// Sets:
    /// - `task`, `task_id`
    /// - `reason`: failure message
    ServiceFailed,

    /// Task deregistered itself and is deleting its own context.
    ///
    /// Sets:
    /// - `task`, `task_id`
    SelfExited,

    /// Task found itself already claimed by a concurrent termination and parked.
    ///
    /// Sets:
    /// - `task`, `task_id`
    ExitRaceLost,

    // === Termination events ===
    /// `terminate_all` drained the registry.
    ///
    /// Sets:
    /// - `count`: number of drained tasks
    TerminateRequested,

    /// A cleanup hook panicked; the context was deleted anyway.
    ///
    /// Sets:
    /// - `task`, `task_id`
    /// - `reason`: panic message
    CleanupPanicked,

    /// Task cleaned up and its context deleted by the supervisor.
    ///
    /// Sets:
    /// - `task`, `task_id`
    TaskTerminated,

    /// A drained task was not in `Running` state (e.g. registered twice) and was skipped.
    ///
    /// Sets:
    /// - `task`, `task_id`
    /// - `reason`: observed state
    TerminateSkipped,

    // === Subscriber events ===
    /// A subscriber's `on_event` panicked; later events still reach it.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// An event was not queued for one subscriber.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: `subscriber=<name> reason=full|closed`
    SubscriberOverflow,
}

/// One lifecycle event. Which optional fields are set depends on [`EventKind`].
#[derive(Clone, Debug)]
pub struct Event {
    /// Process-wide creation order.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Id of the task, if applicable.
    pub task_id: Option<TaskId>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Number of affected tasks.
    pub count: Option<usize>,
    /// Advisory scheduler priority.
    pub priority: Option<u8>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            task_id: None,
            reason: None,
            count: None,
            priority: None,
        }
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task_id(mut self, id: TaskId) -> Self {
        self.task_id = Some(id);
        self
    }

    /// Attaches a count.
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(n);
        self
    }

    /// Attaches an advisory priority.
    #[inline]
    pub fn with_priority(mut self, p: u8) -> Self {
        self.priority = Some(p);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    /// True for the two kinds that end a task's life.
    #[inline]
    pub fn is_destruction(&self) -> bool {
        matches!(self.kind, EventKind::SelfExited | EventKind::TaskTerminated)
    }
}
