//! # LogWriter: lifecycle events as tracing records
//!
//! A minimal subscriber that renders incoming [`Event`]s through `tracing`.
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt`) to see them.
//!
//! ## Example output
//! ```text
//! INFO  spawned task="collector" id=task-3 priority=5
//! INFO  service returned task="collector" id=task-3
//! INFO  self-exited task="collector" id=task-3
//! INFO  terminate requested count=2
//! INFO  terminated task="poller" id=task-4
//! WARN  exit race lost task="poller" id=task-4
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let id = e.task_id.map(|id| id.to_string()).unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::TaskSpawned => {
                tracing::info!(task, id = %id, priority = e.priority, "spawned");
            }
            EventKind::SpawnFailed => {
                tracing::error!(task, reason, "spawn failed");
            }
            EventKind::ServiceReturned => {
                tracing::info!(task, id = %id, "service returned");
            }
            EventKind::ServiceFailed => {
                tracing::warn!(task, id = %id, reason, "service failed");
            }
            EventKind::SelfExited => {
                tracing::info!(task, id = %id, "self-exited");
            }
            EventKind::ExitRaceLost => {
                tracing::warn!(task, id = %id, "exit race lost");
            }
            EventKind::TerminateRequested => {
                tracing::info!(count = e.count, "terminate requested");
            }
            EventKind::CleanupPanicked => {
                tracing::error!(task, id = %id, reason, "cleanup panicked");
            }
            EventKind::TaskTerminated => {
                tracing::info!(task, id = %id, "terminated");
            }
            EventKind::TerminateSkipped => {
                tracing::warn!(task, id = %id, reason, "terminate skipped");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = task, reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = task, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
