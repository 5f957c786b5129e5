//! # Task: one unit of work with exactly-once teardown.
//!
//! A [`Task`] binds a [`Service`](crate::Service) to its own execution
//! context. It is destroyed by exactly one of two paths:
//!
//! ```text
//! Created ─► Running ─► service() returns (own context)
//!               │          ├─ deregister() == true  ─► SelfExiting ─► Destroyed ─► exit_current (never returns)
//!               │          └─ deregister() == false ─► park until `released`
//!               │                                                   ▲
//!               └─ terminate (claimant, other context) ─► BeingTerminated ─► cleanup() ─► delete(context)
//!                                                                          ─► Destroyed ─► release
//! ```
//!
//! ## Rules
//! - The registry claim decides the destroyer: a `true` from `deregister`
//!   hands destruction to its caller (the task itself on self-exit), a drain
//!   by `terminate_all` hands it to the supervisor. The loser never touches
//!   the task again.
//! - [`Task::terminate`] returns only once the service can no longer run;
//!   only then is the task `Destroyed`.
//! - The context is created gated and only released after registration, so a
//!   task can never try to deregister before it was registered.
//! - `cleanup` never runs on the self-exit path.

use std::convert::Infallible;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use futures::FutureExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::core::Supervisor;
use crate::error::{SpawnError, TaskError, panic_info};
use crate::events::{Bus, Event, EventKind};
use crate::scheduler::{ContextHandle, EntryFuture, Scheduler, SpawnOptions, park_forever};
use crate::services::ServiceRef;

/// Global task id counter.
static TASK_SEQ: AtomicU64 = AtomicU64::new(1);

/// Process-unique task identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    fn next() -> Self {
        Self(TASK_SEQ.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TaskState {
    /// Record built, context not started.
    Created = 0,
    /// Context released; `service` runs or has been scheduled.
    Running = 1,
    /// Deregistered itself; destroying its own context.
    SelfExiting = 2,
    /// Claimed by `terminate_all`; cleanup and deletion in progress.
    BeingTerminated = 3,
    /// Terminal.
    Destroyed = 4,
}

impl TaskState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskState::Created,
            1 => TaskState::Running,
            2 => TaskState::SelfExiting,
            3 => TaskState::BeingTerminated,
            _ => TaskState::Destroyed,
        }
    }

    /// Short stable label for events.
    pub fn as_label(self) -> &'static str {
        match self {
            TaskState::Created => "created",
            TaskState::Running => "running",
            TaskState::SelfExiting => "self_exiting",
            TaskState::BeingTerminated => "being_terminated",
            TaskState::Destroyed => "destroyed",
        }
    }
}

/// Shared reference to a task record.
pub type TaskRef = Arc<Task>;

/// Lifecycle record of one spawned service.
pub struct Task {
    id: TaskId,
    name: Arc<str>,
    priority: u8,
    service: ServiceRef,
    owner: Option<Weak<Supervisor>>,
    scheduler: Arc<dyn Scheduler>,
    bus: Bus,
    context: OnceLock<ContextHandle>,
    state: AtomicU8,
    /// Fired by the terminate path once the task is destroyed.
    released: CancellationToken,
    /// Owner dropped from this task's own context; self-exit needs no claim.
    orphaned: AtomicBool,
}

impl Task {
    pub(crate) fn new(
        service: ServiceRef,
        options: &SpawnOptions,
        owner: Option<Weak<Supervisor>>,
        scheduler: Arc<dyn Scheduler>,
        bus: Bus,
    ) -> Self {
        let name = options
            .name
            .clone()
            .unwrap_or_else(|| Arc::from(service.name()));
        Self {
            id: TaskId::next(),
            name,
            priority: options.priority,
            service,
            owner,
            scheduler,
            bus,
            context: OnceLock::new(),
            state: AtomicU8::new(TaskState::Created as u8),
            released: CancellationToken::new(),
            orphaned: AtomicBool::new(false),
        }
    }

    /// Spawns a task with no supervisor. It self-destroys when its service returns.
    pub fn spawn_untethered(
        scheduler: Arc<dyn Scheduler>,
        service: ServiceRef,
        options: SpawnOptions,
    ) -> Result<TaskRef, SpawnError> {
        Self::spawn(scheduler, None, Bus::default(), service, options)
    }

    /// Creates the context gated, registers with `owner`, then opens the gate.
    pub(crate) fn spawn(
        scheduler: Arc<dyn Scheduler>,
        owner: Option<&Arc<Supervisor>>,
        bus: Bus,
        service: ServiceRef,
        options: SpawnOptions,
    ) -> Result<TaskRef, SpawnError> {
        let task = Arc::new(Task::new(
            service,
            &options,
            owner.map(Arc::downgrade),
            scheduler,
            bus,
        ));

        let (go_tx, go_rx) = oneshot::channel::<()>();
        let entry_task = Arc::clone(&task);
        let entry: EntryFuture = Box::pin(async move {
            if go_rx.await.is_ok() {
                entry_task.run().await;
            }
        });

        let handle = match task.scheduler.create(&task.name, &options, entry) {
            Ok(handle) => handle,
            Err(err) => {
                task.bus.publish(
                    Event::new(EventKind::SpawnFailed)
                        .with_task(Arc::clone(&task.name))
                        .with_reason(err.as_label()),
                );
                return Err(err);
            }
        };
        let _ = task.context.set(handle);
        task.state
            .store(TaskState::Running as u8, Ordering::Release);

        if let Some(owner) = owner {
            owner.register(Arc::clone(&task));
        }
        task.publish(Event::new(EventKind::TaskSpawned).with_priority(task.priority));
        let _ = go_tx.send(());
        Ok(task)
    }

    /// Task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Task name (service name unless overridden at spawn).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True once either teardown path has completed.
    pub fn is_destroyed(&self) -> bool {
        self.state() == TaskState::Destroyed
    }

    /// True once the execution context itself has stopped.
    pub fn is_context_finished(&self) -> bool {
        self.context.get().is_some_and(ContextHandle::is_finished)
    }

    /// True when called from this task's own execution context.
    pub(crate) fn is_current(&self) -> bool {
        self.context.get().is_some_and(ContextHandle::is_current)
    }

    fn transition(&self, from: TaskState, to: TaskState) -> Result<(), TaskState> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(TaskState::from_u8)
    }

    fn publish(&self, ev: Event) {
        self.bus
            .publish(ev.with_task(Arc::clone(&self.name)).with_task_id(self.id));
    }

    /// Body of the execution context.
    async fn run(&self) {
        let outcome = AssertUnwindSafe(self.service.service())
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                Err(TaskError::Panicked {
                    info: panic_info(&*panic),
                })
            });
        match outcome {
            Ok(()) => self.publish(Event::new(EventKind::ServiceReturned)),
            Err(err) => {
                self.publish(Event::new(EventKind::ServiceFailed).with_reason(err.as_message()))
            }
        }
        self.exit().await;
    }

    /// Marks the task as left behind by an owner dropped from this task's
    /// own context.
    pub(crate) fn orphan(&self) {
        self.orphaned.store(true, Ordering::Release);
    }

    /// Self-exit: claim the right to destroy, or step aside.
    async fn exit(&self) {
        let claimed = match &self.owner {
            None => true,
            Some(owner) => match owner.upgrade() {
                Some(supervisor) => supervisor.deregister(self),
                // A dead owner drained its registry, except an orphan.
                None => self.orphaned.load(Ordering::Acquire),
            },
        };
        if claimed
            && self
                .transition(TaskState::Running, TaskState::SelfExiting)
                .is_ok()
        {
            match self.destroy_self().await {}
        }

        self.publish(Event::new(EventKind::ExitRaceLost));
        self.released.cancelled().await;
    }

    async fn destroy_self(&self) -> Infallible {
        self.publish(Event::new(EventKind::SelfExited));
        self.state
            .store(TaskState::Destroyed as u8, Ordering::Release);

        match self.context.get() {
            Some(handle) => self.scheduler.exit_current(handle).await,
            None => park_forever().await,
        }
    }

    /// Forced termination from another context.
    ///
    /// Only the holder of the claim may call this: `terminate_all` for what it
    /// drained, or whoever got `true` from [`Supervisor::deregister`] (or owns
    /// an untethered task). Runs `cleanup`, deletes the context and returns
    /// once the service can no longer run. A task that already left `Running`
    /// is left alone and reported as `TerminateSkipped`.
    ///
    /// # Panics
    /// When called from the task's own execution context.
    pub fn terminate(&self) {
        assert!(
            !self.is_current(),
            "{} terminated from its own execution context",
            self.id
        );
        if let Err(observed) = self.transition(TaskState::Running, TaskState::BeingTerminated) {
            self.publish(Event::new(EventKind::TerminateSkipped).with_reason(observed.as_label()));
            return;
        }

        let service = &self.service;
        if let Err(panic) = std::panic::catch_unwind(AssertUnwindSafe(|| service.cleanup())) {
            self.publish(Event::new(EventKind::CleanupPanicked).with_reason(panic_info(&*panic)));
        }
        if let Some(handle) = self.context.get() {
            self.scheduler.delete(handle);
        }
        self.state
            .store(TaskState::Destroyed as u8, Ordering::Release);
        self.released.cancel();
        self.publish(Event::new(EventKind::TaskTerminated));
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state())
            .field("tethered", &self.owner.is_some())
            .finish()
    }
}
