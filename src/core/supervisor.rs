//! # Supervisor: owner of a registry of child tasks.
//!
//! The [`Supervisor`] spawns tasks, tracks the live ones in a guarded
//! registry and forcibly terminates them on request or on drop.
//!
//! ## Key responsibilities
//! - `register` / `deregister` children under one mutex
//! - `terminate_all`: drain under the guard, then clean up and delete each
//!   child outside the guard, one at a time
//! - `terminate`: claim one child and destroy it
//! - publish lifecycle events on the [`Bus`] (fanned out to subscribers)
//!
//! Dropping the last handle from inside a child's own context terminates the
//! other children and leaves that one to finish and self-exit.
//!
//! ## Two teardown paths
//! ```text
//! child context                          supervisor context
//! ─────────────                          ──────────────────
//! service() returns                      terminate_all()
//!   └─► deregister(self) ──┐               └─► lock ─► drain ─► unlock
//!                          │ same guard          │
//!        true ◄────────────┤                     ├─► cleanup(child)
//!        │                 └──────────► false    ├─► delete(child context)
//!        ▼                              │        └─► release(child)
//!   destroy self, exit_current          ▼
//!                                 park until released
//! ```
//! Whichever side removes the entry from the registry owns destruction.
//!
//! ## Example
//! ```rust
//! use taskparent::{Config, ServiceFn, SpawnOptions, Supervisor, TaskError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::default();
//!     let sup = Supervisor::new(cfg.clone());
//!
//!     let ticker = ServiceFn::arc("ticker", || async {
//!         tokio::time::sleep(std::time::Duration::from_secs(3600)).await;
//!         Ok::<(), TaskError>(())
//!     });
//!     sup.spawn(ticker, SpawnOptions::with_defaults(&cfg))?;
//!     assert_eq!(sup.len(), 1);
//!
//!     sup.terminate_all();
//!     assert!(sup.is_empty());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::builder::SupervisorBuilder;
use crate::core::registry::Registry;
use crate::core::shutdown;
use crate::core::task::{Task, TaskId, TaskRef};
use crate::error::SpawnError;
use crate::events::{Bus, Event, EventKind};
use crate::scheduler::{Scheduler, SpawnOptions};
use crate::services::ServiceRef;

/// Owner of a set of live child tasks.
pub struct Supervisor {
    cfg: Config,
    bus: Bus,
    registry: Registry,
    scheduler: Arc<dyn Scheduler>,
    listener_stop: CancellationToken,
}

impl Supervisor {
    /// Creates a supervisor with the default tokio scheduler and no subscribers.
    pub fn new(cfg: Config) -> Arc<Self> {
        SupervisorBuilder::new(cfg).build()
    }

    /// Returns a builder for configuring scheduler and subscribers.
    pub fn builder(cfg: Config) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: Config,
        bus: Bus,
        registry: Registry,
        scheduler: Arc<dyn Scheduler>,
        listener_stop: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            bus,
            registry,
            scheduler,
            listener_stop,
        }
    }

    /// Spawns `service` as a child of this supervisor.
    ///
    /// On error nothing is registered and no context exists.
    pub fn spawn(
        self: &Arc<Self>,
        service: ServiceRef,
        options: SpawnOptions,
    ) -> Result<TaskRef, SpawnError> {
        Task::spawn(
            Arc::clone(&self.scheduler),
            Some(self),
            self.bus.clone(),
            service,
            options,
        )
    }

    /// Spawns `service` with the config's default spawn options.
    pub fn spawn_default(self: &Arc<Self>, service: ServiceRef) -> Result<TaskRef, SpawnError> {
        self.spawn(service, SpawnOptions::with_defaults(&self.cfg))
    }

    /// Adds `task` to the children. Callers register each task once.
    pub fn register(&self, task: TaskRef) {
        self.registry.insert(task);
    }

    /// Removes `task` from the children.
    ///
    /// Returns `false` if it was not there, meaning someone else already owns
    /// its destruction; the caller must not destroy it. On `true` the caller
    /// owns it and must eventually call [`Task::terminate`], or the task parks
    /// for good once its service returns. [`Supervisor::terminate`] does both.
    #[must_use]
    pub fn deregister(&self, task: &Task) -> bool {
        self.registry.remove(task.id()).is_some()
    }

    /// Forcibly terminates every child.
    ///
    /// Drains the registry in one critical section, then, outside the guard
    /// and one child at a time (newest first): runs its `cleanup` hook,
    /// deletes its context and marks it destroyed. Returns when all are done.
    ///
    /// # Panics
    /// When called from the execution context of one of this supervisor's
    /// children. The registry is left untouched in that case.
    pub fn terminate_all(&self) {
        match self.registry.drain_all() {
            Ok(drained) => self.terminate_drained(drained),
            Err(own) => panic!("terminate_all called from the execution context of child {own}"),
        }
    }

    /// Forcibly terminates one child: claims it with `deregister`, then runs
    /// [`Task::terminate`].
    ///
    /// Returns `false`, doing nothing, when `task` is not a child any more
    /// (it self-exited, or another caller claimed it).
    ///
    /// # Panics
    /// When called from `task`'s own execution context, before anything is
    /// mutated.
    pub fn terminate(&self, task: &Task) -> bool {
        assert!(
            !task.is_current(),
            "{} terminated from its own execution context",
            task.id()
        );
        if !self.deregister(task) {
            return false;
        }
        self.bus
            .publish(Event::new(EventKind::TerminateRequested).with_count(1));
        task.terminate();
        true
    }

    fn terminate_drained(&self, drained: Vec<TaskRef>) {
        if drained.is_empty() {
            return;
        }
        self.bus
            .publish(Event::new(EventKind::TerminateRequested).with_count(drained.len()));
        for task in drained {
            task.terminate();
        }
    }

    /// Waits for SIGINT/SIGTERM/SIGQUIT (Ctrl-C elsewhere), then terminates all children.
    pub async fn terminate_on_signal(&self) -> std::io::Result<()> {
        shutdown::wait_for_shutdown_signal().await?;
        self.terminate_all();
        Ok(())
    }

    /// Ids of live children, newest first.
    pub fn children(&self) -> Vec<TaskId> {
        self.registry.ids()
    }

    /// True if `id` is a live child.
    pub fn contains(&self, id: TaskId) -> bool {
        self.registry.contains(id)
    }

    /// Number of live children.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// True if there are no live children.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Receiver of subsequent lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Configuration this supervisor was built with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        let (own, rest) = self.registry.drain_split();
        if let Some(own) = own {
            tracing::error!(
                task = %own.id(),
                name = own.name(),
                "supervisor dropped inside its own child; the child is left to self-exit"
            );
            own.orphan();
        }
        self.terminate_drained(rest);
        self.listener_stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TaskState;
    use crate::error::TaskError;
    use crate::services::{Service, ServiceFn};
    use crate::test_support::{CountingScheduler, wait_until};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Mutex, OnceLock, Weak};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Pends forever; counts cleanups.
    struct Sleeper {
        cleanups: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Service for Sleeper {
        fn name(&self) -> &str {
            "sleeper"
        }

        async fn service(&self) -> Result<(), TaskError> {
            std::future::pending::<()>().await;
            Ok(())
        }

        fn cleanup(&self) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn explode() -> Result<(), TaskError> {
        panic!("kaboom")
    }

    fn supervisor(sched: &Arc<CountingScheduler>) -> Arc<Supervisor> {
        let cfg = Config {
            bus_capacity: 4096,
            ..Config::default()
        };
        Supervisor::builder(cfg).with_scheduler(sched.clone()).build()
    }

    fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test]
    async fn test_terminate_all_on_empty_is_noop() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let mut rx = sup.subscribe();

        sup.terminate_all();

        assert!(sup.is_empty());
        assert_eq!(sched.deletes(), 0);
        assert!(drain_events(&mut rx).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_self_exit_removes_child() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let mut rx = sup.subscribe();

        let done = ServiceFn::arc("done", || async { Ok::<_, TaskError>(()) });
        let task = sup.spawn_default(done).expect("spawn");
        wait_until(|| task.is_destroyed() && task.is_context_finished()).await;

        assert!(!sup.contains(task.id()));
        assert!(sup.is_empty());
        assert_eq!(sched.self_exits(), 1);
        assert_eq!(sched.deletes(), 0);

        let kinds: Vec<EventKind> = drain_events(&mut rx).iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::TaskSpawned,
                EventKind::ServiceReturned,
                EventKind::SelfExited
            ]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failing_and_panicking_services_still_self_exit() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let mut rx = sup.subscribe();

        let fails = ServiceFn::arc("fails", || async {
            Err::<(), _>(TaskError::Fail {
                error: "disk full".into(),
            })
        });
        let panics = ServiceFn::arc("panics", || async { explode() });
        let a = sup.spawn_default(fails).expect("spawn");
        let b = sup.spawn_default(panics).expect("spawn");
        wait_until(|| a.is_destroyed() && b.is_destroyed()).await;

        assert!(sup.is_empty());
        assert_eq!(sched.self_exits(), 2);
        let mut reasons: Vec<String> = drain_events(&mut rx)
            .into_iter()
            .filter(|e| e.kind == EventKind::ServiceFailed)
            .filter_map(|e| e.reason.map(|r| r.to_string()))
            .collect();
        reasons.sort();
        assert_eq!(reasons, vec!["error: disk full", "panic: kaboom"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_terminate_all_cleans_each_child_once() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let counters: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();

        let tasks: Vec<TaskRef> = counters
            .iter()
            .map(|c| {
                sup.spawn_default(Arc::new(Sleeper {
                    cleanups: Arc::clone(c),
                }))
                .expect("spawn")
            })
            .collect();
        assert_eq!(
            sup.children(),
            tasks.iter().rev().map(|t| t.id()).collect::<Vec<_>>()
        );

        sup.terminate_all();

        assert!(sup.is_empty());
        for c in &counters {
            assert_eq!(c.load(Ordering::SeqCst), 1);
        }
        for t in &tasks {
            assert_eq!(t.state(), TaskState::Destroyed);
        }
        assert_eq!(sched.deletes(), 3);
        assert_eq!(sched.self_exits(), 0);
        wait_until(|| tasks.iter().all(|t| t.is_context_finished())).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_spawn_failure_registers_nothing() {
        let cfg = Config {
            max_contexts: 1,
            ..Config::default()
        };
        let sup = Supervisor::new(cfg);
        let mut rx = sup.subscribe();
        let cleanups = Arc::new(AtomicUsize::new(0));

        sup.spawn_default(Arc::new(Sleeper {
            cleanups: cleanups.clone(),
        }))
        .expect("first fits");
        let err = sup
            .spawn_default(Arc::new(Sleeper {
                cleanups: cleanups.clone(),
            }))
            .expect_err("limit reached");

        assert_eq!(err, SpawnError::Exhausted { limit: 1 });
        assert_eq!(sup.len(), 1);
        let failed: Vec<Event> = drain_events(&mut rx)
            .into_iter()
            .filter(|e| e.kind == EventKind::SpawnFailed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].reason.as_deref(), Some("spawn_exhausted"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drop_terminates_children() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let cleanups = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<TaskRef> = (0..2)
            .map(|_| {
                sup.spawn_default(Arc::new(Sleeper {
                    cleanups: cleanups.clone(),
                }))
                .expect("spawn")
            })
            .collect();

        drop(sup);

        assert_eq!(cleanups.load(Ordering::SeqCst), 2);
        assert_eq!(sched.deletes(), 2);
        wait_until(|| tasks.iter().all(|t| t.is_destroyed() && t.is_context_finished())).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_register_deregister_roundtrip() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let cleanups = Arc::new(AtomicUsize::new(0));
        let task = sup
            .spawn_default(Arc::new(Sleeper { cleanups }))
            .expect("spawn");
        let before = sup.children();

        let extra = Task::spawn_untethered(
            sched.clone(),
            ServiceFn::arc("extra", || async {
                std::future::pending::<()>().await;
                Ok::<_, TaskError>(())
            }),
            SpawnOptions::default(),
        )
        .expect("spawn");
        sup.register(Arc::clone(&extra));
        assert!(sup.contains(extra.id()));
        assert!(sup.deregister(&extra));
        assert_eq!(sup.children(), before);

        assert!(!sup.deregister(&extra));
        assert_eq!(sup.children(), before);
        assert!(sup.contains(task.id()));

        extra.terminate();
        assert!(extra.is_destroyed());
        assert!(extra.is_context_finished());
        assert_eq!(sched.deletes(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_deregistered_child_is_destroyed_by_claimant() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let cleanups = Arc::new(AtomicUsize::new(0));
        let task = sup
            .spawn_default(Arc::new(Sleeper {
                cleanups: cleanups.clone(),
            }))
            .expect("spawn");

        assert!(sup.deregister(&task));
        assert_eq!(task.state(), TaskState::Running);

        task.terminate();
        assert!(task.is_destroyed());
        assert!(task.is_context_finished());
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(sched.deletes(), 1);

        // already claimed and destroyed: nothing left for terminate_all
        sup.terminate_all();
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(sched.deletes(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_terminate_one_child() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let mut rx = sup.subscribe();
        let cleanups = Arc::new(AtomicUsize::new(0));
        let spawn = || {
            sup.spawn_default(Arc::new(Sleeper {
                cleanups: cleanups.clone(),
            }))
            .expect("spawn")
        };
        let (a, b) = (spawn(), spawn());

        assert!(sup.terminate(&a));
        assert!(a.is_destroyed());
        assert!(a.is_context_finished());
        assert_eq!(sup.children(), vec![b.id()]);
        assert_eq!(b.state(), TaskState::Running);

        assert!(!sup.terminate(&a));
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(sched.deletes(), 1);

        let requested: Vec<Event> = drain_events(&mut rx)
            .into_iter()
            .filter(|e| e.kind == EventKind::TerminateRequested)
            .collect();
        assert_eq!(requested.len(), 1);
        assert_eq!(requested[0].count, Some(1));
    }

    /// `terminate_all` runs while the service is inside a blocking stretch of
    /// one poll; the task may only be reported destroyed once that poll is
    /// over and nothing after it runs.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_terminate_all_waits_for_service_mid_poll() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let started = Arc::new(AtomicBool::new(false));
        let after = Arc::new(AtomicBool::new(false));
        let (st, af) = (started.clone(), after.clone());
        let busy = ServiceFn::arc("busy", move || {
            let (st, af) = (st.clone(), af.clone());
            async move {
                st.store(true, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(300));
                tokio::task::yield_now().await;
                af.store(true, Ordering::SeqCst);
                Ok::<_, TaskError>(())
            }
        });
        let task = sup.spawn_default(busy).expect("spawn");
        wait_until(|| started.load(Ordering::SeqCst)).await;

        let (s, t) = (Arc::clone(&sup), Arc::clone(&task));
        tokio::task::spawn_blocking(move || {
            s.terminate_all();
            assert_eq!(t.state(), TaskState::Destroyed);
            assert!(t.is_context_finished());
        })
        .await
        .expect("terminate_all");

        assert!(!after.load(Ordering::SeqCst));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!after.load(Ordering::SeqCst));
        assert_eq!(sched.deletes(), 1);
        assert_eq!(sched.self_exits(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_panicking_cleanup_still_destroys() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let mut rx = sup.subscribe();
        let service = ServiceFn::new("fragile", || async {
            std::future::pending::<()>().await;
            Ok::<_, TaskError>(())
        })
        .with_cleanup(|| panic!("cleanup boom"));
        let task = sup.spawn_default(Arc::new(service)).expect("spawn");

        sup.terminate_all();

        assert!(sup.is_empty());
        assert_eq!(task.state(), TaskState::Destroyed);
        assert!(task.is_context_finished());
        assert_eq!(sched.deletes(), 1);

        let events = drain_events(&mut rx);
        let panicked: Vec<&Event> = events
            .iter()
            .filter(|e| e.kind == EventKind::CleanupPanicked)
            .collect();
        assert_eq!(panicked.len(), 1);
        assert!(panicked[0].reason.as_deref().is_some_and(|r| r.contains("cleanup boom")));
        assert_eq!(
            events.iter().filter(|e| e.kind == EventKind::TaskTerminated).count(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_double_registration_is_terminated_once() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let mut rx = sup.subscribe();
        let cleanups = Arc::new(AtomicUsize::new(0));
        let task = sup
            .spawn_default(Arc::new(Sleeper {
                cleanups: cleanups.clone(),
            }))
            .expect("spawn");
        sup.register(Arc::clone(&task));
        assert_eq!(sup.len(), 2);

        sup.terminate_all();

        assert!(sup.is_empty());
        assert!(task.is_destroyed());
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(sched.deletes(), 1);

        let events = drain_events(&mut rx);
        let skipped: Vec<&Event> = events
            .iter()
            .filter(|e| e.kind == EventKind::TerminateSkipped)
            .collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].reason.as_deref(), Some("destroyed"));
        assert_eq!(
            events.iter().filter(|e| e.kind == EventKind::TaskTerminated).count(),
            1
        );
    }

    /// The last supervisor handle is dropped by one of its own children.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_drop_inside_child_spares_that_child() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let mut rx = sup.subscribe();
        let cleanups = Arc::new(AtomicUsize::new(0));
        let bystander = sup
            .spawn_default(Arc::new(Sleeper {
                cleanups: cleanups.clone(),
            }))
            .expect("spawn");

        let holder: Arc<Mutex<Option<Arc<Supervisor>>>> = Arc::new(Mutex::new(None));
        let gate = Arc::new(Notify::new());
        let (h, g) = (holder.clone(), gate.clone());
        let dropper = ServiceFn::arc("dropper", move || {
            let (h, g) = (h.clone(), g.clone());
            async move {
                g.notified().await;
                let last = h.lock().expect("holder").take();
                drop(last);
                tokio::task::yield_now().await;
                Ok::<_, TaskError>(())
            }
        });
        let dropper = sup.spawn_default(dropper).expect("spawn");
        *holder.lock().expect("holder") = Some(sup);
        gate.notify_one();

        wait_until(|| dropper.is_destroyed() && bystander.is_destroyed()).await;
        wait_until(|| dropper.is_context_finished() && bystander.is_context_finished()).await;
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(sched.deletes(), 1);
        assert_eq!(sched.self_exits(), 1);

        let events = drain_events(&mut rx);
        assert!(!events.iter().any(|e| e.kind == EventKind::ServiceFailed));
        assert!(!events.iter().any(|e| e.kind == EventKind::ExitRaceLost));
    }

    /// The task's service returns only once the supervisor has drained it, so
    /// its `deregister` must lose.
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_lost_race_parks_until_terminated() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let mut rx = sup.subscribe();

        let finish = Arc::new(Notify::new());
        let (parked_tx, parked_rx) = std::sync::mpsc::channel::<()>();
        let parked_rx = Arc::new(Mutex::new(parked_rx));

        let mut watcher = sup.subscribe();
        tokio::spawn(async move {
            while let Ok(ev) = watcher.recv().await {
                if ev.kind == EventKind::ExitRaceLost {
                    let _ = parked_tx.send(());
                }
            }
        });

        let f = finish.clone();
        let service = ServiceFn::new("racer", move || {
            let f = f.clone();
            async move {
                f.notified().await;
                Ok::<_, TaskError>(())
            }
        })
        .with_cleanup({
            let finish = finish.clone();
            let parked_rx = parked_rx.clone();
            move || {
                finish.notify_one();
                parked_rx
                    .lock()
                    .expect("parked lock")
                    .recv_timeout(Duration::from_secs(5))
                    .expect("task parked");
            }
        });
        let task = sup.spawn_default(Arc::new(service)).expect("spawn");

        let s = Arc::clone(&sup);
        tokio::task::spawn_blocking(move || s.terminate_all())
            .await
            .expect("terminate_all");

        assert!(task.is_destroyed());
        wait_until(|| task.is_context_finished()).await;
        assert_eq!(sched.self_exits(), 0);
        assert_eq!(sched.deletes(), 1);

        let kinds: Vec<EventKind> = drain_events(&mut rx).iter().map(|e| e.kind).collect();
        assert!(kinds.contains(&EventKind::ExitRaceLost));
        assert_eq!(kinds.iter().filter(|k| **k == EventKind::TaskTerminated).count(), 1);
        assert!(!kinds.contains(&EventKind::SelfExited));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exactly_once_destruction_under_race() {
        const N: usize = 64;

        for round in 0..8 {
            let sched = Arc::new(CountingScheduler::default());
            let sup = supervisor(&sched);
            let mut rx = sup.subscribe();
            let cleanups = Arc::new(AtomicUsize::new(0));

            let tasks: Vec<TaskRef> = (0..N)
                .map(|i| {
                    let c = cleanups.clone();
                    let yields = (i + round) % 5;
                    let service = ServiceFn::new("racer", move || async move {
                        for _ in 0..yields {
                            tokio::task::yield_now().await;
                        }
                        Ok::<_, TaskError>(())
                    })
                    .with_cleanup(move || {
                        c.fetch_add(1, Ordering::SeqCst);
                    });
                    sup.spawn_default(Arc::new(service)).expect("spawn")
                })
                .collect();

            let s = Arc::clone(&sup);
            tokio::task::spawn_blocking(move || s.terminate_all())
                .await
                .expect("terminate_all");
            wait_until(|| tasks.iter().all(|t| t.is_destroyed() && t.is_context_finished())).await;

            assert!(sup.is_empty());
            assert_eq!(sched.self_exits() + sched.deletes(), N, "round {round}");
            assert_eq!(cleanups.load(Ordering::SeqCst), sched.deletes(), "round {round}");

            let mut per_task: HashMap<TaskId, usize> = HashMap::new();
            for ev in drain_events(&mut rx).iter().filter(|e| e.is_destruction()) {
                *per_task.entry(ev.task_id.expect("id")).or_default() += 1;
            }
            assert_eq!(per_task.len(), N, "round {round}");
            assert!(per_task.values().all(|n| *n == 1), "round {round}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_terminate_all_from_own_child_is_refused() {
        let sched = Arc::new(CountingScheduler::default());
        let sup = supervisor(&sched);
        let mut rx = sup.subscribe();
        let slot: Arc<OnceLock<Weak<Supervisor>>> = Arc::new(OnceLock::new());
        let cleanups = Arc::new(AtomicUsize::new(0));

        let bystander = sup
            .spawn_default(Arc::new(Sleeper {
                cleanups: cleanups.clone(),
            }))
            .expect("spawn");

        let gate = Arc::new(Notify::new());
        let (s, g) = (slot.clone(), gate.clone());
        let rogue = ServiceFn::arc("rogue", move || {
            let (s, g) = (s.clone(), g.clone());
            async move {
                g.notified().await;
                if let Some(sup) = s.get().and_then(Weak::upgrade) {
                    sup.terminate_all();
                }
                Ok::<_, TaskError>(())
            }
        });
        let rogue = sup.spawn_default(rogue).expect("spawn");
        let _ = slot.set(Arc::downgrade(&sup));
        gate.notify_one();

        wait_until(|| rogue.is_destroyed()).await;
        assert!(sup.contains(bystander.id()));
        assert_eq!(cleanups.load(Ordering::SeqCst), 0);

        let failed: Vec<Event> = drain_events(&mut rx)
            .into_iter()
            .filter(|e| e.kind == EventKind::ServiceFailed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert!(
            failed[0]
                .reason
                .as_deref()
                .is_some_and(|r| r.contains("execution context of child"))
        );
    }
}
