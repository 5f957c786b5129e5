//! # SupervisorBuilder: wiring for a new supervisor.
//!
//! Picks the scheduler (default [`TokioScheduler`]), creates the bus and,
//! when subscribers are given, starts the listener that feeds them.
//!
//! ```text
//! Bus ─► subscriber_listener ─► SubscriberSet ─► one worker per subscriber
//!              ▲
//!              └─ stops on Supervisor::drop, after flushing what is queued
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    events::Bus,
    scheduler::{Scheduler, TokioScheduler},
    subscribers::{Subscribe, SubscriberSet},
};

use super::{registry::Registry, supervisor::Supervisor};

/// Builder for constructing a Supervisor with optional features.
pub struct SupervisorBuilder {
    cfg: Config,
    scheduler: Option<Arc<dyn Scheduler>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            scheduler: None,
            subscribers: Vec::new(),
        }
    }

    /// Uses `scheduler` to create and delete execution contexts.
    ///
    /// Default: [`TokioScheduler::from_config`] with this builder's config.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive lifecycle events through dedicated workers with
    /// bounded queues. Non-empty subscribers require a tokio runtime at `build()`.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds and returns the Supervisor instance.
    ///
    /// This consumes the builder and initializes:
    /// - Event bus for broadcasting
    /// - Empty child registry
    /// - Subscriber workers and the bus listener feeding them (if any)
    pub fn build(self) -> Arc<Supervisor> {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let scheduler = self
            .scheduler
            .unwrap_or_else(|| Arc::new(TokioScheduler::from_config(&self.cfg)));
        let listener_stop = CancellationToken::new();

        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            subscriber_listener(&bus, subs, listener_stop.clone());
        }

        Arc::new(Supervisor::new_internal(
            self.cfg,
            bus,
            Registry::new(),
            scheduler,
            listener_stop,
        ))
    }
}

/// Forwards bus events to the subscriber set until `stop` fires, then flushes what is queued.
fn subscriber_listener(bus: &Bus, set: SubscriberSet, stop: CancellationToken) {
    let mut rx = bus.subscribe();
    tracing::debug!(subscribers = set.len(), "subscriber listener started");
    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
                _ = stop.cancelled() => {
                    while let Ok(ev) = rx.try_recv() {
                        set.emit(&ev);
                    }
                    break;
                }
            }
        }
        set.shutdown().await;
    });
}
