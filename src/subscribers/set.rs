//! # SubscriberSet: per-subscriber queues behind the bus listener.
//!
//! The bus listener hands every event to [`SubscriberSet::emit`], which only
//! enqueues. Each subscriber has a bounded queue and a worker draining it, so
//! a slow or panicking subscriber delays nothing but itself.
//!
//! ```text
//! subscriber_listener ─► emit(&Event)
//!                          ├─► try_send ─► [queue 1] ─► worker 1 ─► on_event (catch_unwind)
//!                          └─► try_send ─► [queue N] ─► worker N ─► on_event (catch_unwind)
//!                                 │
//!                                 └─ full/closed ─► SubscriberOverflow on the bus
//! ```
//!
//! Order is kept per subscriber, not across subscribers.

use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;

use crate::error::panic_info;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

/// One subscriber's queue and the worker draining it.
struct Lane {
    name: &'static str,
    queue: mpsc::Sender<Arc<Event>>,
    worker: JoinHandle<()>,
}

impl Lane {
    fn open(sub: Arc<dyn Subscribe>, bus: Bus) -> Self {
        let (queue, rx) = mpsc::channel(sub.queue_capacity().max(1));
        Self {
            name: sub.name(),
            queue,
            worker: tokio::spawn(drain_lane(sub, rx, bus)),
        }
    }

    /// Enqueues without waiting; `Err` names why the event was dropped.
    fn offer(&self, event: &Arc<Event>) -> Result<(), &'static str> {
        self.queue.try_send(Arc::clone(event)).map_err(|err| match err {
            TrySendError::Full(_) => "full",
            TrySendError::Closed(_) => "closed",
        })
    }
}

/// Worker body: delivers queued events in order until the queue closes.
async fn drain_lane(sub: Arc<dyn Subscribe>, mut rx: mpsc::Receiver<Arc<Event>>, bus: Bus) {
    while let Some(event) = rx.recv().await {
        let delivery = std::panic::AssertUnwindSafe(sub.on_event(&event)).catch_unwind();
        if let Err(payload) = delivery.await {
            let info = panic_info(&*payload);
            tracing::warn!(subscriber = sub.name(), %info, "subscriber panicked");
            bus.publish(Event::subscriber_panicked(sub.name(), info));
        }
    }
}

/// Queues and workers for a fixed list of subscribers.
pub struct SubscriberSet {
    lanes: Vec<Lane>,
    bus: Bus,
}

impl SubscriberSet {
    /// Opens one lane per subscriber; panics and drops are reported on `bus`.
    ///
    /// Must be called inside a tokio runtime when `subs` is not empty.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let lanes = subs
            .into_iter()
            .map(|sub| Lane::open(sub, bus.clone()))
            .collect();
        Self { lanes, bus }
    }

    /// Hands `event` to every lane without waiting.
    ///
    /// A full or closed lane loses the event and a `SubscriberOverflow` is
    /// published for it, except when the lost event is itself an overflow.
    pub fn emit(&self, event: &Event) {
        let shared = Arc::new(event.clone());
        for lane in &self.lanes {
            if let Err(reason) = lane.offer(&shared) {
                self.report_drop(lane.name, reason, event.kind);
            }
        }
    }

    fn report_drop(&self, subscriber: &'static str, reason: &'static str, lost: EventKind) {
        tracing::warn!(subscriber, reason, lost = ?lost, "subscriber dropped event");
        if lost != EventKind::SubscriberOverflow {
            self.bus
                .publish(Event::subscriber_overflow(subscriber, reason));
        }
    }

    /// Closes every lane and waits until its worker has delivered the backlog.
    pub async fn shutdown(self) {
        for Lane { queue, worker, .. } in self.lanes {
            drop(queue);
            let _ = worker.await;
        }
    }

    /// Number of subscribers.
    pub(crate) fn len(&self) -> usize {
        self.lanes.len()
    }
}
