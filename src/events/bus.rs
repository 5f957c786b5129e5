//! # Lifecycle event bus.
//!
//! Every supervisor owns one [`Bus`], and so does every task it spawns (as a
//! clone). Publishing happens from places that must never wait: a task on
//! its way to deleting its own context, `terminate_all` between two
//! teardowns, or `Drop`. So publishing is a `broadcast` send that ignores the
//! result.
//!
//! ```text
//! Task::spawn / Task::run / Task::exit ──┐
//! Task::terminate                      ──┼──► Bus ──┬──► subscriber_listener ──► SubscriberSet
//! Supervisor::terminate_all            ──┘          └──► Supervisor::subscribe() receivers
//! ```
//!
//! Receivers see only what was published after they subscribed. A receiver
//! more than `capacity` events behind gets `RecvError::Lagged` and resumes
//! from the oldest retained event.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable broadcast sender for [`Event`]s.
#[derive(Clone, Debug)]
pub struct Bus {
    sender: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus retaining up to `capacity` events (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Sends `ev` to current receivers; dropped if there are none.
    pub fn publish(&self, ev: Event) {
        let _ = self.sender.send(ev);
    }

    /// New receiver for events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}

impl Default for Bus {
    /// A bus nobody listens to; used by untethered tasks.
    fn default() -> Self {
        Self::new(1)
    }
}
