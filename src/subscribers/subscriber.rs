//! # Lifecycle observers.
//!
//! [`Subscribe`] is how callers watch tasks come and go without sitting on
//! the teardown path. Delivery is decoupled from publishing: a task that
//! self-exits, or a `terminate_all` sweep, publishes and moves on, while each
//! subscriber drains its own queue on its own worker.
//!
//! A subscriber that falls behind loses events (reported as
//! `SubscriberOverflow`); one that panics keeps receiving later events
//! (each panic is reported as `SubscriberPanicked`).
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use async_trait::async_trait;
//! use taskparent::{Event, Subscribe};
//!
//! #[derive(Default)]
//! struct Destructions(AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for Destructions {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.is_destruction() {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "destructions" }
//!     fn queue_capacity(&self) -> usize { 4096 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of supervisor and task lifecycle events.
///
/// Runs on a worker of its own. Must not block the executor; errors are the
/// subscriber's business.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event. Calls are sequential, in publish order.
    async fn on_event(&self, event: &Event);

    /// Name carried on overflow and panic reports. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue length before events are dropped for this subscriber (min 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
