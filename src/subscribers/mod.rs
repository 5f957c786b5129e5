//! # Event subscribers.
//!
//! This module provides the [`Subscribe`] trait and the [`SubscriberSet`]
//! fan-out used by the supervisor to deliver lifecycle events.
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Task / Supervisor ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                         │
//!                                                         ▼
//!                                                   SubscriberSet::emit
//!                                              ┌──────────┼──────────┐
//!                                              ▼          ▼          ▼
//!                                          LogWriter   Metrics     Custom
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
