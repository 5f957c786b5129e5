//! # Spawn options handed to the scheduler.
//!
//! Bundles the per-context parameters of a spawn request:
//! - stack budget in bytes (accounted against the scheduler's stack pool)
//! - priority (advisory)
//! - optional core affinity (index into the scheduler's pinned runtimes)
//! - optional name override (defaults to the service name)
//!
//! Options can be created:
//! - **Explicitly** with [`SpawnOptions::new`]
//! - **From config** with [`SpawnOptions::with_defaults`]

use std::sync::Arc;

use crate::config::Config;

/// Parameters for creating one execution context.
///
/// ## Example
/// ```rust
/// use taskparent::{Config, SpawnOptions};
///
/// let cfg = Config::default();
/// let opts = SpawnOptions::with_defaults(&cfg).pinned_to(1).named("poller");
/// assert_eq!(opts.stack, cfg.default_stack);
/// assert_eq!(opts.affinity, Some(1));
/// assert_eq!(opts.name.as_deref(), Some("poller"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpawnOptions {
    /// Stack budget in bytes.
    pub stack: usize,
    /// Advisory priority.
    pub priority: u8,
    /// Core to pin the context to; `None` lets the scheduler choose.
    pub affinity: Option<usize>,
    /// Name override for the context; `None` uses the service name.
    pub name: Option<Arc<str>>,
}

impl SpawnOptions {
    /// Creates options with the given stack budget and priority.
    pub fn new(stack: usize, priority: u8) -> Self {
        Self {
            stack,
            priority,
            affinity: None,
            name: None,
        }
    }

    /// Creates options from the config defaults.
    pub fn with_defaults(cfg: &Config) -> Self {
        Self::new(cfg.default_stack, cfg.default_priority)
    }

    /// Pins the context to `core`.
    pub fn pinned_to(mut self, core: usize) -> Self {
        self.affinity = Some(core);
        self
    }

    /// Overrides the context name.
    pub fn named(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl Default for SpawnOptions {
    fn default() -> Self {
        Self::with_defaults(&Config::default())
    }
}
