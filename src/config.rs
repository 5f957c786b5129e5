//! # Supervisor and scheduler configuration.
//!
//! Provides [`Config`] centralized settings for the supervisor and the
//! tokio-backed scheduler.
//!
//! Config is used in three ways:
//! 1. **Supervisor creation**: `Supervisor::builder(config)`
//! 2. **Scheduler limits**: `TokioScheduler::from_config(&config)`
//! 3. **Spawn defaults**: `SpawnOptions::with_defaults(&config)`
//!
//! ## Sentinel values
//! - `max_contexts = 0` → unlimited live execution contexts
//! - `stack_pool = 0` → no stack accounting

/// Global configuration for the supervisor runtime.
///
/// ## Field semantics
/// - `bus_capacity`: Events retained for lagging receivers (`0` behaves as 1)
/// - `max_contexts`: Live execution-context limit (`0` = unlimited)
/// - `stack_pool`: Total stack budget in bytes shared by live contexts (`0` = unlimited)
/// - `default_stack`: Stack budget used by `SpawnOptions::with_defaults`
/// - `default_priority`: Priority used by `SpawnOptions::with_defaults`
///
/// Read the limits through [`Config::context_limit`] and
/// [`Config::stack_limit`] rather than comparing against `0`.
#[derive(Clone, Debug)]
pub struct Config {
    /// Events retained by the bus for receivers that fall behind.
    ///
    /// A `Supervisor::subscribe()` receiver further behind than this loses the
    /// oldest events. `0` is treated as 1.
    pub bus_capacity: usize,

    /// Maximum number of execution contexts alive at once.
    ///
    /// - `0` = unlimited
    /// - `n > 0` = the `n+1`-th spawn fails with `SpawnError::Exhausted`
    ///
    /// A context counts as alive until its future completes or is deleted.
    pub max_contexts: usize,

    /// Stack pool in bytes.
    ///
    /// Each live context reserves its `SpawnOptions::stack` budget from the pool.
    /// - `0` = no accounting
    pub stack_pool: usize,

    /// Default stack budget for a new context, in bytes.
    pub default_stack: usize,

    /// Default scheduler priority for a new context.
    ///
    /// Advisory: tokio has no priorities, the value is carried on events.
    pub default_priority: u8,
}

impl Config {
    /// Returns the live-context limit as an `Option`.
    ///
    /// - `None` → unlimited
    /// - `Some(n)` → at most `n` live contexts
    #[inline]
    pub fn context_limit(&self) -> Option<usize> {
        if self.max_contexts == 0 {
            None
        } else {
            Some(self.max_contexts)
        }
    }

    /// Returns the stack pool size as an `Option`.
    #[inline]
    pub fn stack_limit(&self) -> Option<usize> {
        if self.stack_pool == 0 {
            None
        } else {
            Some(self.stack_pool)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `max_contexts = 0` (unlimited)
    /// - `stack_pool = 0` (no accounting)
    /// - `default_stack = 4096`
    /// - `default_priority = 5`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            max_contexts: 0,
            stack_pool: 0,
            default_stack: 4096,
            default_priority: 5,
        }
    }
}
