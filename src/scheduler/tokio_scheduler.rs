//! # Tokio-backed scheduler.
//!
//! Execution contexts are tokio tasks running a [`GatedEntry`]. Deleting a
//! context withdraws its entry (waiting out a poll in progress, dropping
//! everything the entry owns) and then aborts the now empty tokio task.
//!
//! ## Resource accounting
//! ```text
//! create(opts)
//!   ├─► runtime  = cores[affinity] | configured runtime | Handle::try_current()
//!   ├─► contexts.try_acquire_owned()            (max_contexts, optional)
//!   ├─► stack.try_acquire_many_owned(opts.stack) (stack_pool, optional)
//!   └─► runtime.spawn(GatedEntry(entry + permits)) permits return when the entry is dropped
//! ```

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::Config;
use crate::error::SpawnError;
use crate::scheduler::{ContextHandle, EntryFuture, GatedEntry, Scheduler, SpawnOptions};

/// Fixed-size permit pool.
#[derive(Debug)]
struct Pool {
    size: usize,
    permits: Arc<Semaphore>,
}

impl Pool {
    fn new(size: usize) -> Self {
        Self {
            size,
            permits: Arc::new(Semaphore::new(size.min(Semaphore::MAX_PERMITS))),
        }
    }

    fn in_use(&self) -> usize {
        self.size
            .min(Semaphore::MAX_PERMITS)
            .saturating_sub(self.permits.available_permits())
    }
}

/// Scheduler spawning contexts on tokio runtimes.
///
/// ### Rules
/// - Without affinity the context runs on the configured runtime, or the
///   runtime of the caller.
/// - With affinity `n` the context runs on the `n`-th pinned runtime
///   (e.g. one current-thread runtime per core).
/// - Priority is advisory and only recorded on the context's tracing span.
#[derive(Debug, Default)]
pub struct TokioScheduler {
    runtime: Option<Handle>,
    cores: Vec<Handle>,
    contexts: Option<Pool>,
    stack: Option<Pool>,
}

impl TokioScheduler {
    /// Unlimited scheduler on the caller's runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scheduler with the limits from `cfg`.
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            contexts: cfg.context_limit().map(Pool::new),
            stack: cfg.stack_limit().map(Pool::new),
            ..Self::default()
        }
    }

    /// Runs unpinned contexts on `handle` instead of the caller's runtime.
    pub fn with_runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Sets the runtimes addressed by `SpawnOptions::affinity`.
    pub fn with_cores(mut self, cores: Vec<Handle>) -> Self {
        self.cores = cores;
        self
    }

    /// Number of live contexts, if a context limit is configured.
    pub fn live_contexts(&self) -> Option<usize> {
        self.contexts.as_ref().map(Pool::in_use)
    }

    /// Stack bytes reserved by live contexts, if a stack pool is configured.
    pub fn reserved_stack(&self) -> Option<usize> {
        self.stack.as_ref().map(Pool::in_use)
    }

    fn pick_runtime(&self, affinity: Option<usize>) -> Result<Handle, SpawnError> {
        match affinity {
            Some(core) => self
                .cores
                .get(core)
                .cloned()
                .ok_or(SpawnError::InvalidAffinity {
                    core,
                    available: self.cores.len(),
                }),
            None => match &self.runtime {
                Some(handle) => Ok(handle.clone()),
                None => Handle::try_current().map_err(|_| SpawnError::NoRuntime),
            },
        }
    }

    fn reserve_context(&self) -> Result<Option<OwnedSemaphorePermit>, SpawnError> {
        let Some(pool) = &self.contexts else {
            return Ok(None);
        };
        Arc::clone(&pool.permits)
            .try_acquire_owned()
            .map(Some)
            .map_err(|_| SpawnError::Exhausted { limit: pool.size })
    }

    fn reserve_stack(&self, requested: usize) -> Result<Option<OwnedSemaphorePermit>, SpawnError> {
        let Some(pool) = &self.stack else {
            return Ok(None);
        };
        let exhausted = SpawnError::StackExhausted {
            requested,
            pool: pool.size,
        };
        let n = u32::try_from(requested).map_err(|_| exhausted.clone())?;
        Arc::clone(&pool.permits)
            .try_acquire_many_owned(n)
            .map(Some)
            .map_err(|_| exhausted)
    }
}

impl Scheduler for TokioScheduler {
    fn create(
        &self,
        name: &str,
        options: &SpawnOptions,
        entry: EntryFuture,
    ) -> Result<ContextHandle, SpawnError> {
        let runtime = self.pick_runtime(options.affinity)?;
        let context_permit = self.reserve_context()?;
        let stack_permit = self.reserve_stack(options.stack)?;

        let span = tracing::debug_span!(
            "context",
            name = %name,
            stack = options.stack,
            priority = options.priority
        );
        // permits live inside the entry so withdrawing it releases them
        let entry = GatedEntry::new(Box::pin(async move {
            let _permits = (context_permit, stack_permit);
            entry.await;
        }));
        Ok(entry.spawn_on(&runtime, span))
    }

    fn delete(&self, handle: &ContextHandle) {
        handle.withdraw();
        handle.abort();
    }
}
