//! # Scheduler capability.
//!
//! The supervisor never schedules anything itself. It consumes a
//! [`Scheduler`] that can:
//! - create an execution context bound to an entry future,
//! - delete another context, returning only once its entry can no longer run,
//! - delete the **caller's own** context, which never returns.
//!
//! ```text
//! Task::spawn ──► Scheduler::create(name, options, entry) ──► ContextHandle
//! terminate   ──► Scheduler::delete(&handle)                 (other context)
//! self-exit   ──► Scheduler::exit_current(&handle).await     (own context, never resumes)
//! ```
//!
//! [`TokioScheduler`] is the provided implementation: contexts are tokio tasks
//! running a [`GatedEntry`]. Deletion withdraws the entry, then aborts the task.

mod context;
mod options;
mod tokio_scheduler;

use std::convert::Infallible;

use futures::future::BoxFuture;
use crate::error::SpawnError;

pub use context::{ContextHandle, GatedEntry};
pub use options::SpawnOptions;
pub use tokio_scheduler::TokioScheduler;

/// Entry point run on a new execution context.
pub type EntryFuture = BoxFuture<'static, ()>;

/// Capability to create and delete execution contexts.
pub trait Scheduler: Send + Sync + 'static {
    /// Creates a context running `entry`.
    ///
    /// On error no context exists and `entry` has been dropped unpolled.
    fn create(
        &self,
        name: &str,
        options: &SpawnOptions,
        entry: EntryFuture,
    ) -> Result<ContextHandle, SpawnError>;

    /// Deletes another context.
    ///
    /// Returns once the entry will never be polled again. A poll in progress
    /// on another thread is waited for.
    fn delete(&self, handle: &ContextHandle);

    /// Deletes the caller's own context.
    ///
    /// The returned future never completes: the context stops at its first
    /// poll. Callers must `.await` it as the last thing they do.
    fn exit_current(&self, handle: &ContextHandle) -> BoxFuture<'static, Infallible> {
        handle.abort();
        Box::pin(park_forever())
    }
}

/// Suspends forever; only deletion of the surrounding context ends it.
pub(crate) async fn park_forever() -> Infallible {
    loop {
        std::future::pending::<()>().await;
    }
}
