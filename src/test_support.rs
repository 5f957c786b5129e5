//! Shared test helpers.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::BoxFuture;

use crate::error::SpawnError;
use crate::scheduler::{ContextHandle, EntryFuture, Scheduler, SpawnOptions, TokioScheduler};

/// Tokio scheduler that counts how contexts were destroyed.
#[derive(Default)]
pub(crate) struct CountingScheduler {
    inner: TokioScheduler,
    deletes: AtomicUsize,
    self_exits: AtomicUsize,
}

impl CountingScheduler {
    /// Contexts deleted from another context.
    pub(crate) fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Contexts that deleted themselves.
    pub(crate) fn self_exits(&self) -> usize {
        self.self_exits.load(Ordering::SeqCst)
    }
}

impl Scheduler for CountingScheduler {
    fn create(
        &self,
        name: &str,
        options: &SpawnOptions,
        entry: EntryFuture,
    ) -> Result<ContextHandle, SpawnError> {
        self.inner.create(name, options, entry)
    }

    fn delete(&self, handle: &ContextHandle) {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(handle);
    }

    fn exit_current(&self, handle: &ContextHandle) -> BoxFuture<'static, Infallible> {
        self.self_exits.fetch_add(1, Ordering::SeqCst);
        self.inner.exit_current(handle)
    }
}

/// Polls `cond` until it holds; panics after five seconds.
pub(crate) async fn wait_until(cond: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !cond() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within 5s"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
