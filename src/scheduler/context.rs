//! # Execution context handles.
//!
//! A scheduler runs every entry future behind a [`GatedEntry`]: the entry
//! sits in a shared slot and each poll happens with the slot locked. The
//! matching [`ContextHandle`] can therefore [`withdraw`](ContextHandle::withdraw)
//! the entry from another thread. That waits for a poll already in progress
//! to return, then drops the entry, so nothing of it runs afterwards. A poll
//! that starts after the withdrawal began returns at once.
//!
//! ```text
//! runtime poll ─► GatedEntry::poll ─► lock slot ─► entry.poll ─► unlock
//! withdraw()   ─────────────────────► lock slot ─► take entry ─► unlock ─► drop entry
//! ```
//!
//! Tokio's abort alone only lands at the entry's next `.await`.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{Instrument, Span};

use super::EntryFuture;

/// Entry shared between the running context and its handle.
struct Slot {
    /// Set before `withdraw` takes the lock; a poll that sees it does nothing.
    withdrawn: AtomicBool,
    /// Set once the entry is gone for good: completed, withdrawn or dropped.
    emptied: AtomicBool,
    entry: Mutex<Option<EntryFuture>>,
}

impl Slot {
    fn lock(&self) -> MutexGuard<'_, Option<EntryFuture>> {
        self.entry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the entry, drops it outside the lock and records that.
    fn empty(&self, mut guard: MutexGuard<'_, Option<EntryFuture>>) {
        let entry = guard.take();
        drop(guard);
        drop(entry);
        self.emptied.store(true, Ordering::Release);
    }
}

/// Entry future wrapper whose inner future can be withdrawn between polls.
pub struct GatedEntry {
    slot: Arc<Slot>,
}

impl GatedEntry {
    /// Wraps `entry`.
    pub fn new(entry: EntryFuture) -> Self {
        Self {
            slot: Arc::new(Slot {
                withdrawn: AtomicBool::new(false),
                emptied: AtomicBool::new(false),
                entry: Mutex::new(Some(entry)),
            }),
        }
    }

    /// Spawns the entry on `runtime` inside `span` and returns its handle.
    pub fn spawn_on(self, runtime: &Handle, span: Span) -> ContextHandle {
        let slot = Arc::clone(&self.slot);
        let join = runtime.spawn(self.instrument(span));
        ContextHandle {
            abort: join.abort_handle(),
            slot,
        }
    }
}

impl Future for GatedEntry {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        let mut slot = self.slot.lock();
        if self.slot.withdrawn.load(Ordering::Acquire) {
            return Poll::Ready(());
        }
        let Some(entry) = slot.as_mut() else {
            return Poll::Ready(());
        };
        if entry.as_mut().poll(cx).is_pending() {
            return Poll::Pending;
        }
        self.slot.empty(slot);
        Poll::Ready(())
    }
}

impl Drop for GatedEntry {
    fn drop(&mut self) {
        self.slot.empty(self.slot.lock());
    }
}

/// Identity of one execution context.
pub struct ContextHandle {
    abort: AbortHandle,
    slot: Arc<Slot>,
}

impl ContextHandle {
    /// Scheduler-level id of the context.
    pub fn id(&self) -> tokio::task::Id {
        self.abort.id()
    }

    /// True when called from inside this very context.
    pub fn is_current(&self) -> bool {
        tokio::task::try_id() == Some(self.abort.id())
    }

    /// True once the entry has completed, been withdrawn or been dropped.
    pub fn is_finished(&self) -> bool {
        self.slot.emptied.load(Ordering::Acquire) || self.abort.is_finished()
    }

    /// Requests deletion. Takes effect at the context's next suspension point.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Drops the entry future, first waiting for a poll in progress to return.
    ///
    /// Blocks the calling thread for at most one poll. From the context itself
    /// this only aborts, since the caller is that poll.
    pub fn withdraw(&self) {
        if self.is_current() {
            self.abort();
            return;
        }
        self.slot.withdrawn.store(true, Ordering::Release);
        self.slot.empty(self.slot.lock());
    }
}

impl fmt::Debug for ContextHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContextHandle")
            .field("id", &self.id())
            .field("finished", &self.is_finished())
            .finish()
    }
}
