//! # Registry: the guarded set of live children.
//!
//! One mutex per supervisor guards a deque of task references, newest first.
//!
//! ## Rules
//! - Every mutation happens with the guard held; no two mutations interleave.
//! - The guard is held only for the O(n) scan itself: never across an
//!   `.await`, never across a cleanup hook.
//! - `remove` reports whether it actually removed the entry; that result is
//!   the ownership claim for destroying the task.
//! - `drain_all` and `drain_split` empty the set in one critical section.
//! - A poisoned guard is recovered: every critical section leaves the deque
//!   consistent before anything that can panic.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::task::{TaskId, TaskRef};

/// Guarded children collection.
#[derive(Default)]
pub(crate) struct Registry {
    children: Mutex<VecDeque<TaskRef>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<TaskRef>> {
        self.children.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `task` as the most recent child. No duplicate detection.
    pub(crate) fn insert(&self, task: TaskRef) {
        self.lock().push_front(task);
    }

    /// Removes the child with `id`, if present.
    pub(crate) fn remove(&self, id: TaskId) -> Option<TaskRef> {
        let mut children = self.lock();
        let pos = children.iter().position(|t| t.id() == id)?;
        children.remove(pos)
    }

    /// Takes every child, newest first, and leaves the set empty.
    ///
    /// Returns `Err(id)` without touching the set when the caller is running
    /// inside child `id`'s own execution context.
    pub(crate) fn drain_all(&self) -> Result<Vec<TaskRef>, TaskId> {
        let mut children = self.lock();
        if let Some(own) = children.iter().find(|t| t.is_current()) {
            return Err(own.id());
        }
        Ok(children.drain(..).collect())
    }

    /// Takes every child, newest first, and leaves the set empty. The child
    /// whose context the caller runs in, if any, comes back apart.
    pub(crate) fn drain_split(&self) -> (Option<TaskRef>, Vec<TaskRef>) {
        let mut children = self.lock();
        let own = children
            .iter()
            .position(|t| t.is_current())
            .and_then(|pos| children.remove(pos));
        (own, children.drain(..).collect())
    }

    /// Child ids, newest first.
    pub(crate) fn ids(&self) -> Vec<TaskId> {
        self.lock().iter().map(|t| t.id()).collect()
    }

    pub(crate) fn contains(&self, id: TaskId) -> bool {
        self.lock().iter().any(|t| t.id() == id)
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }
}
