//! # Function-backed service (`ServiceFn`)
//!
//! [`ServiceFn`] wraps a closure `F: Fn() -> Fut`, producing the future for
//! the task's single run. An optional cleanup closure covers the forced
//! termination hook.
//!
//! ## Example
//! ```rust
//! use taskparent::{ServiceFn, ServiceRef, TaskError};
//!
//! let s: ServiceRef = ServiceFn::arc("worker", || async move {
//!     // do work...
//!     Ok::<_, TaskError>(())
//! });
//!
//! assert_eq!(s.name(), "worker");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TaskError;
use crate::services::Service;

type CleanupFn = Box<dyn Fn() + Send + Sync>;

/// Function-backed service implementation.
pub struct ServiceFn<F> {
    name: Cow<'static, str>,
    f: F,
    cleanup: Option<CleanupFn>,
}

impl<F> ServiceFn<F> {
    /// Creates a new function-backed service with a no-op cleanup.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
            cleanup: None,
        }
    }

    /// Creates the service and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }

    /// Sets the hook run by forced termination.
    ///
    /// ```rust
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicBool, Ordering};
    /// use taskparent::{Service, ServiceFn, TaskError};
    ///
    /// let flushed = Arc::new(AtomicBool::new(false));
    /// let f = flushed.clone();
    /// let s = ServiceFn::new("poller", || async { Ok::<_, TaskError>(()) })
    ///     .with_cleanup(move || f.store(true, Ordering::SeqCst));
    ///
    /// s.cleanup();
    /// assert!(flushed.load(Ordering::SeqCst));
    /// ```
    pub fn with_cleanup(mut self, cleanup: impl Fn() + Send + Sync + 'static) -> Self {
        self.cleanup = Some(Box::new(cleanup));
        self
    }
}

#[async_trait]
impl<F, Fut> Service for ServiceFn<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn service(&self) -> Result<(), TaskError> {
        (self.f)().await
    }

    fn cleanup(&self) {
        if let Some(cleanup) = &self.cleanup {
            cleanup();
        }
    }
}

impl<F> std::fmt::Debug for ServiceFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceFn")
            .field("name", &self.name)
            .field("cleanup", &self.cleanup.is_some())
            .finish()
    }
}
