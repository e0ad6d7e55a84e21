//! # Stream observer trait.
//!
//! Provides [`Subscribe`], the extension point for plugging named observers into an
//! [`EventStream`](crate::EventStream). Plain closures are accepted too
//! (see [`EventStream::subscribe`](crate::EventStream::subscribe)); implement the trait when
//! the observer carries state or deserves a name in logs.
//!
//! ## Rules
//! - Called synchronously on the publishing thread, outside every hub lock.
//! - Panics are caught per observer; the rest of the delivery continues.
//! - Keep handlers short: hand heavy work to a channel or task.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use opshub::{GlobalActivity, Subscribe};
//!
//! struct BusyCounter(AtomicUsize);
//!
//! impl Subscribe<GlobalActivity> for BusyCounter {
//!     fn on_event(&self, activity: &GlobalActivity) {
//!         self.0.store(activity.in_progress_count, Ordering::Relaxed);
//!     }
//!
//!     fn name(&self) -> &'static str { "busy-counter" }
//! }
//! ```

/// Observer of values published on an [`EventStream`](crate::EventStream).
pub trait Subscribe<T>: Send + Sync + 'static {
    /// Handles one published value.
    fn on_event(&self, value: &T);

    /// Returns the observer name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Closure-backed observer.
pub(crate) struct FnSubscriber<F> {
    f: F,
}

impl<F> FnSubscriber<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

impl<T, F> Subscribe<T> for FnSubscriber<F>
where
    F: Fn(&T) + Send + Sync + 'static,
{
    fn on_event(&self, value: &T) {
        (self.f)(value)
    }

    fn name(&self) -> &'static str {
        "closure"
    }
}
