//! # Subscription tokens.
//!
//! A [`Subscription`] is returned by every `subscribe` call. Dropping it (or calling
//! [`Subscription::unsubscribe`]) removes the handler from its stream; [`Subscription::detach`]
//! leaves the handler registered for the lifetime of the stream.
//!
//! The token only holds a weak reference to the stream, so a handler may own its own token
//! (to unsubscribe itself) without creating a cycle.

use std::fmt;
use std::sync::Weak;

/// Type-erased removal hook implemented by every stream.
pub(crate) trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

/// RAII handle for a registered handler.
#[must_use = "dropping a Subscription immediately unsubscribes the handler"]
pub struct Subscription {
    stream: &'static str,
    id: u64,
    source: Option<Weak<dyn Detach>>,
}

impl Subscription {
    pub(crate) fn new(stream: &'static str, id: u64, source: Weak<dyn Detach>) -> Self {
        Self {
            stream,
            id,
            source: Some(source),
        }
    }

    /// Removes the handler. Idempotent; safe to call from inside the handler itself.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keeps the handler registered until the stream is disposed.
    pub fn detach(mut self) {
        self.source = None;
    }

    /// Name of the stream this subscription belongs to.
    pub fn stream(&self) -> &'static str {
        self.stream
    }

    fn release(&mut self) {
        if let Some(stream) = self.source.take().and_then(|w| w.upgrade()) {
            stream.detach(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("stream", &self.stream)
            .field("id", &self.id)
            .field("attached", &self.source.is_some())
            .finish()
    }
}
