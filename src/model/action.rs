//! # User-invokable operation actions.
//!
//! An [`OperationAction`] is an affordance ("Cancel", "View logs", "Dismiss") attached to
//! a snapshot. Subscribers render it and call [`OperationAction::invoke`] when the user
//! picks it. The callback builds a fresh future on every invocation.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use uuid::Uuid;

/// Shared async callback behind an action.
pub type ActionCallback = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// An action a subscriber may invoke on an operation.
///
/// Cheap to clone; clones share the callback.
#[derive(Clone)]
pub struct OperationAction {
    id: Uuid,
    text: String,
    is_primary: bool,
    callback: ActionCallback,
}

impl OperationAction {
    /// Creates a new action with a fresh id.
    ///
    /// ## Example
    /// ```rust
    /// use opshub::OperationAction;
    ///
    /// let action = OperationAction::new("View logs", || async {
    ///     // open the log viewer...
    /// });
    /// assert_eq!(action.text(), "View logs");
    /// assert!(!action.is_primary());
    /// ```
    pub fn new<F, Fut>(text: impl Into<String>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            is_primary: false,
            callback: Arc::new(move || Box::pin(f())),
        }
    }

    /// Marks the action as the primary (default) one.
    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_primary(&self) -> bool {
        self.is_primary
    }

    /// Runs the action's callback.
    pub fn invoke(&self) -> BoxFuture<'static, ()> {
        (self.callback)()
    }
}

impl PartialEq for OperationAction {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.text == other.text && self.is_primary == other.is_primary
    }
}

impl fmt::Debug for OperationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationAction")
            .field("id", &self.id)
            .field("text", &self.text)
            .field("is_primary", &self.is_primary)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_invoke_runs_callback_each_time() {
        let hits = Arc::new(AtomicU32::new(0));
        let h = Arc::clone(&hits);
        let action = OperationAction::new("Retry", move || {
            let h = Arc::clone(&h);
            async move {
                h.fetch_add(1, Ordering::SeqCst);
            }
        })
        .primary();

        action.invoke().await;
        action.clone().invoke().await;

        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert!(action.is_primary());
    }

    #[test]
    fn test_equality_is_by_identity() {
        let a = OperationAction::new("Dismiss", || async {});
        let b = OperationAction::new("Dismiss", || async {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }
}
