//! # Function-backed operation (`OperationFn`)
//!
//! [`OperationFn`] wraps a closure `F: Fn(ContextRef) -> Fut`, producing a fresh future per run.
//! No state is shared between runs unless the closure captures it explicitly (`Arc<...>`).
//!
//! ## Example
//! ```rust
//! use opshub::{ContextRef, Operation, OperationFn};
//!
//! let op = OperationFn::arc("cleanup", |ctx: ContextRef| async move {
//!     ctx.succeed(Some("nothing to do".into()))?;
//!     Ok::<_, opshub::HubError>(())
//! });
//!
//! assert_eq!(op.name(), "cleanup");
//! ```

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::ContextRef;
use crate::operations::operation::Operation;

/// Function-backed operation.
pub struct OperationFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> OperationFn<F> {
    /// Creates a new function-backed operation.
    ///
    /// Prefer [`OperationFn::arc`] when you immediately need a shared handle.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self { name: name.into(), f }
    }

    /// Creates the operation and returns it behind an `Arc`.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

#[async_trait]
impl<F, Fut, T, E> Operation for OperationFn<F>
where
    F: Fn(ContextRef) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: fmt::Display + Send + 'static,
{
    type Output = T;
    type Error = E;

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: ContextRef) -> Result<T, E> {
        (self.f)(ctx).await
    }
}

impl<F> fmt::Debug for OperationFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationFn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
