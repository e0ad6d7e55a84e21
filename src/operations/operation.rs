//! # Operation abstraction.
//!
//! An [`Operation`] is a unit of work defined as an object instead of a closure, so it can be
//! built once, tested on its own, and run many times through
//! [`OperationHub::run_operation`](crate::OperationHub::run_operation).
//!
//! The operation receives its [`ContextRef`] and reports through it; it should check
//! cancellation at safe points and exit promptly.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::core::ContextRef;

/// Shared handle to an operation.
pub type OperationRef<T, E> = Arc<dyn Operation<Output = T, Error = E>>;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use opshub::{ContextRef, Operation};
///
/// struct Download { files: u8 }
///
/// #[async_trait]
/// impl Operation for Download {
///     type Output = u8;
///     type Error = std::io::Error;
///
///     fn name(&self) -> &str { "download" }
///
///     async fn run(&self, ctx: ContextRef) -> Result<u8, std::io::Error> {
///         let _ = ctx.start(None);
///         for i in 0..self.files {
///             if ctx.is_cancellation_requested() {
///                 let _ = ctx.cancel(None);
///                 return Ok(i);
///             }
///             let percent = (u16::from(i) + 1) * 100 / u16::from(self.files);
///             let _ = ctx.report_progress(u8::try_from(percent).ok(), None);
///         }
///         let _ = ctx.succeed(None);
///         Ok(self.files)
///     }
/// }
/// ```
#[async_trait]
pub trait Operation: Send + Sync + 'static {
    type Output: Send;
    type Error: fmt::Display + Send;

    /// Stable, human-readable name; used as the default title.
    fn name(&self) -> &str;

    /// Runs the operation to completion or cancellation.
    async fn run(&self, ctx: ContextRef) -> Result<Self::Output, Self::Error>;
}
