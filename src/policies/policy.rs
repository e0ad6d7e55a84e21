//! # Operation policy trait.
//!
//! A policy is cross-cutting lifecycle behavior attached to a single execution through
//! [`ExecutionOptions`](crate::ExecutionOptions). There is no global registry.
//!
//! ## Phases
//! ```text
//! begin_operation
//!   ├─► register context
//!   ├─► Start policies       (list order, sequential)
//!   ├─► ... unit of work ...
//!   ├─► Completion policies  (list order, sequential)
//!   └─► unregister context   (always, even if a policy failed)
//! ```
//!
//! ## Rules
//! - A policy runs only if [`OperationPolicy::can_apply`] returns `true` at that moment.
//! - Each `apply` fully completes before the next policy starts.
//! - The first failure (error or panic) aborts the rest of **that phase**.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::OperationContext;
use crate::error::PolicyError;

/// Phase a policy belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolicyKind {
    /// Runs right after the context is registered.
    Start,
    /// Runs right before the context is unregistered.
    Completion,
}

/// Shared policy handle.
pub type PolicyRef = Arc<dyn OperationPolicy>;

/// Pluggable lifecycle behavior.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use opshub::{OperationContext, OperationPolicy, PolicyError, PolicyKind};
///
/// /// Tags every operation with a title when it starts.
/// struct Titled(&'static str);
///
/// #[async_trait]
/// impl OperationPolicy for Titled {
///     fn kind(&self) -> PolicyKind { PolicyKind::Start }
///     fn name(&self) -> &'static str { "titled" }
///
///     fn can_apply(&self, ctx: &OperationContext) -> bool {
///         ctx.properties().title.is_none()
///     }
///
///     async fn apply(&self, ctx: &OperationContext) -> Result<(), PolicyError> {
///         ctx.commit_snapshot(|p| p.with_title(self.0))
///             .map(|_| ())
///             .map_err(|e| PolicyError::failed(self.name(), e.to_string()))
///     }
/// }
/// ```
#[async_trait]
pub trait OperationPolicy: Send + Sync + 'static {
    /// Phase this policy runs in.
    fn kind(&self) -> PolicyKind;

    /// Name used in logs and [`PolicyError`].
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns whether the policy should run for `ctx` right now.
    fn can_apply(&self, ctx: &OperationContext) -> bool;

    /// Applies the policy.
    async fn apply(&self, ctx: &OperationContext) -> Result<(), PolicyError>;
}
