//! # Auto-completion.
//!
//! [`AutoCompletePolicy`] closes out operations whose work returned without committing a
//! terminal snapshot. The terminal state follows the recorded [`Outcome`]:
//!
//! ```text
//! Succeeded / Abandoned / none → succeed()
//! Failed(reason)               → fail(reason)
//! Canceled                     → cancel()
//! ```

use async_trait::async_trait;

use crate::core::{OperationContext, Outcome};
use crate::error::PolicyError;
use crate::policies::policy::{OperationPolicy, PolicyKind};

/// Marks the operation finished if the work did not.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoCompletePolicy;

#[async_trait]
impl OperationPolicy for AutoCompletePolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Completion
    }

    fn name(&self) -> &'static str {
        "auto_complete"
    }

    fn can_apply(&self, ctx: &OperationContext) -> bool {
        !ctx.status().is_terminal()
    }

    async fn apply(&self, ctx: &OperationContext) -> Result<(), PolicyError> {
        let committed = match ctx.outcome() {
            Some(Outcome::Failed(reason)) => ctx.fail(Some(reason)),
            Some(Outcome::Canceled) => ctx.cancel(None),
            Some(Outcome::Succeeded) | Some(Outcome::Abandoned) | None => ctx.succeed(None),
        };
        committed
            .map(|_| ())
            .map_err(|e| PolicyError::failed(self.name(), e.to_string()))
    }
}
