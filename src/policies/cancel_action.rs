//! # Cancel affordance.
//!
//! [`CancelActionPolicy`] is a start policy that attaches a "Cancel" action to the operation.
//! Invoking the action only requests cancellation; the unit of work still decides how to exit.
//! The action disappears with the other actions when the operation reaches a terminal state
//! through `succeed`, `fail` or `cancel`.

use async_trait::async_trait;

use crate::config::Config;
use crate::core::OperationContext;
use crate::error::PolicyError;
use crate::policies::policy::{OperationPolicy, PolicyKind};

/// Adds a cancel action when the operation starts.
#[derive(Debug, Clone)]
pub struct CancelActionPolicy {
    text: String,
}

impl CancelActionPolicy {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Uses [`Config::cancel_action_text`] as the label.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.cancel_action_text.clone())
    }
}

impl Default for CancelActionPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[async_trait]
impl OperationPolicy for CancelActionPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Start
    }

    fn name(&self) -> &'static str {
        "cancel_action"
    }

    fn can_apply(&self, ctx: &OperationContext) -> bool {
        !ctx.is_cancellation_requested() && !ctx.status().is_terminal()
    }

    async fn apply(&self, ctx: &OperationContext) -> Result<(), PolicyError> {
        ctx.add_cancel_action(self.text.clone())
            .map(|_| ())
            .map_err(|e| PolicyError::failed(self.name(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecutionOptions, OperationHub};

    #[tokio::test]
    async fn test_label_from_config() {
        let hub = OperationHub::new(Config {
            cancel_action_text: "Abort".into(),
            ..Config::default()
        });
        let opts = ExecutionOptions::new().with_policy(CancelActionPolicy::from_config(hub.config()));

        let scope = hub.begin_operation(opts).await;
        let actions = scope.context().properties().actions;
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].text(), "Abort");
        scope.complete().await;
    }

    #[tokio::test]
    async fn test_skipped_when_already_cancelled() {
        let hub = OperationHub::default();
        let token = tokio_util::sync::CancellationToken::new();
        token.cancel();
        let opts = ExecutionOptions::new()
            .with_cancellation(token)
            .with_policy(CancelActionPolicy::default());

        let scope = hub.begin_operation(opts).await;
        assert!(scope.context().properties().actions.is_empty());
        scope.complete().await;
    }
}
