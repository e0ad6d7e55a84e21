//! # Post-failure remediation.
//!
//! [`RemediationPolicy`] attaches follow-up actions ("View logs", "Retry", ...) to operations
//! that finished with `Severity::Error`, plus an optional "Dismiss" action that stops the
//! snapshot's broadcast. The actions are added with a same-status commit, so the terminal
//! state is preserved.

use async_trait::async_trait;

use crate::core::OperationContext;
use crate::error::PolicyError;
use crate::model::{OperationAction, Severity};
use crate::policies::policy::{OperationPolicy, PolicyKind};

/// Adds remediation actions to failed operations.
///
/// ## Example
/// ```rust
/// use opshub::{OperationAction, RemediationPolicy};
///
/// let policy = RemediationPolicy::new()
///     .with_action(OperationAction::new("View logs", || async { /* open logs */ }).primary())
///     .with_dismiss("Dismiss");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RemediationPolicy {
    actions: Vec<OperationAction>,
    dismiss_text: Option<String>,
}

impl RemediationPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action to attach on failure.
    pub fn with_action(mut self, action: OperationAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Also attaches an action labelled `text` that stops the snapshot's broadcast.
    pub fn with_dismiss(mut self, text: impl Into<String>) -> Self {
        self.dismiss_text = Some(text.into());
        self
    }
}

#[async_trait]
impl OperationPolicy for RemediationPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Completion
    }

    fn name(&self) -> &'static str {
        "remediation"
    }

    fn can_apply(&self, ctx: &OperationContext) -> bool {
        let props = ctx.properties();
        props.status.is_terminal() && props.severity == Severity::Error
    }

    async fn apply(&self, ctx: &OperationContext) -> Result<(), PolicyError> {
        let mut actions = self.actions.clone();
        if let Some(text) = &self.dismiss_text {
            let handle = ctx.broadcast_handle();
            actions.push(OperationAction::new(text.clone(), move || {
                let handle = handle.clone();
                async move {
                    handle.stop();
                }
            }));
        }

        ctx.commit_snapshot(|p| {
            actions
                .iter()
                .cloned()
                .fold(p, |p, action| p.with_action(action))
        })
        .map(|_| ())
        .map_err(|e| PolicyError::failed(self.name(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecutionOptions, OperationHub};
    use crate::policies::AutoCompletePolicy;

    fn policy() -> RemediationPolicy {
        RemediationPolicy::new()
            .with_action(OperationAction::new("Retry", || async {}).primary())
            .with_dismiss("Dismiss")
    }

    #[tokio::test]
    async fn test_failed_operation_gets_actions() {
        let hub = OperationHub::default();
        let opts = ExecutionOptions::new()
            .with_policy(AutoCompletePolicy)
            .with_policy(policy());

        let _ = hub
            .execute(opts, |_ctx| async { Err::<(), _>("timeout") })
            .await;

        let list = hub.current_snapshots();
        let actions = &list[0].properties().actions;
        let labels: Vec<&str> = actions.iter().map(|a| a.text()).collect();
        assert_eq!(labels, vec!["Retry", "Dismiss"]);
        assert!(actions[0].is_primary());
        assert!(list[0].is_terminal());

        actions[1].invoke().await;
        assert!(hub.current_snapshots().is_empty());
    }

    #[tokio::test]
    async fn test_success_is_left_alone() {
        let hub = OperationHub::default();
        let opts = ExecutionOptions::new()
            .with_policy(AutoCompletePolicy)
            .with_policy(policy());

        hub.execute(opts, |_ctx| async { Ok::<_, String>(()) })
            .await
            .unwrap();

        assert!(hub.current_snapshots()[0].properties().actions.is_empty());
    }
}
