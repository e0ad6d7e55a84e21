//! # Timed retention.
//!
//! [`RetentionPolicy`] keeps a finished snapshot on screen for a while, then stops
//! broadcasting it. Only terminal snapshots whose severity is in the configured set qualify
//! (by default: `Success`), so failures stay visible until the user dismisses them.
//!
//! ## Timing
//! - `delay = 0` → removed immediately, before the context is unregistered.
//! - `delay > 0` → a timer on the current tokio runtime removes it later. The timer holds only a
//!   weak reference to the hub.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::Config;
use crate::core::OperationContext;
use crate::error::PolicyError;
use crate::model::Severity;
use crate::policies::policy::{OperationPolicy, PolicyKind};

/// Removes finished snapshots from broadcast after a delay.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    delay: Duration,
    severities: Vec<Severity>,
}

impl RetentionPolicy {
    /// Retains `Success` snapshots for `delay`.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            severities: vec![Severity::Success],
        }
    }

    /// Uses [`Config::retention`] as the delay.
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.retention)
    }

    /// Replaces the set of severities this policy applies to.
    pub fn with_severities(mut self, severities: impl IntoIterator<Item = Severity>) -> Self {
        self.severities = severities.into_iter().collect();
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl OperationPolicy for RetentionPolicy {
    fn kind(&self) -> PolicyKind {
        PolicyKind::Completion
    }

    fn name(&self) -> &'static str {
        "retention"
    }

    fn can_apply(&self, ctx: &OperationContext) -> bool {
        let props = ctx.properties();
        props.status.is_terminal() && self.severities.contains(&props.severity)
    }

    async fn apply(&self, ctx: &OperationContext) -> Result<(), PolicyError> {
        debug!(op = %ctx.id(), delay = ?self.delay, "retention scheduled");
        ctx.broadcast_handle().stop_after(self.delay);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ExecutionOptions, OperationHub};
    use crate::policies::AutoCompletePolicy;

    #[test]
    fn test_from_config_uses_retention() {
        let cfg = Config {
            retention: Duration::from_secs(9),
            ..Config::default()
        };
        assert_eq!(RetentionPolicy::from_config(&cfg).delay(), Duration::from_secs(9));
    }

    #[tokio::test]
    async fn test_custom_severities() {
        let hub = OperationHub::default();
        let opts = ExecutionOptions::new()
            .with_policy(AutoCompletePolicy)
            .with_policy(
                RetentionPolicy::new(Duration::ZERO).with_severities([Severity::Error]),
            );

        let _ = hub
            .execute(opts.clone(), |_ctx| async { Err::<(), _>("x") })
            .await;
        assert!(hub.current_snapshots().is_empty());

        hub.execute(opts, |_ctx| async { Ok::<_, String>(()) })
            .await
            .unwrap();
        assert_eq!(hub.current_snapshots().len(), 1);
    }
}
