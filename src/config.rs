//! # Hub configuration.
//!
//! Provides [`Config`] centralized settings for the operation hub.
//!
//! Config is used in two ways:
//! 1. **Hub creation**: `OperationHub::new(config)`
//! 2. **Policy defaults**: `RetentionPolicy::from_config(&config)`, `CancelActionPolicy::from_config(&config)`
//!
//! ## Sentinel values
//! - `notification_duration = 0s` → notifications carry no display duration

use std::time::Duration;

/// Global configuration for the operation hub.
///
/// ## Field semantics
/// - `notification_duration`: Default display duration attached to notifications (`0s` = none)
/// - `retention`: Default delay before a finished snapshot stops being broadcast
/// - `cancel_action_text`: Label of the built-in cancel affordance
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Display duration used when a notification is published without an explicit one.
    ///
    /// - `Duration::ZERO` = no duration (the consumer decides)
    /// - `> 0` = attached to every notification that does not set its own
    pub notification_duration: Duration,

    /// Default retention delay for finished snapshots.
    ///
    /// Used by `RetentionPolicy::from_config()`. `Duration::ZERO` removes the snapshot
    /// from broadcast as soon as the policy runs.
    pub retention: Duration,

    /// Label of the cancel action attached by `CancelActionPolicy::from_config`.
    pub cancel_action_text: String,
}

impl Config {
    /// Returns the default notification duration as an `Option`.
    ///
    /// - `None` → no duration
    /// - `Some(d)` → attached to notifications
    #[inline]
    pub fn default_notification_duration(&self) -> Option<Duration> {
        if self.notification_duration == Duration::ZERO {
            None
        } else {
            Some(self.notification_duration)
        }
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `notification_duration = 5s`
    /// - `retention = 5s`
    /// - `cancel_action_text = "Cancel"`
    fn default() -> Self {
        Self {
            notification_duration: Duration::from_secs(5),
            retention: Duration::from_secs(5),
            cancel_action_text: "Cancel".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_notification_duration_is_none() {
        let cfg = Config {
            notification_duration: Duration::ZERO,
            ..Config::default()
        };
        assert_eq!(cfg.default_notification_duration(), None);
        assert_eq!(
            Config::default().default_notification_duration(),
            Some(Duration::from_secs(5))
        );
    }
}
