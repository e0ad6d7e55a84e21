//! # Operation properties and status.
//!
//! [`OperationProperties`] is a plain value: every change produces a new value through the
//! `with_*` builders (or struct update syntax). Nothing mutates a published value in place.
//!
//! ## Status machine
//! ```text
//! NotStarted ──► Running ──► Completed
//!     │             └──────► Canceled
//!     ├──────────────────────► Completed
//!     └──────────────────────► Canceled
//! ```
//! `Completed` and `Canceled` are terminal. Re-committing the same status is always allowed.

use crate::model::action::OperationAction;

/// Lifecycle status of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OperationStatus {
    /// Created, no progress reported yet.
    #[default]
    NotStarted,
    /// Work in progress.
    Running,
    /// Finished (successfully or not; see [`Severity`]).
    Completed,
    /// Stopped after a cancellation request.
    Canceled,
}

impl OperationStatus {
    /// True for `Completed` and `Canceled`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, OperationStatus::Completed | OperationStatus::Canceled)
    }

    /// Returns whether a snapshot with status `self` may be followed by one with `next`.
    ///
    /// # Example
    /// ```
    /// use opshub::OperationStatus;
    ///
    /// assert!(OperationStatus::NotStarted.can_transition_to(OperationStatus::Completed));
    /// assert!(OperationStatus::Completed.can_transition_to(OperationStatus::Completed));
    /// assert!(!OperationStatus::Completed.can_transition_to(OperationStatus::Running));
    /// ```
    pub fn can_transition_to(self, next: OperationStatus) -> bool {
        use OperationStatus::*;
        if self == next {
            return true;
        }
        match self {
            NotStarted => true,
            Running => matches!(next, Completed | Canceled),
            Completed | Canceled => false,
        }
    }

    /// Short lowercase label for logs.
    pub fn as_label(self) -> &'static str {
        match self {
            OperationStatus::NotStarted => "not_started",
            OperationStatus::Running => "running",
            OperationStatus::Completed => "completed",
            OperationStatus::Canceled => "canceled",
        }
    }
}

/// Severity of the operation's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// User-facing state of one operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationProperties {
    /// Short title, e.g. "Applying configuration".
    pub title: Option<String>,
    /// Current status line.
    pub message: Option<String>,
    /// `None` = indeterminate; otherwise `0..=100`.
    pub percent: Option<u8>,
    pub status: OperationStatus,
    pub severity: Severity,
    /// Affordances a subscriber may invoke, in display order.
    pub actions: Vec<OperationAction>,
}

impl OperationProperties {
    /// Creates empty properties (`NotStarted`, `Info`, no actions).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with the given title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Returns a copy with the given message (`None` clears it).
    pub fn with_message(mut self, message: Option<String>) -> Self {
        self.message = message;
        self
    }

    /// Returns a copy with the given percent, clamped to `0..=100`.
    pub fn with_percent(mut self, percent: Option<u8>) -> Self {
        self.percent = percent.map(|p| p.min(100));
        self
    }

    /// Returns a copy with the given status.
    pub fn with_status(mut self, status: OperationStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns a copy with the given severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Returns a copy with the action list replaced.
    pub fn with_actions(mut self, actions: Vec<OperationAction>) -> Self {
        self.actions = actions;
        self
    }

    /// Returns a copy with `action` appended.
    pub fn with_action(mut self, action: OperationAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Returns a copy without the action identified by `id`.
    pub fn without_action(mut self, id: uuid::Uuid) -> Self {
        self.actions.retain(|a| a.id() != id);
        self
    }

    /// Percent, but only while the status is `Running`.
    #[inline]
    pub fn effective_percent(&self) -> Option<u8> {
        match self.status {
            OperationStatus::Running => self.percent,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states_never_leave() {
        use OperationStatus::*;
        for from in [Completed, Canceled] {
            assert!(from.is_terminal());
            for to in [NotStarted, Running] {
                assert!(!from.can_transition_to(to), "{from:?} -> {to:?}");
            }
        }
        assert!(!Completed.can_transition_to(Canceled));
        assert!(!Running.can_transition_to(NotStarted));
        assert!(Running.can_transition_to(Running));
        assert!(NotStarted.can_transition_to(Canceled));
    }

    #[test]
    fn test_without_action_removes_only_that_action() {
        let retry = OperationAction::new("Retry", || async {});
        let logs = OperationAction::new("View logs", || async {});
        let p = OperationProperties::new()
            .with_action(retry.clone())
            .with_action(logs.clone())
            .without_action(retry.id());

        let ids: Vec<_> = p.actions.iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec![logs.id()]);
        assert_eq!(p.without_action(retry.id()).actions.len(), 1);
    }

    #[test]
    fn test_with_percent_clamps() {
        let p = OperationProperties::new().with_percent(Some(250));
        assert_eq!(p.percent, Some(100));
        let p = p.with_percent(None);
        assert_eq!(p.percent, None);
    }

    #[test]
    fn test_builders_leave_original_untouched() {
        let base = OperationProperties::new().with_title("sync");
        let next = base.clone().with_status(OperationStatus::Running);
        assert_eq!(base.status, OperationStatus::NotStarted);
        assert_eq!(next.status, OperationStatus::Running);
        assert_eq!(next.title.as_deref(), Some("sync"));
    }

    #[test]
    fn test_effective_percent_only_while_running() {
        let p = OperationProperties::new()
            .with_percent(Some(40))
            .with_status(OperationStatus::Running);
        assert_eq!(p.effective_percent(), Some(40));
        let done = p.with_status(OperationStatus::Completed);
        assert_eq!(done.effective_percent(), None);
    }
}
