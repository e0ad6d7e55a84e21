//! Error types used by the hub and its policies.
//!
//! This module defines two error enums:
//!
//! - [`HubError`]: errors raised by the hub itself (disposed streams, illegal status transitions).
//! - [`PolicyError`]: errors raised while applying an [`OperationPolicy`](crate::OperationPolicy).
//!
//! Errors returned by a caller's unit of work are **not** wrapped: `execute` hands them
//! back unchanged.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging.

use thiserror::Error;
use uuid::Uuid;

use crate::model::OperationStatus;

/// # Errors produced by the hub.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HubError {
    /// A subscription was attempted on a stream that has already been disposed.
    #[error("event stream '{stream}' is disposed")]
    Disposed {
        /// Name of the disposed stream.
        stream: &'static str,
    },

    /// A snapshot commit tried to move an operation out of a terminal state
    /// (or back to `NotStarted`).
    #[error("operation {id}: illegal status transition {from:?} -> {to:?}")]
    InvalidTransition {
        /// Operation id.
        id: Uuid,
        /// Status of the current snapshot.
        from: OperationStatus,
        /// Status the mutation produced.
        to: OperationStatus,
    },
}

impl HubError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use opshub::HubError;
    ///
    /// let err = HubError::Disposed { stream: "snapshots" };
    /// assert_eq!(err.as_label(), "hub_stream_disposed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            HubError::Disposed { .. } => "hub_stream_disposed",
            HubError::InvalidTransition { .. } => "hub_invalid_transition",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            HubError::Disposed { stream } => format!("stream disposed: {stream}"),
            HubError::InvalidTransition { id, from, to } => {
                format!("operation {id} cannot move from {from:?} to {to:?}")
            }
        }
    }
}

/// # Errors produced while applying an operation policy.
///
/// A failing policy aborts the remaining policies of the same phase, but never
/// prevents the context from being unregistered.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyError {
    /// Policy reported a failure.
    #[error("policy '{policy}' failed: {reason}")]
    Failed {
        /// Policy name.
        policy: &'static str,
        /// Failure description.
        reason: String,
    },

    /// Policy panicked while being applied.
    #[error("policy '{policy}' panicked: {info}")]
    Panicked {
        /// Policy name.
        policy: &'static str,
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl PolicyError {
    /// Convenience constructor for [`PolicyError::Failed`].
    pub fn failed(policy: &'static str, reason: impl Into<String>) -> Self {
        PolicyError::Failed {
            policy,
            reason: reason.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use opshub::PolicyError;
    ///
    /// let err = PolicyError::failed("retention", "boom");
    /// assert_eq!(err.as_label(), "policy_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            PolicyError::Failed { .. } => "policy_failed",
            PolicyError::Panicked { .. } => "policy_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            PolicyError::Failed { policy, reason } => format!("{policy}: {reason}"),
            PolicyError::Panicked { policy, info } => format!("{policy} panicked: {info}"),
        }
    }

    /// Name of the policy that produced this error.
    pub fn policy(&self) -> &'static str {
        match self {
            PolicyError::Failed { policy, .. } | PolicyError::Panicked { policy, .. } => policy,
        }
    }
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let id = Uuid::new_v4();
        let err = HubError::InvalidTransition {
            id,
            from: OperationStatus::Completed,
            to: OperationStatus::Running,
        };
        assert_eq!(err.as_label(), "hub_invalid_transition");
        assert!(err.as_message().contains(&id.to_string()));

        let panicked = PolicyError::Panicked {
            policy: "auto_complete",
            info: "oops".into(),
        };
        assert_eq!(panicked.as_label(), "policy_panicked");
        assert_eq!(panicked.policy(), "auto_complete");
    }

    #[test]
    fn test_panic_message_downcasts() {
        let boxed: Box<dyn std::any::Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn std::any::Any + Send> = Box::new(7u32);
        assert_eq!(panic_message(boxed.as_ref()), "non-string panic payload");
    }
}
