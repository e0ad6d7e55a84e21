//! Lifecycle policies.
//!
//! This module groups the pluggable behavior that runs around a unit of work:
//! **when** it runs ([`PolicyKind`]) and **what** it does ([`OperationPolicy`]).
//!
//! ## Contents
//! - [`OperationPolicy`], [`PolicyKind`], [`PolicyRef`] the plugin contract
//! - [`AutoCompletePolicy`] commits a terminal state when the work did not
//! - [`RetentionPolicy`] stops broadcasting finished snapshots after a delay
//! - [`CancelActionPolicy`] attaches a "Cancel" action at start
//! - [`RemediationPolicy`] attaches follow-up actions to failed operations
//!
//! ## Quick wiring
//! ```text
//! ExecutionOptions { policies: [AutoComplete, Remediation, Retention] }
//!      └─► Start phase:      policies with kind() == Start, in order
//!      └─► Completion phase: policies with kind() == Completion, in order
//! ```
//!
//! Order matters: put [`AutoCompletePolicy`] first so later completion policies see a
//! terminal snapshot.

mod auto_complete;
mod cancel_action;
mod policy;
mod remediation;
mod retention;

pub use auto_complete::AutoCompletePolicy;
pub use cancel_action::CancelActionPolicy;
pub use policy::{OperationPolicy, PolicyKind, PolicyRef};
pub use remediation::RemediationPolicy;
pub use retention::RetentionPolicy;
