//! Snapshot model: the immutable values that flow out of the hub.
//!
//! ## Contents
//! - [`OperationProperties`], [`OperationStatus`], [`Severity`] user-facing state
//! - [`OperationAction`] invokable affordances attached to a snapshot
//! - [`OperationSnapshot`], [`OperationNotification`] persistent vs transient views
//! - [`GlobalActivity`] rolled-up indicator over running operations

mod action;
mod activity;
mod properties;
mod snapshot;

pub use action::{ActionCallback, OperationAction};
pub use activity::GlobalActivity;
pub use properties::{OperationProperties, OperationStatus, Severity};
pub use snapshot::{OperationNotification, OperationSnapshot};
