//! # Point-in-time views of an operation.
//!
//! - [`OperationSnapshot`] is the persistent, broadcast view: one per operation id, replaced
//!   on every commit.
//! - [`OperationNotification`] is a transient message: published once, never stored.
//!
//! ## Timestamps
//! `created_at` is fixed for the life of an operation. `updated_at` is stamped on every
//! commit and never goes backwards for a given id, even if the wall clock does.

use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::model::properties::{OperationProperties, OperationStatus};

/// Immutable, timestamped view of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationSnapshot {
    id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    properties: OperationProperties,
}

impl OperationSnapshot {
    /// First snapshot of a new operation.
    pub(crate) fn initial(id: Uuid, properties: OperationProperties) -> Self {
        let now = Utc::now();
        Self {
            id,
            created_at: now,
            updated_at: now,
            properties,
        }
    }

    /// Next snapshot in the chain: same id/created_at, new properties, `updated_at`
    /// clamped so it never precedes the previous one.
    pub(crate) fn next(&self, properties: OperationProperties) -> Self {
        let now = Utc::now().max(self.updated_at);
        Self {
            id: self.id,
            created_at: self.created_at,
            updated_at: now,
            properties,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn properties(&self) -> &OperationProperties {
        &self.properties
    }

    /// Shorthand for `properties().status`.
    #[inline]
    pub fn status(&self) -> OperationStatus {
        self.properties.status
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.properties.status.is_terminal()
    }
}

/// Fire-and-forget message tied to an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationNotification {
    /// Operation that raised the notification.
    pub operation_id: Uuid,
    pub properties: OperationProperties,
    /// How long a consumer should display it (`None` = consumer's choice).
    pub duration: Option<Duration>,
    pub created_at: DateTime<Utc>,
}

impl OperationNotification {
    pub(crate) fn new(
        operation_id: Uuid,
        properties: OperationProperties,
        duration: Option<Duration>,
    ) -> Self {
        Self {
            operation_id,
            properties,
            duration,
            created_at: Utc::now(),
        }
    }
}
