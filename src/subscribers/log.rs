//! # LogWriter: render hub streams as tracing events
//!
//! A small observer for all three hub streams. Use it for demos, tests, or as a baseline audit
//! trail next to a real UI.
//!
//! Because the snapshots stream republishes the **full** list on every change, the writer keeps
//! the last `updated_at` it logged per operation and only logs snapshots that changed, plus
//! operations that left the broadcast set.
//!
//! ## Example output
//! ```text
//! INFO opshub: [snapshot] op=… status=running severity=Info percent=Some(40) message=Some("copying")
//! INFO opshub: [dismissed] op=…
//! INFO opshub: [notification] op=… severity=Warning message=Some("disk almost full")
//! INFO opshub: [activity] in_progress=2 percent=None
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::core::{OperationHub, SnapshotList};
use crate::error::HubError;
use crate::events::{Subscribe, Subscription};
use crate::model::{GlobalActivity, OperationNotification};

/// Hub stream writer.
#[derive(Default)]
pub struct LogWriter {
    seen: Mutex<HashMap<Uuid, DateTime<Utc>>>,
}

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes a new writer to all three streams of `hub`.
    ///
    /// Dropping the returned subscriptions detaches the writer.
    pub fn attach(hub: &OperationHub) -> Result<Vec<Subscription>, HubError> {
        let writer = Arc::new(Self::new());
        Ok(vec![
            hub.snapshots()
                .subscribe_observer(Arc::clone(&writer) as Arc<dyn Subscribe<SnapshotList>>)?,
            hub.notifications()
                .subscribe_observer(Arc::clone(&writer) as Arc<dyn Subscribe<OperationNotification>>)?,
            hub.global_activity()
                .subscribe_observer(writer as Arc<dyn Subscribe<GlobalActivity>>)?,
        ])
    }
}

impl Subscribe<SnapshotList> for LogWriter {
    fn on_event(&self, list: &SnapshotList) {
        let mut seen = self.seen.lock().unwrap_or_else(PoisonError::into_inner);

        for snap in list {
            let fresh = seen
                .get(&snap.id())
                .map_or(true, |at| *at < snap.updated_at());
            if !fresh {
                continue;
            }
            seen.insert(snap.id(), snap.updated_at());
            let p = snap.properties();
            info!(
                "[snapshot] op={} status={} severity={:?} percent={:?} message={:?}",
                snap.id(),
                p.status.as_label(),
                p.severity,
                p.percent,
                p.message
            );
        }

        let gone: Vec<Uuid> = seen
            .keys()
            .filter(|id| !list.iter().any(|s| s.id() == **id))
            .copied()
            .collect();
        for id in gone {
            seen.remove(&id);
            info!("[dismissed] op={}", id);
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

impl Subscribe<OperationNotification> for LogWriter {
    fn on_event(&self, n: &OperationNotification) {
        info!(
            "[notification] op={} severity={:?} message={:?}",
            n.operation_id, n.properties.severity, n.properties.message
        );
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

impl Subscribe<GlobalActivity> for LogWriter {
    fn on_event(&self, a: &GlobalActivity) {
        info!(
            "[activity] in_progress={} percent={:?}",
            a.in_progress_count, a.percent
        );
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, ExecutionOptions};

    #[tokio::test]
    async fn test_tracks_and_forgets_operations() {
        let hub = OperationHub::new(Config::default());
        let writer = Arc::new(LogWriter::new());
        let _sub = hub
            .snapshots()
            .subscribe_observer(Arc::clone(&writer) as Arc<dyn Subscribe<SnapshotList>>)
            .unwrap();

        let scope = hub.begin_operation(ExecutionOptions::new()).await;
        let id = scope.context().id();
        scope.context().start(None).unwrap();
        assert!(writer.seen.lock().unwrap().contains_key(&id));

        scope.context().succeed(None).unwrap();
        scope.complete().await;
        assert!(hub.stop_snapshot_broadcast(id));
        assert!(writer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_attach_subscribes_all_streams() {
        let hub = OperationHub::new(Config::default());
        let subs = LogWriter::attach(&hub).unwrap();
        assert_eq!(subs.len(), 3);
        assert_eq!(hub.snapshots().subscriber_count(), 1);
        assert_eq!(hub.notifications().subscriber_count(), 1);
        assert_eq!(hub.global_activity().subscriber_count(), 1);
        drop(subs);
        assert_eq!(hub.snapshots().subscriber_count(), 0);
    }
}
