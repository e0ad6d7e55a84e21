//! # Operation repository.
//!
//! Authoritative in-memory store of:
//! - the **active set**: contexts currently between register and unregister;
//! - the **broadcast set**: the latest snapshot per operation still being shown.
//!
//! The two sets are independent: a finished operation may stay in the broadcast set after its
//! context is gone, and an active context may never appear in it (notification-only work).
//!
//! ## Locking
//! ```text
//! active (Mutex) ──► snapshots (Mutex)
//! ```
//! Both are always taken in this order. Every mutation hands the resulting [`View`] to a
//! `sink` while both locks are still held, so views leave the repository in mutation order.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::model::{GlobalActivity, OperationSnapshot, OperationStatus};

/// Handle to an active operation.
pub(crate) struct ActiveEntry {
    /// Cancellation token of the operation's context.
    pub(crate) cancel: CancellationToken,
    pub(crate) registered_at: DateTime<Utc>,
    /// Snapshot was removed from broadcast while the operation was still active.
    pub(crate) dismissed: bool,
}

/// Consistent read of both sets after a mutation.
pub(crate) struct View {
    pub(crate) snapshots: Vec<OperationSnapshot>,
    pub(crate) activity: GlobalActivity,
}

pub(crate) struct OperationRepository {
    active: Mutex<HashMap<Uuid, ActiveEntry>>,
    /// Ordered by first insertion.
    snapshots: Mutex<Vec<OperationSnapshot>>,
}

impl OperationRepository {
    pub(crate) fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            snapshots: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn insert_active(&self, id: Uuid, entry: ActiveEntry, sink: impl FnOnce(View)) {
        self.locked(|active, snapshots| {
            active.insert(id, entry);
            sink(view(active, snapshots));
        })
    }

    pub(crate) fn remove_active(&self, id: Uuid, sink: impl FnOnce(View)) -> Option<ActiveEntry> {
        self.locked(|active, snapshots| {
            let removed = active.remove(&id);
            if removed.is_some() {
                sink(view(active, snapshots));
            }
            removed
        })
    }

    /// Inserts or replaces the snapshot with the same id.
    ///
    /// With `only_if_present`, a snapshot that is not currently broadcast is left out
    /// (used for commits after the context was unregistered). Snapshots of active operations
    /// that were dismissed are never re-added either.
    pub(crate) fn upsert_snapshot(
        &self,
        snapshot: OperationSnapshot,
        only_if_present: bool,
        sink: impl FnOnce(View),
    ) -> bool {
        self.locked(|active, snapshots| {
            let only_if_present =
                only_if_present || active.get(&snapshot.id()).is_some_and(|e| e.dismissed);
            match snapshots.iter_mut().find(|s| s.id() == snapshot.id()) {
                Some(slot) => {
                    if slot.updated_at() > snapshot.updated_at() {
                        return false;
                    }
                    *slot = snapshot;
                }
                None if only_if_present => return false,
                None => snapshots.push(snapshot),
            }
            sink(view(active, snapshots));
            true
        })
    }

    pub(crate) fn remove_snapshot(&self, id: Uuid, sink: impl FnOnce(View)) -> bool {
        self.locked(|active, snapshots| {
            let before = snapshots.len();
            snapshots.retain(|s| s.id() != id);
            if snapshots.len() == before {
                return false;
            }
            if let Some(entry) = active.get_mut(&id) {
                entry.dismissed = true;
            }
            sink(view(active, snapshots));
            true
        })
    }

    pub(crate) fn view(&self) -> View {
        self.locked(|active, snapshots| view(active, snapshots))
    }

    /// Sorted ids of active operations.
    pub(crate) fn active_ids(&self) -> Vec<Uuid> {
        let active = self.lock_active();
        let mut entries: Vec<(&Uuid, &ActiveEntry)> = active.iter().collect();
        entries.sort_by_key(|(id, e)| (e.registered_at, **id));
        entries.into_iter().map(|(id, _)| *id).collect()
    }

    pub(crate) fn cancel_token(&self, id: Uuid) -> Option<CancellationToken> {
        self.lock_active().get(&id).map(|e| e.cancel.clone())
    }

    pub(crate) fn all_cancel_tokens(&self) -> Vec<CancellationToken> {
        self.lock_active()
            .values()
            .map(|e| e.cancel.clone())
            .collect()
    }

    fn lock_active(&self) -> MutexGuard<'_, HashMap<Uuid, ActiveEntry>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn locked<R>(
        &self,
        f: impl FnOnce(&mut HashMap<Uuid, ActiveEntry>, &mut Vec<OperationSnapshot>) -> R,
    ) -> R {
        let mut active = self.lock_active();
        let mut snapshots = self.snapshots.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut *active, &mut *snapshots)
    }
}

/// Running operations are broadcast snapshots in `Running` whose context is still active.
fn view(active: &HashMap<Uuid, ActiveEntry>, snapshots: &[OperationSnapshot]) -> View {
    let running = snapshots
        .iter()
        .filter(|s| s.status() == OperationStatus::Running && active.contains_key(&s.id()));
    View {
        activity: GlobalActivity::from_running(running),
        snapshots: snapshots.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OperationProperties;

    fn entry() -> ActiveEntry {
        ActiveEntry {
            cancel: CancellationToken::new(),
            registered_at: Utc::now(),
            dismissed: false,
        }
    }

    fn running(id: Uuid, percent: u8) -> OperationSnapshot {
        OperationSnapshot::initial(
            id,
            OperationProperties::new()
                .with_status(OperationStatus::Running)
                .with_percent(Some(percent)),
        )
    }

    #[test]
    fn test_activity_counts_only_active_running() {
        let repo = OperationRepository::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        repo.insert_active(a, entry(), |_| {});
        repo.upsert_snapshot(running(a, 42), false, |_| {});
        repo.upsert_snapshot(running(b, 10), false, |_| {});

        let v = repo.view();
        assert_eq!(v.snapshots.len(), 2);
        assert_eq!(
            v.activity,
            GlobalActivity {
                percent: Some(42),
                in_progress_count: 1
            }
        );

        let mut seen = None;
        repo.remove_active(a, |v| seen = Some(v.activity));
        assert_eq!(seen, Some(GlobalActivity::IDLE));
    }

    #[test]
    fn test_upsert_keeps_insertion_order_and_replaces() {
        let repo = OperationRepository::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let first_a = running(a, 1);
        repo.upsert_snapshot(first_a.clone(), false, |_| {});
        repo.upsert_snapshot(running(b, 1), false, |_| {});
        repo.upsert_snapshot(
            first_a.next(first_a.properties().clone().with_percent(Some(50))),
            false,
            |_| {},
        );

        let v = repo.view();
        assert_eq!(v.snapshots[0].id(), a);
        assert_eq!(v.snapshots[0].properties().percent, Some(50));
        assert_eq!(v.snapshots[1].id(), b);
    }

    #[test]
    fn test_only_if_present_does_not_resurrect() {
        let repo = OperationRepository::new();
        let id = Uuid::new_v4();
        let mut published = false;
        assert!(!repo.upsert_snapshot(running(id, 1), true, |_| published = true));
        assert!(!published);
        assert!(repo.view().snapshots.is_empty());
    }

    #[test]
    fn test_dismissed_active_snapshot_stays_out() {
        let repo = OperationRepository::new();
        let id = Uuid::new_v4();
        let first = running(id, 10);
        repo.insert_active(id, entry(), |_| {});
        repo.upsert_snapshot(first.clone(), false, |_| {});
        assert!(repo.remove_snapshot(id, |_| {}));

        let later = first.next(first.properties().clone().with_percent(Some(20)));
        assert!(!repo.upsert_snapshot(later, false, |_| {}));
        assert!(repo.view().snapshots.is_empty());
    }

    #[test]
    fn test_remove_missing_is_silent() {
        let repo = OperationRepository::new();
        let mut published = false;
        assert!(!repo.remove_snapshot(Uuid::new_v4(), |_| published = true));
        assert!(repo.remove_active(Uuid::new_v4(), |_| published = true).is_none());
        assert!(!published);
    }
}
