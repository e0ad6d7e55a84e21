//! # Operation manager.
//!
//! Single writer in front of the [`OperationRepository`]: registers and unregisters contexts,
//! maintains the broadcast set, applies policies, and republishes the aggregate views.
//!
//! ## Architecture
//! ```text
//! OperationContext ──► OperationManager ──► OperationRepository (locks held)
//!                            │                    └─► View ─► Outbox::enqueue → Ticket
//!                            └─► Outbox::deliver(Ticket) (no lock held, calling thread)
//!                                   ├─► snapshots stream
//!                                   ├─► global activity stream
//!                                   └─► notifications stream
//! ```
//!
//! ## Rules
//! - Snapshot changes publish the full snapshot list **and** the activity.
//! - Register/unregister publish the activity only.
//! - Policies run sequentially in list order; the first failure aborts the phase and is
//!   logged here. Callers still proceed to unregister.

use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::Utc;
use futures::FutureExt;
use tracing::{debug, error, trace};
use uuid::Uuid;

use crate::config::Config;
use crate::core::context::OperationContext;
use crate::core::outbox::{Outbox, Publication, Ticket};
use crate::core::repository::{ActiveEntry, OperationRepository, View};
use crate::error::{panic_message, PolicyError};
use crate::events::EventStream;
use crate::model::{GlobalActivity, OperationNotification, OperationSnapshot};
use crate::policies::{PolicyKind, PolicyRef};

/// Full ordered list of broadcast snapshots, as published on the snapshots stream.
pub type SnapshotList = Vec<OperationSnapshot>;

/// The three long-lived output streams.
pub(crate) struct HubStreams {
    pub(crate) snapshots: EventStream<SnapshotList>,
    pub(crate) notifications: EventStream<OperationNotification>,
    pub(crate) activity: EventStream<GlobalActivity>,
}

impl HubStreams {
    fn new() -> Self {
        Self {
            snapshots: EventStream::new("snapshots"),
            notifications: EventStream::new("notifications"),
            activity: EventStream::new("global_activity"),
        }
    }

    fn dispose(&self) {
        self.snapshots.dispose();
        self.notifications.dispose();
        self.activity.dispose();
    }
}

pub(crate) struct OperationManager {
    pub(crate) config: Config,
    pub(crate) streams: HubStreams,
    repo: OperationRepository,
    outbox: Outbox,
}

impl OperationManager {
    pub(crate) fn new(config: Config) -> Self {
        Self {
            config,
            streams: HubStreams::new(),
            repo: OperationRepository::new(),
            outbox: Outbox::default(),
        }
    }

    // ---------------------------
    // Active set
    // ---------------------------

    pub(crate) fn register(&self, ctx: &OperationContext) {
        let entry = ActiveEntry {
            cancel: ctx.cancellation_token(),
            registered_at: Utc::now(),
            dismissed: false,
        };
        let mut ticket = None;
        self.repo
            .insert_active(ctx.id(), entry, |v| ticket = Some(self.enqueue_activity(v)));
        debug!(op = %ctx.id(), "operation registered");
        self.deliver(ticket);
    }

    pub(crate) fn unregister(&self, id: Uuid) -> bool {
        let mut ticket = None;
        let removed = self
            .repo
            .remove_active(id, |v| ticket = Some(self.enqueue_activity(v)))
            .is_some();
        if removed {
            debug!(op = %id, "operation unregistered");
        }
        self.deliver(ticket);
        removed
    }

    // ---------------------------
    // Broadcast set
    // ---------------------------

    /// Stores `snapshot` without delivering; hand the ticket to [`Self::deliver`].
    ///
    /// Returns `None` when nothing was stored (dismissed, or closed and no longer broadcast).
    pub(crate) fn stage_snapshot(
        &self,
        snapshot: OperationSnapshot,
        only_if_present: bool,
    ) -> Option<Ticket> {
        let id = snapshot.id();
        let mut ticket = None;
        self.repo
            .upsert_snapshot(snapshot, only_if_present, |v| ticket = Some(self.enqueue_view(v)));
        trace!(op = %id, stored = ticket.is_some(), "snapshot staged");
        ticket
    }

    pub(crate) fn remove_snapshot(&self, id: Uuid) -> bool {
        let mut ticket = None;
        let removed = self
            .repo
            .remove_snapshot(id, |v| ticket = Some(self.enqueue_view(v)));
        if removed {
            debug!(op = %id, "snapshot broadcast stopped");
        }
        self.deliver(ticket);
        removed
    }

    pub(crate) fn publish_notification(&self, notification: OperationNotification) {
        let ticket = self
            .outbox
            .enqueue(vec![Publication::Notification(notification)]);
        self.deliver(Some(ticket));
    }

    /// Delivers the batch behind `ticket` on this thread, once earlier batches are out.
    pub(crate) fn deliver(&self, ticket: Option<Ticket>) {
        let Some(ticket) = ticket else {
            return;
        };
        self.outbox.deliver(ticket, |publication| match publication {
            Publication::Snapshots(list) => {
                self.streams.snapshots.publish(list);
            }
            Publication::Activity(activity) => {
                self.streams.activity.publish(activity);
            }
            Publication::Notification(n) => {
                self.streams.notifications.publish(n);
            }
        });
    }

    fn enqueue_view(&self, view: View) -> Ticket {
        self.outbox.enqueue(vec![
            Publication::Snapshots(view.snapshots),
            Publication::Activity(view.activity),
        ])
    }

    fn enqueue_activity(&self, view: View) -> Ticket {
        self.outbox.enqueue(vec![Publication::Activity(view.activity)])
    }

    // ---------------------------
    // Reads
    // ---------------------------

    pub(crate) fn current_snapshots(&self) -> SnapshotList {
        self.repo.view().snapshots
    }

    pub(crate) fn current_activity(&self) -> GlobalActivity {
        self.repo.view().activity
    }

    pub(crate) fn active_ids(&self) -> Vec<Uuid> {
        self.repo.active_ids()
    }

    pub(crate) fn request_cancellation(&self, id: Uuid) -> bool {
        match self.repo.cancel_token(id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every active operation and disposes the streams.
    pub(crate) fn shutdown(&self) {
        let tokens = self.repo.all_cancel_tokens();
        debug!(active = tokens.len(), "hub shutting down");
        for token in tokens {
            token.cancel();
        }
        self.streams.dispose();
    }

    // ---------------------------
    // Policies
    // ---------------------------

    /// Applies the policies of `kind` in list order.
    ///
    /// Returns the number of policies applied, or the first failure.
    pub(crate) async fn apply_policies(
        &self,
        kind: PolicyKind,
        ctx: &OperationContext,
        policies: &[PolicyRef],
    ) -> Result<usize, PolicyError> {
        let mut applied = 0;
        for policy in policies.iter().filter(|p| p.kind() == kind) {
            let name = policy.name();

            let can_apply = catch_unwind(AssertUnwindSafe(|| policy.can_apply(ctx)))
                .map_err(|p| PolicyError::Panicked {
                    policy: name,
                    info: panic_message(p.as_ref()),
                });
            match can_apply {
                Ok(true) => {}
                Ok(false) => {
                    trace!(op = %ctx.id(), policy = name, "policy skipped");
                    continue;
                }
                Err(e) => return Err(self.policy_failed(ctx, kind, e)),
            }

            let result = AssertUnwindSafe(policy.apply(ctx)).catch_unwind().await;
            match result {
                Ok(Ok(())) => {
                    applied += 1;
                    debug!(op = %ctx.id(), policy = name, ?kind, "policy applied");
                }
                Ok(Err(e)) => return Err(self.policy_failed(ctx, kind, e)),
                Err(payload) => {
                    let e = PolicyError::Panicked {
                        policy: name,
                        info: panic_message(payload.as_ref()),
                    };
                    return Err(self.policy_failed(ctx, kind, e));
                }
            }
        }
        Ok(applied)
    }

    fn policy_failed(&self, ctx: &OperationContext, kind: PolicyKind, e: PolicyError) -> PolicyError {
        error!(
            op = %ctx.id(),
            policy = e.policy(),
            ?kind,
            label = e.as_label(),
            error = %e,
            "policy failed; remaining policies of this phase skipped"
        );
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    use crate::core::{ExecutionOptions, OperationHub};
    use crate::model::OperationProperties;
    use crate::policies::OperationPolicy;

    enum Behavior {
        Ok,
        Fail,
        Panic,
    }

    struct Recorder {
        name: &'static str,
        kind: PolicyKind,
        behavior: Behavior,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl OperationPolicy for Recorder {
        fn kind(&self) -> PolicyKind {
            self.kind
        }

        fn name(&self) -> &'static str {
            self.name
        }

        fn can_apply(&self, _ctx: &OperationContext) -> bool {
            true
        }

        async fn apply(&self, _ctx: &OperationContext) -> Result<(), PolicyError> {
            self.log.lock().unwrap().push(self.name);
            match self.behavior {
                Behavior::Ok => Ok(()),
                Behavior::Fail => Err(PolicyError::failed(self.name, "refused")),
                Behavior::Panic => panic!("policy blew up"),
            }
        }
    }

    fn recorder(
        name: &'static str,
        kind: PolicyKind,
        behavior: Behavior,
        log: &Arc<Mutex<Vec<&'static str>>>,
    ) -> PolicyRef {
        Arc::new(Recorder {
            name,
            kind,
            behavior,
            log: Arc::clone(log),
        })
    }

    fn context(manager: &Arc<OperationManager>) -> OperationContext {
        OperationContext::new(
            Arc::clone(manager),
            OperationProperties::new(),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn test_policies_run_in_order_filtered_by_kind() {
        let manager = Arc::new(OperationManager::new(Config::default()));
        let ctx = context(&manager);
        let log = Arc::new(Mutex::new(Vec::new()));
        let policies = vec![
            recorder("a", PolicyKind::Completion, Behavior::Ok, &log),
            recorder("start", PolicyKind::Start, Behavior::Ok, &log),
            recorder("b", PolicyKind::Completion, Behavior::Ok, &log),
        ];

        let applied = manager
            .apply_policies(PolicyKind::Completion, &ctx, &policies)
            .await
            .unwrap();
        assert_eq!(applied, 2);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_first_failure_aborts_phase() {
        let manager = Arc::new(OperationManager::new(Config::default()));
        let ctx = context(&manager);
        let log = Arc::new(Mutex::new(Vec::new()));
        let policies = vec![
            recorder("a", PolicyKind::Completion, Behavior::Fail, &log),
            recorder("b", PolicyKind::Completion, Behavior::Ok, &log),
        ];

        let err = manager
            .apply_policies(PolicyKind::Completion, &ctx, &policies)
            .await
            .unwrap_err();
        assert_eq!(err.policy(), "a");
        assert_eq!(*log.lock().unwrap(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_panicking_policy_is_contained() {
        let manager = Arc::new(OperationManager::new(Config::default()));
        let ctx = context(&manager);
        let log = Arc::new(Mutex::new(Vec::new()));
        let policies = vec![
            recorder("boom", PolicyKind::Start, Behavior::Panic, &log),
            recorder("after", PolicyKind::Start, Behavior::Ok, &log),
        ];

        let err = manager
            .apply_policies(PolicyKind::Start, &ctx, &policies)
            .await
            .unwrap_err();
        assert!(matches!(err, PolicyError::Panicked { policy: "boom", .. }));
        assert_eq!(*log.lock().unwrap(), vec!["boom"]);
    }

    #[tokio::test]
    async fn test_failing_policies_never_block_unregister() {
        let hub = OperationHub::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        let opts = ExecutionOptions::new()
            .with_policy_ref(recorder("start", PolicyKind::Start, Behavior::Fail, &log))
            .with_policy_ref(recorder("done", PolicyKind::Completion, Behavior::Panic, &log));

        let out = hub
            .execute(opts, |_ctx| async { Ok::<_, PolicyError>(7) })
            .await
            .unwrap();

        assert_eq!(out, 7);
        assert_eq!(*log.lock().unwrap(), vec!["start", "done"]);
        assert!(hub.active_operations().is_empty());
    }

    #[test]
    fn test_register_and_unregister_publish_activity() {
        let manager = Arc::new(OperationManager::new(Config::default()));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = manager
            .streams
            .activity
            .subscribe(move |a: &GlobalActivity| sink.lock().unwrap().push(a.in_progress_count))
            .unwrap();

        let ctx = context(&manager);
        manager.register(&ctx);
        ctx.start(None).unwrap();
        assert!(manager.unregister(ctx.id()));
        assert!(!manager.unregister(ctx.id()));

        // register (0: not running yet), start (1), unregister (0).
        assert_eq!(*seen.lock().unwrap(), vec![0, 1, 0]);
    }
}
