//! # Operation context.
//!
//! The live handle through which one operation reports its own state. It owns the current
//! [`OperationSnapshot`], a [`CancellationToken`], and a back-reference to the manager used only
//! to publish. Observers never see a context; they see the snapshots it commits.
//!
//! ## Commit flow
//! ```text
//! commit_snapshot(mutate)
//!   ├─► read current properties (context lock, released)
//!   ├─► mutate(properties)                          (no lock held)
//!   ├─► context lock
//!   │     ├─ concurrent commit happened? → retry with fresh properties
//!   │     ├─ validate status transition  → Err(InvalidTransition)
//!   │     ├─ store next snapshot (updated_at never goes back)
//!   │     └─ manager.stage_snapshot()    → repository + outbox ticket
//!   └─► manager.deliver(ticket)                     (no lock held; subscribers have seen
//!                                                    this snapshot when commit returns)
//! ```
//!
//! ## Rules
//! - `commit_snapshot` is the **only** way properties change.
//! - Terminal snapshots are never followed by non-terminal ones.
//! - Cancellation is advisory: [`OperationContext::request_cancellation`] flips the token and
//!   nothing else. The unit of work decides when to commit `Canceled`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::core::manager::OperationManager;
use crate::error::HubError;
use crate::model::{
    OperationAction, OperationNotification, OperationProperties, OperationSnapshot,
    OperationStatus, Severity,
};

/// Shared handle to a context, as handed to units of work.
pub type ContextRef = Arc<OperationContext>;

/// How a unit of work ended, as seen by completion policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Returned normally.
    Succeeded,
    /// Returned an error (or panicked); carries the rendered error.
    Failed(String),
    /// Exited after cancellation was requested.
    Canceled,
    /// Scope was dropped without being ended.
    Abandoned,
}

struct Current {
    snapshot: OperationSnapshot,
    version: u64,
}

/// Per-operation mutable handle.
pub struct OperationContext {
    id: Uuid,
    current: Mutex<Current>,
    cancel: CancellationToken,
    outcome: Mutex<Option<Outcome>>,
    closed: AtomicBool,
    manager: Arc<OperationManager>,
}

impl OperationContext {
    pub(crate) fn new(
        manager: Arc<OperationManager>,
        properties: OperationProperties,
        cancel: CancellationToken,
    ) -> Self {
        let id = Uuid::new_v4();
        Self {
            id,
            current: Mutex::new(Current {
                snapshot: OperationSnapshot::initial(id, properties),
                version: 0,
            }),
            cancel,
            outcome: Mutex::new(None),
            closed: AtomicBool::new(false),
            manager,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> OperationSnapshot {
        self.lock_current().snapshot.clone()
    }

    /// Copy of the current properties.
    pub fn properties(&self) -> OperationProperties {
        self.lock_current().snapshot.properties().clone()
    }

    pub fn status(&self) -> OperationStatus {
        self.lock_current().snapshot.status()
    }

    /// Applies `mutate` to the current properties and publishes the result.
    ///
    /// `mutate` runs without any lock held and may run more than once if another thread
    /// commits on the same context concurrently, so it should be a pure function of its input.
    ///
    /// # Errors
    /// [`HubError::InvalidTransition`] if the new status is not reachable from the current one;
    /// the stored snapshot is left unchanged.
    ///
    /// # Example
    /// ```rust
    /// # async fn demo(hub: opshub::OperationHub) -> Result<(), opshub::HubError> {
    /// use opshub::{ExecutionOptions, OperationStatus};
    ///
    /// let scope = hub.begin_operation(ExecutionOptions::new().with_title("Sync")).await;
    /// let snap = scope.context().commit_snapshot(|p| {
    ///     p.with_status(OperationStatus::Running).with_percent(Some(10))
    /// })?;
    /// assert_eq!(snap.properties().percent, Some(10));
    /// scope.complete().await;
    /// # Ok(())
    /// # }
    /// ```
    pub fn commit_snapshot<F>(&self, mut mutate: F) -> Result<OperationSnapshot, HubError>
    where
        F: FnMut(OperationProperties) -> OperationProperties,
    {
        let (committed, ticket) = loop {
            let (base, version) = {
                let cur = self.lock_current();
                (cur.snapshot.properties().clone(), cur.version)
            };
            let next = mutate(base);

            let mut cur = self.lock_current();
            if cur.version != version {
                continue;
            }
            let from = cur.snapshot.status();
            if !from.can_transition_to(next.status) {
                return Err(HubError::InvalidTransition {
                    id: self.id,
                    from,
                    to: next.status,
                });
            }
            let snapshot = cur.snapshot.next(next);
            cur.snapshot = snapshot.clone();
            cur.version += 1;
            // Staged while the context lock is held: repository order == commit order.
            let ticket = self
                .manager
                .stage_snapshot(snapshot.clone(), self.closed.load(Ordering::Acquire));
            break (snapshot, ticket);
        };
        self.manager.deliver(ticket);
        Ok(committed)
    }

    /// Publishes a one-off notification built from the current properties.
    ///
    /// `duration = None` falls back to [`Config::notification_duration`](crate::Config).
    pub fn publish_notification(&self, duration: Option<Duration>) {
        self.publish_notification_with(|p| p, duration)
    }

    /// Publishes a one-off notification built from `mutate(current properties)`.
    /// The stored snapshot is not touched.
    pub fn publish_notification_with<F>(&self, mutate: F, duration: Option<Duration>)
    where
        F: FnOnce(OperationProperties) -> OperationProperties,
    {
        let properties = mutate(self.properties());
        let duration = duration.or_else(|| self.manager.config.default_notification_duration());
        self.manager
            .publish_notification(OperationNotification::new(self.id, properties, duration));
    }

    // ---------------------------
    // Cancellation
    // ---------------------------

    /// Signals cancellation. Does not change the status.
    pub fn request_cancellation(&self) {
        if !self.cancel.is_cancelled() {
            debug!(op = %self.id, "cancellation requested");
        }
        self.cancel.cancel();
    }

    pub fn is_cancellation_requested(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The context's token; await `cancelled()` on it or derive child tokens.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Attaches an action that requests cancellation when invoked. Returns the action id.
    pub fn add_cancel_action(&self, text: impl Into<String>) -> Result<Uuid, HubError> {
        let token = self.cancel.clone();
        let action = OperationAction::new(text, move || {
            let token = token.clone();
            async move { token.cancel() }
        });
        let id = action.id();
        self.commit_snapshot(|p| p.with_action(action.clone()))?;
        Ok(id)
    }

    // ---------------------------
    // Derived transitions
    // ---------------------------

    /// `Running`, `Info`; percent left as is.
    pub fn start(&self, message: Option<String>) -> Result<OperationSnapshot, HubError> {
        self.commit_snapshot(|p| {
            p.with_status(OperationStatus::Running)
                .with_severity(Severity::Info)
                .with_message(message.clone())
        })
    }

    /// `Running` with `percent` (clamped to 100).
    pub fn report_progress(
        &self,
        percent: Option<u8>,
        message: Option<String>,
    ) -> Result<OperationSnapshot, HubError> {
        self.commit_snapshot(|p| {
            let p = p.with_status(OperationStatus::Running).with_percent(percent);
            match &message {
                Some(_) => p.with_message(message.clone()),
                None => p,
            }
        })
    }

    /// `Completed`, `Success`, 100%, no actions.
    pub fn succeed(&self, message: Option<String>) -> Result<OperationSnapshot, HubError> {
        self.finish(OperationStatus::Completed, Severity::Success, Some(100), message)
    }

    /// `Completed`, `Error`, 100%, no actions.
    pub fn fail(&self, message: Option<String>) -> Result<OperationSnapshot, HubError> {
        self.finish(OperationStatus::Completed, Severity::Error, Some(100), message)
    }

    /// `Canceled`, `Warning`, no percent, no actions.
    pub fn cancel(&self, message: Option<String>) -> Result<OperationSnapshot, HubError> {
        self.finish(OperationStatus::Canceled, Severity::Warning, None, message)
    }

    fn finish(
        &self,
        status: OperationStatus,
        severity: Severity,
        percent: Option<u8>,
        message: Option<String>,
    ) -> Result<OperationSnapshot, HubError> {
        self.commit_snapshot(|p| {
            let p = p
                .with_status(status)
                .with_severity(severity)
                .with_percent(percent)
                .with_actions(Vec::new());
            match &message {
                Some(_) => p.with_message(message.clone()),
                None => p,
            }
        })
    }

    // ---------------------------
    // Lifecycle
    // ---------------------------

    /// Handle that can stop this operation's broadcast, even after the context is gone.
    pub fn broadcast_handle(&self) -> BroadcastHandle {
        BroadcastHandle {
            id: self.id,
            manager: Arc::downgrade(&self.manager),
        }
    }

    /// How the unit of work ended; `None` while it is still running.
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn set_outcome(&self, outcome: Outcome) {
        *self.outcome.lock().unwrap_or_else(PoisonError::into_inner) = Some(outcome);
    }

    /// Marks the context as unregistered: later commits update the broadcast set only if the
    /// snapshot is still there.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn lock_current(&self) -> MutexGuard<'_, Current> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for OperationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationContext")
            .field("id", &self.id)
            .field("status", &self.status())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

/// Detached handle for removing an operation's snapshot from broadcast.
///
/// Holds only a weak reference to the hub, so pending timers never keep it alive.
#[derive(Clone, Debug)]
pub struct BroadcastHandle {
    id: Uuid,
    manager: Weak<OperationManager>,
}

impl BroadcastHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Removes the snapshot now. Returns `false` if it was not broadcast (or the hub is gone).
    pub fn stop(&self) -> bool {
        self.manager
            .upgrade()
            .map(|m| m.remove_snapshot(self.id))
            .unwrap_or(false)
    }

    /// Removes the snapshot after `delay`.
    ///
    /// A zero delay removes it immediately. Otherwise a timer is spawned on the current tokio
    /// runtime; without one the request is dropped with a warning.
    pub fn stop_after(&self, delay: Duration) {
        if delay.is_zero() {
            self.stop();
            return;
        }
        let handle = self.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                rt.spawn(async move {
                    tokio::time::sleep(delay).await;
                    handle.stop();
                });
            }
            Err(_) => {
                warn!(op = %self.id, ?delay, "no tokio runtime; delayed broadcast stop dropped");
            }
        }
    }
}
