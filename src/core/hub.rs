//! # OperationHub: the façade producers and consumers talk to.
//!
//! The hub owns the manager (repository, outbox, streams) and exposes:
//! - three long-lived broadcast streams: [`snapshots`](OperationHub::snapshots),
//!   [`notifications`](OperationHub::notifications), [`global_activity`](OperationHub::global_activity);
//! - three execution entry points: [`execute`](OperationHub::execute),
//!   [`run_operation`](OperationHub::run_operation), [`begin_operation`](OperationHub::begin_operation);
//! - [`stop_snapshot_broadcast`](OperationHub::stop_snapshot_broadcast) to dismiss a finished snapshot.
//!
//! ## High-level architecture
//! ```text
//! Producers                                   Consumers
//!   execute(opts, |ctx| ...) ─┐                 ┌─► snapshots().subscribe(..)
//!   run_operation(&op, opts) ─┼─► Executor      ├─► notifications().subscribe(..)
//!   begin_operation(opts)   ──┘     └─► Scope    └─► global_activity().subscribe(..)
//!                                      └─► Context ──► Manager ──► Repository
//!                                                        └─► Outbox ──► EventStreams
//! ```
//!
//! The hub is a cheap-to-clone handle. Create one in the host's composition root and pass it
//! to whoever needs it; it is never a process-wide global.
//!
//! ## Example
//! ```rust
//! use opshub::{AutoCompletePolicy, Config, ExecutionOptions, OperationHub};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = OperationHub::new(Config::default());
//!
//!     let sub = hub.global_activity().subscribe(|a| {
//!         println!("busy={} percent={:?}", a.in_progress_count, a.percent);
//!     })?;
//!
//!     let answer = hub
//!         .execute(
//!             ExecutionOptions::new()
//!                 .with_title("compute")
//!                 .with_policy(AutoCompletePolicy),
//!             |ctx| async move {
//!                 ctx.report_progress(Some(50), Some("halfway".into()))?;
//!                 Ok::<_, opshub::HubError>(42)
//!             },
//!         )
//!         .await?;
//!
//!     assert_eq!(answer, 42);
//!     sub.unsubscribe();
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::Config;
use crate::core::context::ContextRef;
use crate::core::manager::{OperationManager, SnapshotList};
use crate::core::options::ExecutionOptions;
use crate::core::scope::{OperationExecutor, OperationScope};
use crate::events::EventStream;
use crate::model::{GlobalActivity, OperationNotification};
use crate::operations::Operation;

/// Entry point for running operations and observing them.
#[derive(Clone)]
pub struct OperationHub {
    manager: Arc<OperationManager>,
    executor: OperationExecutor,
}

impl OperationHub {
    pub fn new(config: Config) -> Self {
        let manager = Arc::new(OperationManager::new(config));
        let executor = OperationExecutor::new(Arc::clone(&manager));
        Self { manager, executor }
    }

    pub fn config(&self) -> &Config {
        &self.manager.config
    }

    // ---------------------------
    // Streams
    // ---------------------------

    /// Full ordered list of broadcast snapshots, republished on every change.
    pub fn snapshots(&self) -> &EventStream<SnapshotList> {
        &self.manager.streams.snapshots
    }

    /// One-shot transient messages.
    pub fn notifications(&self) -> &EventStream<OperationNotification> {
        &self.manager.streams.notifications
    }

    /// Rolled-up progress indicator.
    pub fn global_activity(&self) -> &EventStream<GlobalActivity> {
        &self.manager.streams.activity
    }

    // ---------------------------
    // Execution
    // ---------------------------

    /// Runs `f` inside a scope and returns its result unchanged.
    ///
    /// Start policies run before `f`, completion policies and unregistration after it, on
    /// every exit path (including errors and panics; panics are resumed after cleanup).
    pub async fn execute<F, Fut, T, E>(&self, options: ExecutionOptions, f: F) -> Result<T, E>
    where
        F: FnOnce(ContextRef) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.executor.execute(options, f).await
    }

    /// Runs a reusable [`Operation`]. Its name becomes the title unless `options` sets one.
    pub async fn run_operation<O>(
        &self,
        op: &O,
        options: ExecutionOptions,
    ) -> Result<O::Output, O::Error>
    where
        O: Operation + ?Sized,
    {
        self.executor.run(op, options).await
    }

    /// Opens a scope for manual control. End it with `complete`, `fail` or `end`.
    pub async fn begin_operation(&self, options: ExecutionOptions) -> OperationScope {
        self.executor.begin(options).await
    }

    // ---------------------------
    // Control
    // ---------------------------

    /// Removes a snapshot from broadcast ahead of any retention policy.
    ///
    /// Returns `false` if it was not being broadcast.
    pub fn stop_snapshot_broadcast(&self, id: Uuid) -> bool {
        self.manager.remove_snapshot(id)
    }

    /// Signals cancellation to an active operation. Returns `false` if it is not active.
    pub fn request_cancellation(&self, id: Uuid) -> bool {
        self.manager.request_cancellation(id)
    }

    /// Cancels every active operation and disposes the three streams.
    ///
    /// Running work keeps going until it observes cancellation; its publications are dropped.
    pub fn shutdown(&self) {
        self.manager.shutdown();
    }

    // ---------------------------
    // Reads
    // ---------------------------

    /// The list the snapshots stream would publish right now.
    pub fn current_snapshots(&self) -> SnapshotList {
        self.manager.current_snapshots()
    }

    pub fn current_activity(&self) -> GlobalActivity {
        self.manager.current_activity()
    }

    /// Ids of registered operations, oldest first.
    pub fn active_operations(&self) -> Vec<Uuid> {
        self.manager.active_ids()
    }
}

impl Default for OperationHub {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl fmt::Debug for OperationHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationHub")
            .field("config", &self.manager.config)
            .field("active", &self.manager.active_ids().len())
            .finish_non_exhaustive()
    }
}
