//! # opshub
//!
//! **opshub** is an in-process hub for running many long-lived async operations concurrently
//! while any number of observers (status panes, toasts, a global progress indicator) follow
//! their state through broadcast streams, without ever touching the running work.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   execute(opts, |ctx| ...)   run_operation(&op, opts)   begin_operation(opts)
//!            └──────────────────────────┼─────────────────────────┘
//!                                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  OperationHub (façade)                                            │
//! │  - OperationExecutor / OperationScope (begin/end guarantees)      │
//! │  - OperationManager  (policies, publication)                      │
//! │  - OperationRepository (active set + broadcast set)               │
//! │  - Outbox (ordered delivery, no lock held while delivering)       │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐
//!  │  Context A  │   │  Context B  │   │  Context C  │   one per in-flight operation
//!  │ commit(...) │   │ commit(...) │   │ notify(...) │
//!  └─────────────┘   └─────────────┘   └─────────────┘
//!        │ snapshots / notifications
//!        ▼
//! ┌──────────────────────┬────────────────────────┬────────────────────────┐
//! │ snapshots stream     │ notifications stream   │ global activity stream │
//! │ (full ordered list)  │ (one-shot messages)    │ (rolled-up progress)   │
//! └──────────┬───────────┴───────────┬────────────┴───────────┬────────────┘
//!            ▼                       ▼                        ▼
//!        status pane              toasts               progress indicator
//! ```
//!
//! ### Lifecycle
//! ```text
//! begin ──► create Context ──► register ──► Start policies
//!   │
//!   ├─► unit of work: ctx.start() / report_progress() / commit_snapshot() / publish_notification()
//!   │                  each commit ─► repository ─► outbox ─► snapshots + activity streams
//!   │
//! end (Ok / Err / panic / dropped scope)
//!   ├─► record Outcome
//!   ├─► Completion policies (sequential; first failure aborts the phase, logged)
//!   └─► unregister (always) ─► activity stream
//! ```
//!
//! ## Features
//! | Area              | Description                                                        | Key types / traits                                   |
//! |-------------------|--------------------------------------------------------------------|------------------------------------------------------|
//! | **Hub**           | Run operations and observe them.                                   | [`OperationHub`], [`ExecutionOptions`]               |
//! | **Reporting**     | Commit snapshots, publish notifications, expose actions.           | [`OperationContext`], [`OperationAction`]            |
//! | **Streams**       | Thread-safe broadcast with panic isolation.                        | [`EventStream`], [`Subscribe`], [`Subscription`]     |
//! | **Policies**      | Lifecycle plugins: auto-complete, retention, cancel, remediation.  | [`OperationPolicy`], [`PolicyKind`]                  |
//! | **Operations**    | Reusable units of work as objects or closures.                     | [`Operation`], [`OperationFn`]                       |
//! | **Errors**        | Typed errors for the hub and its policies.                         | [`HubError`], [`PolicyError`]                        |
//! | **Configuration** | Defaults for notifications, retention and labels.                  | [`Config`]                                           |
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use opshub::{
//!     AutoCompletePolicy, CancelActionPolicy, Config, ExecutionOptions, HubError, OperationHub,
//!     RetentionPolicy,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let hub = OperationHub::new(Config::default());
//!
//!     // A status pane: receives the full list on every change.
//!     let pane = hub.snapshots().subscribe(|list| {
//!         for s in list {
//!             println!("{} {:?} {:?}", s.id(), s.status(), s.properties().percent);
//!         }
//!     })?;
//!
//!     let opts = ExecutionOptions::new()
//!         .with_title("Apply configuration")
//!         .with_policy(CancelActionPolicy::default())
//!         .with_policy(AutoCompletePolicy)
//!         .with_policy(RetentionPolicy::new(Duration::ZERO));
//!
//!     hub.execute(opts, |ctx| async move {
//!         ctx.start(Some("resolving units".into()))?;
//!         for step in 1..=4u8 {
//!             if ctx.is_cancellation_requested() {
//!                 ctx.cancel(None)?;
//!                 return Ok(());
//!             }
//!             ctx.report_progress(Some(step * 25), None)?;
//!         }
//!         Ok::<_, HubError>(())
//!     })
//!     .await?;
//!
//!     // Auto-completed, then removed by the zero-delay retention policy.
//!     assert!(hub.current_snapshots().is_empty());
//!     pane.unsubscribe();
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod model;
mod operations;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use config::Config;
pub use core::{
    BroadcastHandle, ContextRef, ExecutionOptions, OperationContext, OperationHub, OperationScope,
    Outcome, SnapshotList,
};
pub use error::{HubError, PolicyError};
pub use events::{EventStream, Subscribe, Subscription};
pub use model::{
    ActionCallback, GlobalActivity, OperationAction, OperationNotification, OperationProperties,
    OperationSnapshot, OperationStatus, Severity,
};
pub use operations::{Operation, OperationFn, OperationRef};
pub use policies::{
    AutoCompletePolicy, CancelActionPolicy, OperationPolicy, PolicyKind, PolicyRef,
    RemediationPolicy, RetentionPolicy,
};
pub use subscribers::LogWriter;
