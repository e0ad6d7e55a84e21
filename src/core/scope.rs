//! # Operation scope and executor.
//!
//! [`OperationScope`] guarantees setup/teardown around one unit of work;
//! [`OperationExecutor`] is sugar that opens a scope, runs the work and ends the scope.
//!
//! ## Lifecycle
//! ```text
//! begin:  create context ─► register ─► Start policies
//! end:    record Outcome ─► Completion policies ─► unregister ─► close context
//!
//! Exit paths:
//!   scope.complete()/fail()/end()   → end(outcome) awaited by the caller
//!   future holding end() dropped    → unregister in guard Drop (policies cut short)
//!   scope dropped without ending    → end(Abandoned) spawned on the current runtime
//!                                     (no runtime, or task never polled: unregister only)
//! ```
//!
//! ## Rules
//! - Unregistration happens on **every** exit path, whatever the policies do.
//! - Errors from the unit of work are returned to the caller unchanged.
//! - Panics in the unit of work are resumed after cleanup.
//! - Cancellation is cooperative: nothing here aborts running work.

use std::fmt;
use std::future::Future;
use std::panic::{resume_unwind, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::context::{ContextRef, OperationContext, Outcome};
use crate::core::manager::OperationManager;
use crate::core::options::ExecutionOptions;
use crate::error::panic_message;
use crate::operations::Operation;
use crate::policies::{PolicyKind, PolicyRef};

/// Begin/end wrapper around one operation.
///
/// End it explicitly with [`complete`](Self::complete), [`fail`](Self::fail) or
/// [`end`](Self::end). Dropping it un-ended still cleans up, in the background.
#[must_use = "an operation scope should be ended with complete(), fail() or end()"]
pub struct OperationScope {
    ctx: ContextRef,
    manager: Arc<OperationManager>,
    policies: Vec<PolicyRef>,
    ended: bool,
}

impl OperationScope {
    pub(crate) async fn begin(manager: Arc<OperationManager>, options: ExecutionOptions) -> Self {
        let (policies, parent, properties) = options.into_parts();
        let token = parent
            .map(|p| p.child_token())
            .unwrap_or_else(CancellationToken::new);

        let ctx = Arc::new(OperationContext::new(Arc::clone(&manager), properties, token));
        manager.register(&ctx);

        // Logged by the manager; the work runs regardless.
        let _ = manager
            .apply_policies(PolicyKind::Start, &ctx, &policies)
            .await;

        Self {
            ctx,
            manager,
            policies,
            ended: false,
        }
    }

    pub fn context(&self) -> &ContextRef {
        &self.ctx
    }

    /// Ends the scope as [`Outcome::Succeeded`].
    pub async fn complete(self) {
        self.end(Outcome::Succeeded).await
    }

    /// Ends the scope as [`Outcome::Failed`].
    pub async fn fail(self, reason: impl Into<String>) {
        self.end(Outcome::Failed(reason.into())).await
    }

    /// Records `outcome`, applies completion policies, unregisters the context.
    pub async fn end(mut self, outcome: Outcome) {
        self.ended = true;
        self.ctx.set_outcome(outcome);
        let release = Release {
            manager: Arc::clone(&self.manager),
            ctx: Arc::clone(&self.ctx),
        };
        let policies = std::mem::take(&mut self.policies);
        finish(release, policies).await;
    }
}

impl Drop for OperationScope {
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let ctx = Arc::clone(&self.ctx);
        ctx.set_outcome(Outcome::Abandoned);
        let release = Release {
            manager: Arc::clone(&self.manager),
            ctx: Arc::clone(&ctx),
        };
        let policies = std::mem::take(&mut self.policies);

        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                debug!(op = %ctx.id(), "scope dropped without end; cleaning up in background");
                // A runtime shutting down drops the task unpolled; `release` still unregisters.
                rt.spawn(finish(release, policies));
            }
            Err(_) => {
                warn!(op = %ctx.id(), "scope dropped outside a tokio runtime; completion policies skipped");
                drop(release);
            }
        }
    }
}

impl fmt::Debug for OperationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationScope")
            .field("ctx", &self.ctx)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}

async fn finish(release: Release, policies: Vec<PolicyRef>) {
    // Logged by the manager; unregistration follows regardless.
    let _ = release
        .manager
        .apply_policies(PolicyKind::Completion, &release.ctx, &policies)
        .await;
    drop(release);
}

/// Unregisters and closes on drop, so every exit path releases the context:
/// a cancelled `end()` future, or a cleanup task its runtime never polls.
struct Release {
    manager: Arc<OperationManager>,
    ctx: ContextRef,
}

impl Drop for Release {
    fn drop(&mut self) {
        self.manager.unregister(self.ctx.id());
        self.ctx.close();
    }
}

/// Runs units of work inside scopes.
#[derive(Clone)]
pub(crate) struct OperationExecutor {
    manager: Arc<OperationManager>,
}

impl OperationExecutor {
    pub(crate) fn new(manager: Arc<OperationManager>) -> Self {
        Self { manager }
    }

    pub(crate) async fn begin(&self, options: ExecutionOptions) -> OperationScope {
        OperationScope::begin(Arc::clone(&self.manager), options).await
    }

    pub(crate) async fn execute<F, Fut, T, E>(&self, options: ExecutionOptions, f: F) -> Result<T, E>
    where
        F: FnOnce(ContextRef) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        let scope = self.begin(options).await;
        let ctx = Arc::clone(scope.context());

        match AssertUnwindSafe(f(Arc::clone(&ctx))).catch_unwind().await {
            Ok(result) => {
                let outcome = match &result {
                    _ if ctx.is_cancellation_requested() => Outcome::Canceled,
                    Ok(_) => Outcome::Succeeded,
                    Err(e) => Outcome::Failed(e.to_string()),
                };
                scope.end(outcome).await;
                result
            }
            Err(payload) => {
                let reason = format!("panicked: {}", panic_message(payload.as_ref()));
                scope.end(Outcome::Failed(reason)).await;
                resume_unwind(payload)
            }
        }
    }

    pub(crate) async fn run<O>(
        &self,
        op: &O,
        options: ExecutionOptions,
    ) -> Result<O::Output, O::Error>
    where
        O: Operation + ?Sized,
    {
        let options = if options.properties().title.is_none() {
            options.with_title(op.name())
        } else {
            options
        };
        self.execute(options, |ctx| op.run(ctx)).await
    }
}
