//! # Example: cancel
//!
//! A long-running operation exposes a "Cancel" action; a simulated user presses it.
//!
//! Shows how to:
//! - Attach the cancel affordance with [`CancelActionPolicy`]
//! - Observe cancellation cooperatively through the context's token
//! - Attach remediation actions to failures with [`RemediationPolicy`]
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► spawn execute("scan", CancelActionPolicy + AutoCompletePolicy)
//!   │     └─► loop: report_progress, select! on cancelled()
//!   ├─► wait for the "Cancel" action to show up, invoke it
//!   ├─► unit of work returns Ok → outcome Canceled → snapshot Canceled/Warning
//!   └─► run a failing operation: RemediationPolicy adds "Retry" + "Dismiss"
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example cancel
//! ```

use std::sync::Arc;
use std::time::Duration;

use opshub::{
    AutoCompletePolicy, CancelActionPolicy, Config, ExecutionOptions, HubError, OperationAction,
    OperationHub, RemediationPolicy, SnapshotList,
};
use tokio::sync::Notify;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .init();

    let hub = OperationHub::new(Config::default());

    // 1. Wake main when a snapshot carries an action.
    let has_action = Arc::new(Notify::new());
    let notify = Arc::clone(&has_action);
    let _sub = hub.snapshots().subscribe(move |list: &SnapshotList| {
        if list.iter().any(|s| !s.properties().actions.is_empty()) {
            notify.notify_one();
        }
    })?;

    // 2. Long-running scan that only stops when asked.
    let opts = ExecutionOptions::new()
        .with_title("scan")
        .with_policy(CancelActionPolicy::default())
        .with_policy(AutoCompletePolicy);
    let h = hub.clone();
    let scan = tokio::spawn(async move {
        h.execute(opts, |ctx| async move {
            ctx.start(Some("scanning".into()))?;
            let token = ctx.cancellation_token();
            for percent in 0..=100u8 {
                tokio::select! {
                    _ = token.cancelled() => {
                        println!("[scan] cancellation observed at {percent}%");
                        return Ok(());
                    }
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {
                        ctx.report_progress(Some(percent), None)?;
                    }
                }
            }
            Ok::<_, HubError>(())
        })
        .await
    });

    // 3. The "user" presses Cancel.
    has_action.notified().await;
    tokio::time::sleep(Duration::from_millis(300)).await;
    let snap = hub
        .current_snapshots()
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("scan is not broadcast"))?;
    let cancel = snap
        .properties()
        .actions
        .first()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("no cancel action"))?;
    println!("[main] pressing {:?}", cancel.text());
    cancel.invoke().await;

    scan.await??;
    let list = hub.current_snapshots();
    let snap = &list[0];
    println!(
        "[main] scan ended: status={} severity={:?}",
        snap.status().as_label(),
        snap.properties().severity
    );
    hub.stop_snapshot_broadcast(snap.id());

    // 4. A failure with follow-up actions.
    let opts = ExecutionOptions::new()
        .with_title("deploy")
        .with_policy(AutoCompletePolicy)
        .with_policy(
            RemediationPolicy::new()
                .with_action(
                    OperationAction::new("Retry", || async { println!("[action] retry requested") })
                        .primary(),
                )
                .with_dismiss("Dismiss"),
        );
    let res = hub
        .execute(opts, |_ctx| async { Err::<(), _>("target unreachable") })
        .await;
    println!("[main] deploy returned {res:?}");

    let list = hub.current_snapshots();
    for action in &list[0].properties().actions {
        println!("[main] action available: {}", action.text());
    }
    Ok(())
}
