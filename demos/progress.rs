//! # Example: progress
//!
//! Runs three operations side by side and prints what a status pane and a global progress
//! indicator would show.
//!
//! Shows how to:
//! - Subscribe to the snapshots and global activity streams
//! - Report progress from concurrent units of work with [`OperationContext::report_progress`]
//! - Let [`AutoCompletePolicy`] and [`RetentionPolicy`] close out and dismiss finished work
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► OperationHub::new(Config::default())
//!   ├─► LogWriter::attach(&hub)          (tracing lines for every stream)
//!   ├─► snapshots().subscribe(..)        (status pane)
//!   └─► join!(copy, index, upload)
//!         ├─► each: start → report_progress(0..=100) → Ok
//!         ├─► AutoCompletePolicy  → Completed/Success
//!         └─► RetentionPolicy(1s) → removed from the pane
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info cargo run --example progress
//! ```

use std::time::Duration;

use opshub::{
    AutoCompletePolicy, Config, ContextRef, ExecutionOptions, HubError, LogWriter, OperationHub,
    RetentionPolicy, SnapshotList,
};
use tracing_subscriber::EnvFilter;

async fn transfer(ctx: ContextRef, step: u64) -> Result<(), HubError> {
    ctx.start(Some("preparing".into()))?;
    for percent in (0..=100u8).step_by(20) {
        tokio::time::sleep(Duration::from_millis(step)).await;
        ctx.report_progress(Some(percent), Some(format!("{percent}%")))?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let hub = OperationHub::new(Config::default());
    let _log = LogWriter::attach(&hub)?;

    let _pane = hub.snapshots().subscribe(|list: &SnapshotList| {
        let line: Vec<String> = list
            .iter()
            .map(|s| {
                let p = s.properties();
                format!(
                    "{}={}{}",
                    p.title.as_deref().unwrap_or("?"),
                    p.status.as_label(),
                    p.percent.map(|v| format!("@{v}")).unwrap_or_default()
                )
            })
            .collect();
        println!("[pane] {}", line.join("  "));
    })?;

    let opts = |title: &str| {
        ExecutionOptions::new()
            .with_title(title)
            .with_policy(AutoCompletePolicy)
            .with_policy(RetentionPolicy::new(Duration::from_secs(1)))
    };

    let (a, b, c) = tokio::join!(
        hub.execute(opts("copy"), |ctx| transfer(ctx, 80)),
        hub.execute(opts("index"), |ctx| transfer(ctx, 120)),
        hub.execute(opts("upload"), |ctx| transfer(ctx, 50)),
    );
    a?;
    b?;
    c?;

    println!("[main] all done, activity={:?}", hub.current_activity());
    tokio::time::sleep(Duration::from_millis(1200)).await;
    println!("[main] pane after retention: {} item(s)", hub.current_snapshots().len());
    Ok(())
}
