//! # Example: custom_subscriber
//!
//! Implements [`Subscribe`] for a toast tray that keeps the notifications it has been shown.
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► notifications().subscribe_observer(Arc<Toasts>)
//!   ├─► execute(...)
//!   │     ├─► publish_notification(None)          → default duration from Config
//!   │     └─► publish_notification_with(.., 10s)  → explicit duration
//!   └─► print what the tray received
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example custom_subscriber
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use opshub::{
    Config, ExecutionOptions, HubError, OperationHub, OperationNotification, Severity, Subscribe,
};
use tracing_subscriber::EnvFilter;

#[derive(Default)]
struct Toasts {
    shown: Mutex<Vec<OperationNotification>>,
}

impl Subscribe<OperationNotification> for Toasts {
    fn on_event(&self, n: &OperationNotification) {
        println!(
            "[toast] {:?}: {} ({:?})",
            n.properties.severity,
            n.properties.message.as_deref().unwrap_or(""),
            n.duration
        );
        if let Ok(mut shown) = self.shown.lock() {
            shown.push(n.clone());
        }
    }

    fn name(&self) -> &'static str {
        "toasts"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let hub = OperationHub::new(Config {
        notification_duration: Duration::from_secs(4),
        ..Config::default()
    });

    let toasts = Arc::new(Toasts::default());
    let _sub = hub
        .notifications()
        .subscribe_observer(Arc::clone(&toasts) as Arc<dyn Subscribe<OperationNotification>>)?;

    hub.execute(ExecutionOptions::new().with_title("backup"), |ctx| async move {
        ctx.start(Some("backup started".into()))?;
        ctx.publish_notification(None);
        ctx.publish_notification_with(
            |p| {
                p.with_severity(Severity::Warning)
                    .with_message(Some("disk almost full".into()))
            },
            Some(Duration::from_secs(10)),
        );
        ctx.succeed(Some("backup finished".into()))?;
        ctx.publish_notification(None);
        Ok::<_, HubError>(())
    })
    .await?;

    let shown = toasts.shown.lock().map(|s| s.len()).unwrap_or(0);
    println!("[main] tray received {shown} notification(s)");
    Ok(())
}
