//! Monitor command running the background agent for one subject.

use std::sync::Arc;

use anyhow::{Context, Result};

use dw_core::SubjectId;
use dw_engine::{FixedSettings, Monitor, Tracker};

use crate::Config;

/// Runs the monitoring agent until Ctrl-C.
///
/// Window/photo capture agents are external to this binary; the monitor
/// runs with the placeholder context provider (events carry an unknown
/// identity) and real CPU/memory sampling. Library consumers swap in
/// platform providers via [`Monitor::with_context_provider`].
pub fn run(tracker: &Tracker, config: &Config, subject: &str) -> Result<()> {
    let subject = SubjectId::new(subject)?;
    let settings = Arc::new(FixedSettings(config.monitor_settings()));

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(async {
        let monitor = Arc::new(
            Monitor::new(tracker, subject.clone(), settings).with_status_callback(|status| {
                tracing::info!(?status, "activity status changed");
            }),
        );
        let handle = monitor.start()?;
        println!("Monitoring {subject}; press Ctrl-C to stop.");

        tokio::signal::ctrl_c()
            .await
            .context("failed to listen for shutdown signal")?;
        tracing::info!("shutdown signal received");
        handle.shutdown().await;
        Ok(())
    })
}
