//! Periodic status reporting.
//!
//! A long-running task that asks the completion service to synthesize a
//! status report once per interval and pushes it to the authorized peer.
//! Failed ticks retry after a short cooldown instead of consuming a full
//! interval; the loop ends only on process shutdown.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::Utc;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::completion::CompletionApi;
use crate::config::ReporterConfig;
use crate::shutdown::sleep_or_shutdown;
use crate::transport::{Outbox, SendOptions};

/// Timestamp format embedded in report prompts and headers.
const REPORT_TIME_FORMAT: &str = "%H:%M %d.%m.%Y";

/// Generates and delivers the periodic status report.
pub struct Reporter {
    config: ReporterConfig,
    completion: Arc<dyn CompletionApi>,
    outbox: Outbox,
    peer_id: i64,
    ready: watch::Receiver<bool>,
}

impl Reporter {
    /// Create a new reporter.
    pub fn new(
        config: ReporterConfig,
        completion: Arc<dyn CompletionApi>,
        outbox: Outbox,
        peer_id: i64,
        ready: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            completion,
            outbox,
            peer_id,
            ready,
        }
    }

    /// Run until shutdown is signalled.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("status reporter started");

        let ready_poll = Duration::from_secs(self.config.ready_poll_secs);
        let interval = Duration::from_secs(self.config.interval_secs);
        let cooldown = Duration::from_secs(self.config.retry_cooldown_secs);

        loop {
            // A not-ready transport is polled without consuming a tick.
            while !*self.ready.borrow() {
                warn!("transport not ready, waiting for connection...");
                if sleep_or_shutdown(ready_poll, &mut shutdown).await {
                    info!("status reporter stopped");
                    return;
                }
            }

            let pause = match self.tick().await {
                Ok(()) => interval,
                Err(err) => {
                    error!("report tick failed: {:#}", err);
                    cooldown
                }
            };

            if sleep_or_shutdown(pause, &mut shutdown).await {
                break;
            }
        }

        info!("status reporter stopped");
    }

    /// One report-generate-and-send cycle.
    async fn tick(&self) -> Result<()> {
        let stamp = Utc::now().format(REPORT_TIME_FORMAT).to_string();
        let prompt = format!(
            "Generate a concise technical report on the state of the system. \
             Current time: {stamp}. \
             The report should contain 3-5 points about system health."
        );

        let report = self
            .completion
            .dispatch(&prompt)
            .await
            .map_err(|err| anyhow!("generating report: {err}"))?;

        let message = format!("📊 Report for {stamp} (UTC):\n\n{report}");
        self.outbox
            .send_message(self.peer_id, message, SendOptions::report())
            .await?;

        info!("report delivered to peer {}", self.peer_id);
        Ok(())
    }
}
