use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use common::contracts::{Enqueuer, NotificationStore};
use common::NotificationStatus;

/// Configuration for the stale notification reaper.
#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// How often the reaper scans for stale records.
    pub interval: Duration,

    /// How long a record may sit in queued/processing before it is
    /// considered stale. Keep this above twice the provider timeout plus
    /// the longest retry backoff, or slow-but-healthy tasks will be
    /// double-dispatched.
    pub stale_threshold: Duration,

    /// Maximum number of stale records recovered per cycle.
    pub batch_size: u64,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            stale_threshold: Duration::from_secs(600),
            batch_size: 50,
        }
    }
}

/// Periodically scans the store for records stuck in `queued`/`processing`
/// and puts them back on the queue.
///
/// The store is the source of truth and the queue is treated as a cache:
/// as long as the store survives, every record is eventually retried, even
/// after a queue wipe or a worker crash. The reaper is the sole guarantor
/// of that property.
pub struct Reaper {
    store: Arc<dyn NotificationStore>,
    enqueuer: Arc<dyn Enqueuer>,
    config: ReaperConfig,
}

impl Reaper {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        enqueuer: Arc<dyn Enqueuer>,
        mut config: ReaperConfig,
    ) -> Self {
        let defaults = ReaperConfig::default();
        if config.interval.is_zero() {
            config.interval = defaults.interval;
        }
        if config.stale_threshold.is_zero() {
            config.stale_threshold = defaults.stale_threshold;
        }
        if config.batch_size == 0 {
            config.batch_size = defaults.batch_size;
        }

        Self {
            store,
            enqueuer,
            config,
        }
    }

    /// Run the reaper loop until the token is cancelled. A sweep in
    /// progress finishes its current iteration before the loop exits.
    pub async fn run(self, token: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            stale_threshold_secs = self.config.stale_threshold.as_secs(),
            batch_size = self.config.batch_size,
            "Reaper started"
        );

        let mut interval = tokio::time::interval(self.config.interval);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("Reaper stopped");
                    return;
                }
                _ = interval.tick() => {
                    self.sweep().await;
                }
            }
        }
    }

    /// One reaper cycle: find stale records, reset them to `queued`, and
    /// re-enqueue them. Per-record failures are logged and skipped so one
    /// bad row can't block the rest of the batch.
    pub async fn sweep(&self) {
        let older_than = Utc::now()
            - chrono::Duration::from_std(self.config.stale_threshold)
                .unwrap_or_else(|_| chrono::Duration::seconds(600));

        let stale = match self.store.list_stale(older_than, self.config.batch_size).await {
            Ok(stale) => stale,
            Err(e) => {
                error!(error = %e, "Reaper failed to list stale notifications");
                return;
            }
        };

        if stale.is_empty() {
            return; // Nothing to do, the common case
        }

        warn!(count = stale.len(), "Found stale notifications");

        let mut recovered = 0;
        for record in &stale {
            // Reset to queued before re-enqueuing so the worker picks the
            // record up cleanly; this also wipes the stale error message.
            if let Err(e) = self
                .store
                .update_status(&record.id, NotificationStatus::Queued, None, None)
                .await
            {
                error!(log_id = %record.id, error = %e, "Reaper failed to reset status");
                continue;
            }

            if let Err(e) = self.enqueuer.enqueue_send(&record.id).await {
                error!(log_id = %record.id, error = %e, "Reaper failed to re-enqueue");
                continue;
            }

            recovered += 1;
            info!(
                log_id = %record.id,
                original_status = %record.status,
                "Recovered stale notification"
            );
        }

        if recovered > 0 {
            info!(recovered, total_stale = stale.len(), "Reaper sweep complete");
        }
    }
}
