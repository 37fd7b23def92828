//! Periodic eviction of finished tasks.
//!
//! Only spawned when `TASK_RETENTION_HOURS` is set. Removes completed,
//! failed, and cancelled tasks whose last update is older than the
//! retention period; pending and running tasks are never touched.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use diffrhythm_tasks::TaskRegistry;
use tokio_util::sync::CancellationToken;

/// How often the sweep runs.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600); // 1 hour

/// Run the retention sweep loop until `cancel` is triggered.
pub async fn run(registry: Arc<TaskRegistry>, retention_hours: u64, cancel: CancellationToken) {
    run_with_interval(registry, retention_hours, SWEEP_INTERVAL, cancel).await;
}

/// [`run`] with a custom sweep interval.
pub async fn run_with_interval(
    registry: Arc<TaskRegistry>,
    retention_hours: u64,
    every: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_hours,
        interval_secs = every.as_secs(),
        "Task retention job started"
    );

    let retention = i64::try_from(retention_hours)
        .ok()
        .and_then(chrono::Duration::try_hours);
    let mut interval = tokio::time::interval(every);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Task retention job stopping");
                break;
            }
            _ = interval.tick() => {
                // A period too large to represent evicts nothing.
                let Some(cutoff) = retention.and_then(|r| Utc::now().checked_sub_signed(r)) else {
                    continue;
                };
                let purged = registry.purge_terminal_before(cutoff);
                if purged > 0 {
                    tracing::info!(purged, "Task retention: evicted finished tasks");
                } else {
                    tracing::debug!("Task retention: nothing to evict");
                }
            }
        }
    }
}
