//! Scheduled Warm-up Task
//!
//! Background task that periodically pre-loads the directory's largest cities.
//! The cache itself never spawns anything; this task is wired up by `main`.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::directory::ShopDirectory;
use crate::roads::{targets_from_directory, RoadQueryCache, WarmupSettings};

/// Spawns a background task that warms the cache every `interval_secs`.
///
/// The first run happens after one full interval. Directory errors are logged
/// and the task keeps going.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_warmup_task(state.roads.clone(), state.directory.clone(), state.warmup, 1800);
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_warmup_task(
    roads: Arc<RoadQueryCache>,
    directory: Arc<dyn ShopDirectory>,
    settings: WarmupSettings,
    interval_secs: u64,
) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting warm-up task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let targets = match targets_from_directory(directory.as_ref(), &settings).await {
                Ok(targets) => targets,
                Err(e) => {
                    warn!("Warm-up skipped, directory unavailable: {}", e);
                    continue;
                }
            };

            if targets.is_empty() {
                debug!("Warm-up: directory has no cities");
                continue;
            }

            let report = roads.warmup(&targets).await;
            info!(
                "Warm-up: {} targets, {} fetched, {} failed, cache size {}",
                report.entries.len(),
                report.fetched(),
                report.failed(),
                report.cache_size
            );
        }
    })
}
