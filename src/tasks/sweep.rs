//! Expiration Sweep Task
//!
//! Background task that periodically removes expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Cache;

/// Spawns a background task that periodically sweeps expired entries.
///
/// The firing interval is the cache's configured `sweep_interval_ms`;
/// an interval of 0 disables sweeping and the task exits immediately.
/// The task sleeps between runs, acquiring a write lock on the cache for
/// each sweep. It exits on its own once the cache is destroyed, and can
/// be aborted via the returned handle.
pub fn spawn_sweep_task(cache: Arc<RwLock<Cache>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval_ms = cache.read().await.config().sweep_interval_ms;
        if interval_ms == 0 {
            info!("expiration sweep disabled by configuration");
            return;
        }
        let interval = Duration::from_millis(interval_ms);
        info!(interval_ms, "starting expiration sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let removed = {
                let mut cache_guard = cache.write().await;
                if cache_guard.is_destroyed() {
                    info!("cache destroyed, stopping sweep task");
                    break;
                }
                cache_guard.sweep_expired()
            };

            if removed > 0 {
                info!(removed, "sweep removed expired entries");
            } else {
                debug!("sweep found no expired entries");
            }
        }
    })
}
