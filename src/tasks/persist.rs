//! Auto-Persist Task
//!
//! Background task that periodically saves the cache to disk and drives
//! the write coalescer's delay timer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::Cache;

/// Spawns a background task that periodically persists the cache.
///
/// The firing interval is the cache's configured
/// `auto_persist_interval_ms`; an interval of 0 means auto-persist is
/// disabled and the task exits immediately. Each firing checks the
/// coalescer's delay deadline (`tick`) and then calls `save(false)`,
/// which is a no-op while the cache is clean. The task exits on its own
/// once the cache is destroyed or auto-persist has been stopped, and can
/// also be aborted via the returned handle during shutdown.
pub fn spawn_auto_persist_task(cache: Arc<RwLock<Cache>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let interval_ms = cache.read().await.config().auto_persist_interval_ms;
        if interval_ms == 0 {
            info!("auto-persist disabled by configuration");
            return;
        }
        let interval = Duration::from_millis(interval_ms);
        info!(interval_ms, "starting auto-persist task");

        loop {
            tokio::time::sleep(interval).await;

            let mut cache_guard = cache.write().await;
            if !cache_guard.auto_persist_enabled() {
                info!("auto-persist disabled, stopping task");
                break;
            }

            if cache_guard.tick() {
                debug!("coalescer delay elapsed, pending writes flushed");
            }
            cache_guard.save(false);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use serde_json::json;

    fn shared_cache(dir: &std::path::Path, interval_ms: u64) -> Arc<RwLock<Cache>> {
        let config = CacheConfig {
            auto_persist_interval_ms: interval_ms,
            cache_dir: dir.to_path_buf(),
            cache_id: "auto".to_string(),
            ..CacheConfig::default()
        };
        Arc::new(RwLock::new(Cache::new(config)))
    }

    #[tokio::test]
    async fn test_configured_interval_drives_persistence() {
        let dir = tempfile::tempdir().unwrap();
        // The interval comes from the config alone; nothing re-supplies it
        let cache = shared_cache(dir.path(), 50);

        {
            let mut guard = cache.write().await;
            guard.set("key", json!("value")).unwrap();
            assert!(guard.is_dirty());
        }

        let handle = spawn_auto_persist_task(cache.clone());
        tokio::time::sleep(Duration::from_millis(150)).await;

        {
            let guard = cache.read().await;
            assert!(!guard.is_dirty(), "auto-persist should have saved");
            assert!(guard.cache_file_path().exists());
        }

        handle.abort();
    }

    #[tokio::test]
    async fn test_zero_interval_exits_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let cache = shared_cache(dir.path(), 0);

        {
            let mut guard = cache.write().await;
            guard.set("key", json!("value")).unwrap();
        }

        let handle = spawn_auto_persist_task(cache.clone());
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(handle.is_finished(), "disabled task should exit at once");
        assert!(cache.read().await.is_dirty(), "nothing should have saved");
    }

    #[tokio::test]
    async fn test_task_exits_after_stop_auto_persist() {
        let dir = tempfile::tempdir().unwrap();
        let cache = shared_cache(dir.path(), 20);

        let handle = spawn_auto_persist_task(cache.clone());

        cache.write().await.stop_auto_persist();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.is_finished(), "task should stop once disabled");
    }

    #[tokio::test]
    async fn test_task_exits_after_destroy() {
        let dir = tempfile::tempdir().unwrap();
        let cache = shared_cache(dir.path(), 20);

        let handle = spawn_auto_persist_task(cache.clone());

        cache.write().await.destroy(false);
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handle.is_finished(), "task should stop once destroyed");
    }

    #[tokio::test]
    async fn test_task_can_be_aborted() {
        let dir = tempfile::tempdir().unwrap();
        let cache = shared_cache(dir.path(), 1000);

        let handle = spawn_auto_persist_task(cache);
        handle.abort();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished(), "task should be finished after abort");
    }
}
