use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, instrument};

use super::GameService;

/// Configuration for the session cleanup task
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// How often to look for sessions to unload
    pub cleanup_interval: Duration,
    /// How long a running or lobby session may sit untouched in memory
    pub idle_threshold: Duration,
    /// How long a finished session stays loaded after its last request
    pub finished_threshold: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(5 * 60),
            idle_threshold: Duration::from_secs(2 * 60 * 60),
            finished_threshold: Duration::from_secs(10 * 60),
        }
    }
}

/// Periodically unloads idle and finished sessions from the game service
#[instrument(skip(game_service))]
pub async fn start_cleanup_task(game_service: Arc<GameService>, config: CleanupConfig) {
    info!(
        cleanup_interval_secs = config.cleanup_interval.as_secs(),
        idle_threshold_secs = config.idle_threshold.as_secs(),
        finished_threshold_secs = config.finished_threshold.as_secs(),
        "Starting session cleanup background task"
    );

    let mut cleanup_interval = interval(config.cleanup_interval);
    loop {
        cleanup_interval.tick().await;

        let evicted = game_service
            .evict_idle_sessions(config.idle_threshold, config.finished_threshold)
            .await;
        if evicted > 0 {
            info!(evicted, "Session cleanup completed");
        } else {
            debug!("No sessions to unload");
        }
    }
}
