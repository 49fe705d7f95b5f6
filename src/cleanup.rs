//! Scheduled housekeeping for in-memory rate limiter state.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::rate_limit::RateLimitConfig;

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Run all cleanup tasks once.
pub fn run_cleanup(rate_limit: &RateLimitConfig) {
    let pruned = rate_limit.prune();
    if pruned > 0 {
        debug!(pruned, "Pruned idle rate limiter keys");
    }
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(rate_limit: Arc<RateLimitConfig>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        // The first tick completes immediately; there is nothing to prune yet.
        interval.tick().await;

        loop {
            interval.tick().await;
            run_cleanup(&rate_limit);
        }
    })
}
