use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use giftlist_db::GiftStore;

/// Background task that drops expired sessions.
///
/// Expired sessions are already rejected on lookup; this only keeps the
/// table from growing.
pub async fn run_cleanup_loop(db: Arc<dyn GiftStore>, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match prune_sessions(db.clone()).await {
            Ok(count) => {
                if count > 0 {
                    info!("Cleanup: removed {} expired sessions", count);
                }
            }
            Err(e) => {
                warn!("Cleanup error: {}", e);
            }
        }
    }
}

async fn prune_sessions(db: Arc<dyn GiftStore>) -> anyhow::Result<usize> {
    let now = chrono::Utc::now().timestamp_millis();
    tokio::task::spawn_blocking(move || db.delete_expired_sessions(now)).await?
}
