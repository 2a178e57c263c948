use std::sync::Arc;

use anyhow::anyhow;
use tracing::error;

use giftlist_db::GiftStore;

use crate::error::{ApiError, ApiResult};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<dyn GiftStore>,
    pub session_ttl: chrono::Duration,
    /// Adds the `Secure` attribute to the session cookie.
    pub cookie_secure: bool,
}

impl AppStateInner {
    pub fn new(db: Arc<dyn GiftStore>) -> Self {
        Self {
            db,
            session_ttl: chrono::Duration::days(7),
            cookie_secure: false,
        }
    }
}

/// Run blocking store work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&dyn GiftStore) -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    let db = state.db.clone();
    tokio::task::spawn_blocking(move || f(db.as_ref()))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!("blocking task failed: {}", e))
        })?
}

/// Current time as unix epoch milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
