use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::source::{SyncSource, UpdateSink};
use crate::state::{SyncState, SyncStateStore};

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Result of a single poll cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The feed returned this many entries, all handed to the sink.
    Applied(usize),
    /// The feed answered with nothing new.
    Idle,
    /// The feed failed and the content hash changed, so the sink got a full reload.
    Reloaded,
    /// The feed failed but the content hash is unchanged.
    Unchanged,
    /// Neither path worked. The next tick tries again.
    Failed,
    /// The session is gone. The hash fallback would be refused too, so it is
    /// skipped until the user logs in again.
    LoggedOut,
}

/// Wakes a running poller for an immediate cycle, e.g. when the app comes
/// back to the foreground or the network returns.
#[derive(Clone, Default)]
pub struct Nudge(Arc<Notify>);

impl Nudge {
    pub fn nudge(&self) {
        self.0.notify_one();
    }
}

/// Incremental feed polling with a content-hash fallback.
pub struct Poller<S, K> {
    source: S,
    sink: K,
    store: SyncStateStore,
    state: SyncState,
    interval: Duration,
    nudge: Nudge,
}

impl<S: SyncSource, K: UpdateSink> Poller<S, K> {
    /// Restore the persisted cursor and build a poller around it.
    pub async fn new(source: S, sink: K, store: SyncStateStore) -> Self {
        let state = store.load().await;
        Self {
            source,
            sink,
            store,
            state,
            interval: DEFAULT_INTERVAL,
            nudge: Nudge::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn nudge_handle(&self) -> Nudge {
        self.nudge.clone()
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub async fn poll_once(&mut self) -> PollOutcome {
        match self.source.updates_since(self.state.last_timestamp).await {
            Ok(resp) => {
                let count = resp.updates.len();
                for update in &resp.updates {
                    self.sink.apply(update);
                }
                if self.state.last_timestamp != Some(resp.timestamp) {
                    self.state.last_timestamp = Some(resp.timestamp);
                    self.persist().await;
                }
                if count > 0 {
                    debug!("Applied {} updates, cursor now {}", count, resp.timestamp);
                    PollOutcome::Applied(count)
                } else {
                    PollOutcome::Idle
                }
            }
            Err(e) if e.is_unauthorized() => {
                warn!("Session expired, polling paused until next login");
                PollOutcome::LoggedOut
            }
            Err(e) => {
                warn!("Update feed unavailable, checking content hash: {}", e);
                self.hash_fallback().await
            }
        }
    }

    async fn hash_fallback(&mut self) -> PollOutcome {
        let hash = match self.source.content_hash().await {
            Ok(hash) => hash,
            Err(e) => {
                warn!("Content hash unavailable: {}", e);
                return PollOutcome::Failed;
            }
        };
        if self.state.last_hash.as_deref() == Some(hash.as_str()) {
            return PollOutcome::Unchanged;
        }

        match self.source.snapshot().await {
            Ok(snapshot) => {
                info!("Content changed, reloading everything");
                self.sink.full_reload(snapshot);
                self.state.last_hash = Some(hash);
                self.persist().await;
                PollOutcome::Reloaded
            }
            Err(e) => {
                warn!("Reload failed: {}", e);
                PollOutcome::Failed
            }
        }
    }

    async fn persist(&self) {
        if let Err(e) = self.store.save(&self.state).await {
            warn!("Cannot persist sync state: {}", e);
        }
    }

    /// Poll on a fixed interval until cancelled. A nudge triggers an
    /// immediate poll and restarts the wait. Returns the sink.
    pub async fn run(mut self, cancel: CancellationToken) -> K {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            self.poll_once().await;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
                _ = self.nudge.0.notified() => debug!("Poll nudged"),
            }
        }
        debug!("Poller stopped");
        self.sink
    }
}
