use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::source::{Snapshot, SyncSource};
use crate::state::write_atomic;

/// How long a cached snapshot is good enough to skip the network.
pub const FRESH_FOR: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Serialize, Deserialize)]
struct CachedSnapshot {
    saved_at: DateTime<Utc>,
    snapshot: Snapshot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CacheLoad {
    Fresh(Snapshot),
    Stale(Snapshot),
    Missing,
}

/// Last known snapshot on disk, the local-storage equivalent.
#[derive(Debug, Clone)]
pub struct LocalCache {
    path: PathBuf,
    fresh_for: Duration,
}

impl LocalCache {
    pub const FILE_NAME: &'static str = "snapshot.json";

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(Self::FILE_NAME),
            fresh_for: FRESH_FOR,
        }
    }

    pub fn with_freshness(mut self, fresh_for: Duration) -> Self {
        self.fresh_for = fresh_for;
        self
    }

    pub async fn load(&self) -> CacheLoad {
        self.load_at(Utc::now()).await
    }

    pub async fn load_at(&self, now: DateTime<Utc>) -> CacheLoad {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Cannot read cache {}: {}", self.path.display(), e);
                }
                return CacheLoad::Missing;
            }
        };
        let cached: CachedSnapshot = match serde_json::from_slice(&bytes) {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Ignoring corrupt cache {}: {}", self.path.display(), e);
                return CacheLoad::Missing;
            }
        };

        // A save time in the future (clock change) counts as stale.
        let fresh = (now - cached.saved_at)
            .to_std()
            .is_ok_and(|age| age < self.fresh_for);
        if fresh {
            CacheLoad::Fresh(cached.snapshot)
        } else {
            CacheLoad::Stale(cached.snapshot)
        }
    }

    pub async fn store(&self, snapshot: &Snapshot) -> Result<(), SyncError> {
        self.store_at(snapshot, Utc::now()).await
    }

    pub async fn store_at(&self, snapshot: &Snapshot, saved_at: DateTime<Utc>) -> Result<(), SyncError> {
        let cached = CachedSnapshot {
            saved_at,
            snapshot: snapshot.clone(),
        };
        write_atomic(&self.path, &serde_json::to_vec(&cached)?).await
    }
}

/// What `FastLoader::load` ended up showing.
#[derive(Debug)]
pub enum LoadOutcome {
    /// Cache was fresh; no request was made.
    Cached,
    /// Fetched from the server (after showing any cached copy).
    Refreshed,
    /// Refresh failed; the stale cached copy stays on screen.
    StaleKept(SyncError),
    /// Nothing cached and the refresh failed.
    Failed(SyncError),
}

/// Stale-while-revalidate page loader.
pub struct FastLoader<S> {
    cache: LocalCache,
    source: S,
}

impl<S: SyncSource> FastLoader<S> {
    pub fn new(cache: LocalCache, source: S) -> Self {
        Self { cache, source }
    }

    /// Render the cached snapshot right away, then refresh unless it is
    /// fresh. `render` runs once per snapshot shown.
    pub async fn load<F>(&self, mut render: F) -> LoadOutcome
    where
        F: FnMut(&Snapshot),
    {
        let had_cache = match self.cache.load().await {
            CacheLoad::Fresh(snapshot) => {
                render(&snapshot);
                debug!("Cache fresh, skipping refresh");
                return LoadOutcome::Cached;
            }
            CacheLoad::Stale(snapshot) => {
                render(&snapshot);
                true
            }
            CacheLoad::Missing => false,
        };

        match self.refresh().await {
            Ok(snapshot) => {
                render(&snapshot);
                LoadOutcome::Refreshed
            }
            Err(e) if had_cache => {
                warn!("Refresh failed, showing cached data: {}", e);
                LoadOutcome::StaleKept(e)
            }
            Err(e) => LoadOutcome::Failed(e),
        }
    }

    /// Fetch from the server and replace the cached copy.
    pub async fn refresh(&self) -> Result<Snapshot, SyncError> {
        let snapshot = self.source.snapshot().await?;
        if let Err(e) = self.cache.store(&snapshot).await {
            warn!("Cannot write cache: {}", e);
        }
        Ok(snapshot)
    }
}
