use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::SyncError;

/// Poll cursor kept between runs: the feed timestamp and the last content
/// hash seen by the fallback path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncState {
    pub last_timestamp: Option<i64>,
    pub last_hash: Option<String>,
}

/// JSON file holding a `SyncState`, one per profile directory.
#[derive(Debug, Clone)]
pub struct SyncStateStore {
    path: PathBuf,
}

impl SyncStateStore {
    pub const FILE_NAME: &'static str = "sync-state.json";

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or unreadable file yields the default state, which makes
    /// the next poll start from the feed head.
    pub async fn load(&self) -> SyncState {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                warn!("Ignoring corrupt sync state {}: {}", self.path.display(), e);
                SyncState::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => SyncState::default(),
            Err(e) => {
                warn!("Cannot read sync state {}: {}", self.path.display(), e);
                SyncState::default()
            }
        }
    }

    pub async fn save(&self, state: &SyncState) -> Result<(), SyncError> {
        write_atomic(&self.path, &serde_json::to_vec(state)?).await
    }
}

/// Write through a temp file so readers never see a half-written file.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SyncError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
