use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use giftlist_types::events::{Update, UpdatesResponse};
use giftlist_types::models::{PresentDetails, Recipient};

use crate::error::SyncError;

/// Everything a list page renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub recipients: Vec<Recipient>,
    pub presents: Vec<PresentDetails>,
}

/// Where the poller and loader get server state from. `ApiClient` is the
/// HTTP implementation.
#[async_trait]
pub trait SyncSource: Send + Sync {
    /// `None` asks for the current feed head without any entries.
    async fn updates_since(&self, since: Option<i64>) -> Result<UpdatesResponse, SyncError>;

    async fn content_hash(&self) -> Result<String, SyncError>;

    async fn snapshot(&self) -> Result<Snapshot, SyncError>;
}

/// Receives feed entries in order. Consumers dispatch on `update.kind`.
pub trait UpdateSink: Send {
    fn apply(&mut self, update: &Update);

    /// Replace everything after the hash fallback detected a change.
    fn full_reload(&mut self, snapshot: Snapshot);
}
