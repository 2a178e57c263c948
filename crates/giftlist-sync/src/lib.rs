//! Client side of the gift list: polling sync against the change feed,
//! a stale-while-revalidate snapshot cache and local search.

pub mod api;
pub mod cache;
pub mod error;
pub mod poller;
pub mod search;
pub mod source;
pub mod state;

pub use api::ApiClient;
pub use cache::{CacheLoad, FastLoader, LoadOutcome, LocalCache};
pub use error::SyncError;
pub use poller::{Nudge, PollOutcome, Poller};
pub use search::{SearchHit, Searcher};
pub use source::{Snapshot, SyncSource, UpdateSink};
pub use state::{SyncState, SyncStateStore};
