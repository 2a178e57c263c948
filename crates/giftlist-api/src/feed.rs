//! Change feed: recording of user actions and the polling endpoints built on it.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use sha2::{Digest, Sha256};
use tracing::warn;

use giftlist_db::GiftStore;
use giftlist_db::models::PresentRow;
use giftlist_types::api::{ContentHash, UpdatesQuery};
use giftlist_types::events::{NotificationKind, NotificationPayload, Update, UpdatesResponse};
use giftlist_types::models::{Id, Present, Recipient};

use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking, now_ms};

/// Upper bound of updates returned by a single poll.
const MAX_UPDATES_PER_POLL: u32 = 200;

/// Append an entry to the feed. The mutation it describes has already been
/// committed, so a failure here is logged rather than surfaced.
pub(crate) fn record(db: &dyn GiftStore, actor_id: Id, kind: NotificationKind, payload: NotificationPayload) {
    if let Err(e) = db.insert_notification(kind, Some(actor_id), &payload, now_ms()) {
        warn!("Failed to record {} notification: {:#}", kind, e);
    }
}

/// Payload for a present event, resolving the recipient's current name.
pub(crate) fn present_payload(db: &dyn GiftStore, present: &PresentRow) -> anyhow::Result<NotificationPayload> {
    let recipient_name = db
        .get_recipient(present.recipient_id)?
        .map(|r| r.name)
        .unwrap_or_default();
    Ok(NotificationPayload::present(
        present.recipient_id,
        &recipient_name,
        present.id,
        &present.title,
    ))
}

/// GET /api/updates?since=T — feed entries strictly newer than `T`, oldest
/// first. Without `since` nothing is returned and `timestamp` is the current
/// head of the feed, so a fresh client can start from "now".
pub async fn get_updates(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(params): Query<UpdatesQuery>,
) -> ApiResult<Json<UpdatesResponse>> {
    let response = blocking(&state, move |db| {
        let viewer = user.viewer(db)?;

        let Some(since) = params.since else {
            let head = db.latest_notification_timestamp(viewer)?.unwrap_or(0);
            return Ok(UpdatesResponse {
                has_updates: false,
                updates: vec![],
                timestamp: head,
            });
        };

        let since = since.max(0);
        let rows = db.notifications_since(viewer, since, MAX_UPDATES_PER_POLL)?;
        let timestamp = rows.last().map_or(since, |r| r.created_at);
        let updates: Vec<Update> = rows.into_iter().map(Update::from).collect();

        Ok(UpdatesResponse {
            has_updates: !updates.is_empty(),
            updates,
            timestamp,
        })
    })
    .await?;

    Ok(Json(response))
}

/// Hash of everything the caller can see of recipients and presents.
pub(crate) fn content_hash(recipients: &[Recipient], presents: &[Present]) -> anyhow::Result<String> {
    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(recipients)?);
    hasher.update(b"\n");
    hasher.update(serde_json::to_vec(presents)?);
    Ok(hex::encode(hasher.finalize()))
}

/// GET /api/recipients-hash — cheap change detection for the polling fallback.
pub async fn recipients_hash(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<ContentHash>> {
    let hash = blocking(&state, move |db| {
        let viewer = user.viewer(db)?;
        let recipients: Vec<Recipient> = db
            .list_recipients()?
            .into_iter()
            .map(|r| r.into_model(user.id))
            .collect();
        let mut presents: Vec<Present> = db
            .list_presents(viewer, None)?
            .into_iter()
            .map(Present::from)
            .collect();
        presents.sort_by_key(|p| p.id);
        Ok(content_hash(&recipients, &presents)?)
    })
    .await?;

    Ok(Json(ContentHash { hash }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn present(id: Id, checked: bool) -> Present {
        Present {
            id,
            title: "Rower".into(),
            comments: None,
            recipient_id: 1,
            is_checked: checked,
            reserved_by: None,
            created_by: Some(1),
            created_at: "2024-12-01 10:00:00".into(),
        }
    }

    #[test]
    fn hash_is_stable_and_sensitive_to_changes() {
        let a = content_hash(&[], &[present(1, false)]).unwrap();
        let b = content_hash(&[], &[present(1, false)]).unwrap();
        let c = content_hash(&[], &[present(1, true)]).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}
