use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use giftlist_types::api::{MarkAllRead, NotificationPage, NotificationQuery, SuccessResponse, UnreadCount};
use giftlist_types::events::{Notification, Update};
use giftlist_types::models::Id;

use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking};

const MAX_PAGE_SIZE: u32 = 100;

/// GET /api/notifications?limit=&offset= — newest first, with the caller's
/// own read state.
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<NotificationQuery>,
) -> ApiResult<Json<NotificationPage>> {
    let limit = query.limit.clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset;

    let page = blocking(&state, move |db| {
        let viewer = user.viewer(db)?;
        let notifications = db
            .list_notifications(viewer, limit, offset)?
            .into_iter()
            .map(|row| {
                let is_read = row.is_read;
                Notification {
                    update: Update::from(row),
                    is_read,
                }
            })
            .collect();

        Ok(NotificationPage {
            notifications,
            total: db.count_notifications(viewer)?,
            unread: db.count_unread(viewer)?,
        })
    })
    .await?;

    Ok(Json(page))
}

pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<SuccessResponse>> {
    blocking(&state, move |db| {
        let viewer = user.viewer(db)?;
        if db.mark_read(viewer, id)? {
            Ok(())
        } else {
            Err(ApiError::NotFound("Nie znaleziono powiadomienia"))
        }
    })
    .await?;

    Ok(Json(SuccessResponse::ok()))
}

/// Marks every visible notification read for the caller only.
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<MarkAllRead>> {
    let marked = blocking(&state, move |db| {
        let viewer = user.viewer(db)?;
        Ok(db.mark_all_read(viewer)?)
    })
    .await?;

    Ok(Json(MarkAllRead { success: true, marked }))
}

pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<UnreadCount>> {
    let count = blocking(&state, move |db| {
        let viewer = user.viewer(db)?;
        Ok(db.count_unread(viewer)?)
    })
    .await?;

    Ok(Json(UnreadCount { count }))
}
