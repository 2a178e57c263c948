use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use giftlist_db::GiftStore;
use giftlist_db::models::{ClaimOutcome, PresentRow, ReleaseOutcome, WriteOutcome};
use giftlist_types::api::{CheckRequest, CreatePresentRequest, PresentQuery, SuccessResponse, UpdatePresentRequest};
use giftlist_types::events::NotificationKind;
use giftlist_types::models::{Id, Present, PresentDetails};

use crate::error::{ApiError, ApiResult, PRESENT_NOT_FOUND, RECIPIENT_NOT_FOUND};
use crate::feed;
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking};

const MAX_TITLE_LEN: usize = 200;
const MAX_COMMENTS_LEN: usize = 2000;

fn validate_title(title: &str) -> ApiResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Nazwa prezentu nie może być pusta"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(ApiError::BadRequest("Nazwa prezentu jest za długa"));
    }
    Ok(title.to_string())
}

fn normalize_comments(comments: Option<String>) -> ApiResult<Option<String>> {
    let Some(comments) = comments else {
        return Ok(None);
    };
    let comments = comments.trim();
    if comments.chars().count() > MAX_COMMENTS_LEN {
        return Err(ApiError::BadRequest("Komentarz jest za długi"));
    }
    Ok((!comments.is_empty()).then(|| comments.to_string()))
}

/// Load a present the caller is allowed to see. Gifts for the caller's own
/// recipient that someone else added do not exist as far as they know.
fn visible_present(db: &dyn GiftStore, id: Id, user: &CurrentUser) -> ApiResult<PresentRow> {
    let present = db.get_present(id)?.ok_or(PRESENT_NOT_FOUND)?;
    let viewer = user.viewer(db)?;
    if viewer.own_recipient == Some(present.recipient_id) && present.created_by != Some(user.id) {
        return Err(PRESENT_NOT_FOUND);
    }
    Ok(present)
}

/// Only the author may edit or delete a present. Presents without a
/// recorded author are open to everybody.
fn owned_present(db: &dyn GiftStore, id: Id, user: &CurrentUser) -> ApiResult<PresentRow> {
    let present = visible_present(db, id, user)?;
    match present.created_by {
        Some(author) if author != user.id => Err(ApiError::Forbidden(
            "Możesz zmieniać tylko prezenty dodane przez siebie",
        )),
        _ => Ok(present),
    }
}

fn record_present(db: &dyn GiftStore, user_id: Id, kind: NotificationKind, present: &PresentRow) -> ApiResult<()> {
    let payload = feed::present_payload(db, present)?;
    feed::record(db, user_id, kind, payload);
    Ok(())
}

/// GET /api/presents — presents visible to the caller, optionally for one
/// recipient. Gifts for the caller's own recipient are left out.
pub async fn list_presents(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Query(query): Query<PresentQuery>,
) -> ApiResult<Json<Vec<Present>>> {
    let presents = blocking(&state, move |db| {
        let viewer = user.viewer(db)?;
        Ok(db
            .list_presents(viewer, query.recipient_id)?
            .into_iter()
            .map(Present::from)
            .collect())
    })
    .await?;

    Ok(Json(presents))
}

/// GET /api/presents/all — the visible presents joined with display names.
pub async fn list_all_presents(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<PresentDetails>>> {
    let presents = blocking(&state, move |db| {
        let viewer = user.viewer(db)?;
        Ok(db
            .list_present_details(viewer)?
            .into_iter()
            .map(PresentDetails::from)
            .collect())
    })
    .await?;

    Ok(Json(presents))
}

pub async fn create_present(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<CreatePresentRequest>,
) -> ApiResult<impl IntoResponse> {
    let title = validate_title(&req.title)?;
    let comments = normalize_comments(req.comments)?;
    let recipient_id = req.recipient_id;

    let present = blocking(&state, move |db| {
        let row = match db.create_present(&title, comments.as_deref(), recipient_id, user.id)? {
            WriteOutcome::Done(row) => row,
            WriteOutcome::NotFound | WriteOutcome::Duplicate => return Err(RECIPIENT_NOT_FOUND),
        };

        record_present(db, user.id, NotificationKind::PresentAdded, &row)?;
        info!("{} added present {} (id {}) for recipient {}", user.username, row.title, row.id, row.recipient_id);
        Ok(Present::from(row))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(present)))
}

pub async fn update_present(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<UpdatePresentRequest>,
) -> ApiResult<Json<Present>> {
    let title = validate_title(&req.title)?;
    let comments = normalize_comments(req.comments)?;
    let recipient_id = req.recipient_id;

    let present = blocking(&state, move |db| {
        owned_present(db, id, &user)?;

        let row = match db.update_present(id, &title, comments.as_deref(), recipient_id)? {
            WriteOutcome::Done(row) => row,
            // The present itself was just loaded, so a miss means the target recipient.
            WriteOutcome::NotFound | WriteOutcome::Duplicate => return Err(RECIPIENT_NOT_FOUND),
        };

        record_present(db, user.id, NotificationKind::PresentUpdated, &row)?;
        Ok(Present::from(row))
    })
    .await?;

    Ok(Json(present))
}

/// PUT /api/presents/{id}/check — set the bought flag, or toggle it when the
/// body is empty or carries no `is_checked`.
pub async fn check_present(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
    body: Bytes,
) -> ApiResult<Json<Present>> {
    let req: CheckRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CheckRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|_| ApiError::BadRequest("Nieprawidłowe dane"))?
    };

    let present = blocking(&state, move |db| {
        visible_present(db, id, &user)?;
        let row = db.set_checked(id, req.is_checked)?.ok_or(PRESENT_NOT_FOUND)?;

        let kind = if row.is_checked {
            NotificationKind::PresentChecked
        } else {
            NotificationKind::PresentUnchecked
        };
        record_present(db, user.id, kind, &row)?;
        Ok(Present::from(row))
    })
    .await?;

    Ok(Json(present))
}

pub async fn delete_present(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<SuccessResponse>> {
    blocking(&state, move |db| {
        let present = owned_present(db, id, &user)?;
        // Resolve the payload first: the recipient name is still needed after the row is gone.
        let payload = feed::present_payload(db, &present)?;

        if !db.delete_present(id)? {
            return Err(PRESENT_NOT_FOUND);
        }
        feed::record(db, user.id, NotificationKind::PresentDeleted, payload);
        Ok(())
    })
    .await?;

    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/presents/{id}/reserve — exclusive per present.
pub async fn reserve_present(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Present>> {
    let present = blocking(&state, move |db| {
        visible_present(db, id, &user)?;
        let outcome = db.reserve_present(id, user.id)?;
        match outcome {
            ClaimOutcome::Claimed | ClaimOutcome::AlreadyHeld => {}
            ClaimOutcome::HeldByOther(_) => {
                return Err(ApiError::Conflict("Prezent jest już zarezerwowany przez kogoś innego"));
            }
            ClaimOutcome::NotFound => return Err(PRESENT_NOT_FOUND),
        }

        let row = db.get_present(id)?.ok_or(PRESENT_NOT_FOUND)?;
        if outcome == ClaimOutcome::Claimed {
            record_present(db, user.id, NotificationKind::PresentReserved, &row)?;
        }
        Ok(Present::from(row))
    })
    .await?;

    Ok(Json(present))
}

/// DELETE /api/presents/{id}/reserve — only the reserver can cancel.
pub async fn unreserve_present(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Present>> {
    let present = blocking(&state, move |db| {
        visible_present(db, id, &user)?;
        let outcome = db.unreserve_present(id, user.id)?;
        match outcome {
            ReleaseOutcome::Released | ReleaseOutcome::NotHeld => {}
            ReleaseOutcome::HeldByOther(_) => {
                return Err(ApiError::Forbidden("Tylko osoba, która zarezerwowała prezent, może anulować rezerwację"));
            }
            ReleaseOutcome::NotFound => return Err(PRESENT_NOT_FOUND),
        }

        let row = db.get_present(id)?.ok_or(PRESENT_NOT_FOUND)?;
        if outcome == ReleaseOutcome::Released {
            record_present(db, user.id, NotificationKind::PresentUnreserved, &row)?;
        }
        Ok(Present::from(row))
    })
    .await?;

    Ok(Json(present))
}
