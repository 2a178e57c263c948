use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use tracing::info;

use giftlist_db::GiftStore;
use giftlist_db::models::{ClaimOutcome, Picture, RecipientRow, ReleaseOutcome, WriteOutcome};
use giftlist_types::api::{PictureUrlRequest, RecipientRequest, SuccessResponse};
use giftlist_types::events::{NotificationKind, NotificationPayload};
use giftlist_types::models::{Id, Recipient};

use crate::error::{ApiError, ApiResult, RECIPIENT_NOT_FOUND};
use crate::feed;
use crate::middleware::CurrentUser;
use crate::state::{AppState, blocking};

/// 5 MB upload limit for profile pictures
pub const MAX_PICTURE_SIZE: usize = 5 * 1024 * 1024;

const MAX_NAME_LEN: usize = 100;

/// Raster formats only: an SVG served from our origin could carry script.
const PICTURE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

fn validate_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Imię nie może być puste"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::BadRequest("Imię jest za długie"));
    }
    Ok(name.to_string())
}

/// Load a recipient the caller may modify: missing → 404, identified by
/// somebody else → 403.
fn editable_recipient(db: &dyn GiftStore, id: Id, user_id: Id) -> ApiResult<RecipientRow> {
    let recipient = db.get_recipient(id)?.ok_or(RECIPIENT_NOT_FOUND)?;
    match recipient.identified_by {
        Some(holder) if holder != user_id => Err(ApiError::Forbidden(
            "Tę osobę może zmieniać tylko użytkownik, który się z nią zidentyfikował",
        )),
        _ => Ok(recipient),
    }
}

fn reload(db: &dyn GiftStore, id: Id, user_id: Id) -> ApiResult<Recipient> {
    Ok(db
        .get_recipient(id)?
        .ok_or(RECIPIENT_NOT_FOUND)?
        .into_model(user_id))
}

pub async fn list_recipients(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Vec<Recipient>>> {
    let recipients = blocking(&state, move |db| {
        Ok(db
            .list_recipients()?
            .into_iter()
            .map(|r| r.into_model(user.id))
            .collect())
    })
    .await?;

    Ok(Json(recipients))
}

pub async fn get_recipient(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Recipient>> {
    let recipient = blocking(&state, move |db| reload(db, id, user.id)).await?;
    Ok(Json(recipient))
}

pub async fn create_recipient(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<RecipientRequest>,
) -> ApiResult<impl IntoResponse> {
    let name = validate_name(&req.name)?;

    let recipient = blocking(&state, move |db| {
        let row = match db.create_recipient(&name, user.id)? {
            WriteOutcome::Done(row) => row,
            WriteOutcome::Duplicate | WriteOutcome::NotFound => {
                return Err(ApiError::Conflict("Osoba o tym imieniu już istnieje"));
            }
        };

        feed::record(
            db,
            user.id,
            NotificationKind::RecipientAdded,
            NotificationPayload::recipient(row.id, &row.name),
        );
        info!("{} added recipient {} (id {})", user.username, row.name, row.id);
        Ok(row.into_model(user.id))
    })
    .await?;

    Ok((StatusCode::CREATED, Json(recipient)))
}

pub async fn update_recipient(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<RecipientRequest>,
) -> ApiResult<Json<Recipient>> {
    let name = validate_name(&req.name)?;

    let recipient = blocking(&state, move |db| {
        let previous = editable_recipient(db, id, user.id)?;

        let row = match db.rename_recipient(id, &name)? {
            WriteOutcome::Done(row) => row,
            WriteOutcome::Duplicate => return Err(ApiError::Conflict("Osoba o tym imieniu już istnieje")),
            WriteOutcome::NotFound => return Err(RECIPIENT_NOT_FOUND),
        };

        let mut payload = NotificationPayload::recipient(row.id, &row.name);
        payload.previous_name = Some(previous.name);
        feed::record(db, user.id, NotificationKind::RecipientUpdated, payload);
        Ok(row.into_model(user.id))
    })
    .await?;

    Ok(Json(recipient))
}

pub async fn delete_recipient(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<SuccessResponse>> {
    blocking(&state, move |db| {
        let recipient = editable_recipient(db, id, user.id)?;
        if !db.delete_recipient(id)? {
            return Err(RECIPIENT_NOT_FOUND);
        }

        feed::record(
            db,
            user.id,
            NotificationKind::RecipientDeleted,
            NotificationPayload::recipient(id, &recipient.name),
        );
        info!("{} deleted recipient {} (id {})", user.username, recipient.name, id);
        Ok(())
    })
    .await?;

    Ok(Json(SuccessResponse::ok()))
}

/// POST /api/recipients/{id}/identify — claim to be this recipient.
pub async fn identify(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Recipient>> {
    let recipient = blocking(&state, move |db| {
        match db.claim_recipient(id, user.id)? {
            ClaimOutcome::Claimed => {
                let recipient = reload(db, id, user.id)?;
                feed::record(
                    db,
                    user.id,
                    NotificationKind::RecipientIdentified,
                    NotificationPayload::recipient(id, &recipient.name),
                );
                Ok(recipient)
            }
            ClaimOutcome::AlreadyHeld => reload(db, id, user.id),
            ClaimOutcome::HeldByOther(_) => Err(ApiError::Conflict(
                "Ta osoba jest już zidentyfikowana przez innego użytkownika",
            )),
            ClaimOutcome::NotFound => Err(RECIPIENT_NOT_FOUND),
        }
    })
    .await?;

    Ok(Json(recipient))
}

/// DELETE /api/recipients/{id}/identify — withdraw the claim.
pub async fn unidentify(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
) -> ApiResult<Json<Recipient>> {
    let recipient = blocking(&state, move |db| {
        match db.release_recipient(id, user.id)? {
            ReleaseOutcome::Released => {
                let recipient = reload(db, id, user.id)?;
                feed::record(
                    db,
                    user.id,
                    NotificationKind::RecipientUnidentified,
                    NotificationPayload::recipient(id, &recipient.name),
                );
                Ok(recipient)
            }
            ReleaseOutcome::NotHeld => reload(db, id, user.id),
            ReleaseOutcome::HeldByOther(_) => Err(ApiError::Forbidden(
                "Nie możesz cofnąć identyfikacji innego użytkownika",
            )),
            ReleaseOutcome::NotFound => Err(RECIPIENT_NOT_FOUND),
        }
    })
    .await?;

    Ok(Json(recipient))
}

enum PictureUpload {
    Url(String),
    Data { mime: String, bytes: Vec<u8> },
}

fn parse_picture(headers: &HeaderMap, body: &Bytes) -> ApiResult<PictureUpload> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if content_type == "application/json" {
        let req: PictureUrlRequest = serde_json::from_slice(body)
            .map_err(|_| ApiError::BadRequest("Nieprawidłowe dane zdjęcia"))?;
        let url = req.url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ApiError::BadRequest("Adres zdjęcia musi zaczynać się od http:// lub https://"));
        }
        return Ok(PictureUpload::Url(url.to_string()));
    }

    if !PICTURE_TYPES.contains(&content_type.as_str()) {
        return Err(ApiError::BadRequest("Zdjęcie musi być w formacie PNG, JPEG, GIF lub WebP"));
    }
    if body.is_empty() {
        return Err(ApiError::BadRequest("Plik zdjęcia jest pusty"));
    }
    if body.len() > MAX_PICTURE_SIZE {
        return Err(ApiError::PayloadTooLarge);
    }

    Ok(PictureUpload::Data {
        mime: content_type,
        bytes: body.to_vec(),
    })
}

/// POST /api/recipients/{id}/profile-picture — raw `image/*` bytes or a JSON
/// `{ "url": ... }` pointing at an external image.
pub async fn upload_picture(
    State(state): State<AppState>,
    Path(id): Path<Id>,
    Extension(user): Extension<CurrentUser>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<Json<Recipient>> {
    let body = body.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::PayloadTooLarge,
        _ => ApiError::BadRequest("Nie udało się odczytać przesłanego pliku"),
    })?;
    let upload = parse_picture(&headers, &body)?;

    let recipient = blocking(&state, move |db| {
        let row = editable_recipient(db, id, user.id)?;

        let stored = match &upload {
            PictureUpload::Url(url) => db.set_picture_url(id, url)?,
            PictureUpload::Data { mime, bytes } => db.set_picture_data(id, mime, bytes)?,
        };
        if !stored {
            return Err(RECIPIENT_NOT_FOUND);
        }

        feed::record(
            db,
            user.id,
            NotificationKind::RecipientUpdated,
            NotificationPayload::recipient(id, &row.name),
        );
        reload(db, id, user.id)
    })
    .await?;

    Ok(Json(recipient))
}

pub async fn get_picture(
    State(state): State<AppState>,
    Path(id): Path<Id>,
) -> ApiResult<Response> {
    let picture = blocking(&state, move |db| Ok(db.get_picture(id)?)).await?;

    match picture {
        Some(Picture::Data { mime, bytes }) => Ok((
            [
                (header::CONTENT_TYPE, mime),
                (header::X_CONTENT_TYPE_OPTIONS, "nosniff".to_string()),
                (header::CONTENT_SECURITY_POLICY, "sandbox".to_string()),
            ],
            bytes,
        )
            .into_response()),
        Some(Picture::Url(url)) => Ok(Redirect::temporary(&url).into_response()),
        None => Err(ApiError::NotFound("Brak zdjęcia")),
    }
}
