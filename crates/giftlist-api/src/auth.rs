use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tracing::{info, warn};
use uuid::Uuid;

use giftlist_db::GiftStore;
use giftlist_db::models::{ClaimOutcome, UserRow, WriteOutcome};
use giftlist_types::api::{AuthResponse, AuthStatus, LoginRequest, RegisterRequest, SuccessResponse, UserInfo};
use giftlist_types::events::{NotificationKind, NotificationPayload};

use crate::error::{ApiError, ApiResult};
use crate::feed;
use crate::middleware::{SESSION_COOKIE, session_user};
use crate::state::{AppState, blocking};

fn validate_credentials(username: &str, password: &str) -> ApiResult<()> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ApiError::BadRequest("Nazwa użytkownika musi mieć od 3 do 32 znaków"));
    }
    if password.chars().count() < 8 {
        return Err(ApiError::BadRequest("Hasło musi mieć co najmniej 8 znaków"));
    }
    Ok(())
}

fn start_session(state: &AppState, db: &dyn GiftStore, user: &UserRow) -> anyhow::Result<String> {
    let session_id = Uuid::new_v4().simple().to_string();
    let expires_at = (chrono::Utc::now() + state.session_ttl).timestamp_millis();
    db.create_session(&session_id, user.id, &user.username, expires_at)?;
    Ok(session_id)
}

fn session_cookie(state: &AppState, session_id: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, session_id))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.cookie_secure)
        .build()
}

/// Claim the unclaimed recipient whose name equals the username, if any.
fn auto_identify(db: &dyn GiftStore, user: &UserRow) -> anyhow::Result<Option<i64>> {
    let Some(recipient) = db.find_recipient_by_name(&user.username)? else {
        return Ok(None);
    };
    if recipient.identified_by.is_some() {
        return Ok(None);
    }

    match db.claim_recipient(recipient.id, user.id)? {
        ClaimOutcome::Claimed => {
            feed::record(
                db,
                user.id,
                NotificationKind::RecipientIdentified,
                NotificationPayload::recipient(recipient.id, &recipient.name),
            );
            Ok(Some(recipient.id))
        }
        _ => Ok(None),
    }
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, CookieJar, Json<AuthResponse>)> {
    let username = req.username.trim().to_string();
    validate_credentials(&username, &req.password)?;

    let st = state.clone();
    let (user, identified, session_id) = blocking(&state, move |db| {
        // Hash password with Argon2id
        let salt = SaltString::generate(&mut OsRng);
        let password_hash = Argon2::default()
            .hash_password(req.password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
            .to_string();

        let user = match db.create_user(&username, &password_hash)? {
            WriteOutcome::Done(user) => user,
            WriteOutcome::Duplicate | WriteOutcome::NotFound => {
                return Err(ApiError::Conflict("Nazwa użytkownika jest już zajęta"));
            }
        };

        let identified = auto_identify(db, &user)?;
        let session_id = start_session(&st, db, &user)?;
        Ok((user, identified, session_id))
    })
    .await?;

    info!("Registered user {} (id {})", user.username, user.id);

    Ok((
        StatusCode::CREATED,
        jar.add(session_cookie(&state, session_id)),
        Json(AuthResponse {
            success: true,
            user: UserInfo {
                id: user.id,
                username: user.username,
                identified_recipient_id: identified,
            },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(CookieJar, Json<AuthResponse>)> {
    let st = state.clone();
    let (user, identified, session_id) = blocking(&state, move |db| {
        let user = db
            .get_user_by_username(req.username.trim())?
            .ok_or(ApiError::InvalidCredentials)?;

        // Verify password
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|e| anyhow::anyhow!("stored hash for user {} is corrupt: {}", user.id, e))?;
        Argon2::default()
            .verify_password(req.password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::InvalidCredentials)?;

        let identified = db.identified_recipient(user.id)?;
        let session_id = start_session(&st, db, &user)?;
        Ok((user, identified, session_id))
    })
    .await
    .inspect_err(|e| {
        if matches!(e, ApiError::InvalidCredentials) {
            warn!("Failed login attempt");
        }
    })?;

    Ok((
        jar.add(session_cookie(&state, session_id)),
        Json(AuthResponse {
            success: true,
            user: UserInfo {
                id: user.id,
                username: user.username,
                identified_recipient_id: identified,
            },
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<SuccessResponse>)> {
    if let Some(session_id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) {
        blocking(&state, move |db| Ok(db.delete_session(&session_id)?)).await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    Ok((jar, Json(SuccessResponse::ok())))
}

pub async fn status(State(state): State<AppState>, jar: CookieJar) -> ApiResult<Json<AuthStatus>> {
    let Some(user) = session_user(&state, &jar).await? else {
        return Ok(Json(AuthStatus {
            authenticated: false,
            user: None,
        }));
    };

    let user_id = user.id;
    let identified = blocking(&state, move |db| Ok(db.identified_recipient(user_id)?)).await?;

    Ok(Json(AuthStatus {
        authenticated: true,
        user: Some(UserInfo {
            id: user.id,
            username: user.username,
            identified_recipient_id: identified,
        }),
    }))
}
