use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use giftlist_db::GiftStore;
use giftlist_db::models::Viewer;
use giftlist_types::models::Id;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, blocking, now_ms};

pub const SESSION_COOKIE: &str = "giftlist_session";

/// The authenticated caller, inserted into request extensions by `require_auth`.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Id,
    pub username: String,
    pub session_id: String,
}

impl CurrentUser {
    /// Resolve which recipient (if any) this user identifies as.
    pub(crate) fn viewer(&self, db: &dyn GiftStore) -> anyhow::Result<Viewer> {
        Ok(Viewer {
            user_id: self.id,
            own_recipient: db.identified_recipient(self.id)?,
        })
    }
}

/// Look up the live session named by the cookie, if any.
pub(crate) async fn session_user(state: &AppState, jar: &CookieJar) -> ApiResult<Option<CurrentUser>> {
    let Some(session_id) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
        return Ok(None);
    };

    blocking(state, move |db| {
        let session = db.get_session(&session_id, now_ms())?;
        Ok(session.map(|s| CurrentUser {
            id: s.user_id,
            username: s.username,
            session_id: s.id,
        }))
    })
    .await
}

/// Reject requests without a live session cookie.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = session_user(&state, &jar).await?.ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}
