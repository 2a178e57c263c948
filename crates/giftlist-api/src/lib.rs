pub mod auth;
pub mod error;
pub mod feed;
pub mod middleware;
pub mod notifications;
pub mod presents;
pub mod recipients;
pub mod state;

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, post, put},
};

use giftlist_types::api::VersionResponse;

pub use error::{ApiError, ApiResult};
pub use state::{AppState, AppStateInner};

/// All `/api` routes. Everything except auth and version needs a session.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/auth", get(auth::status))
        .route("/api/version", get(version));

    let protected_routes = Router::new()
        .route(
            "/api/recipients",
            get(recipients::list_recipients).post(recipients::create_recipient),
        )
        .route(
            "/api/recipients/{id}",
            get(recipients::get_recipient)
                .put(recipients::update_recipient)
                .delete(recipients::delete_recipient),
        )
        .route(
            "/api/recipients/{id}/identify",
            post(recipients::identify).delete(recipients::unidentify),
        )
        .route(
            "/api/recipients/{id}/profile-picture",
            post(recipients::upload_picture)
                .get(recipients::get_picture)
                // Let oversized uploads reach the handler so it can answer 413 itself.
                .layer(DefaultBodyLimit::max(recipients::MAX_PICTURE_SIZE + 1024 * 1024)),
        )
        .route(
            "/api/presents",
            get(presents::list_presents).post(presents::create_present),
        )
        .route("/api/presents/all", get(presents::list_all_presents))
        .route(
            "/api/presents/{id}",
            put(presents::update_present).delete(presents::delete_present),
        )
        .route("/api/presents/{id}/check", put(presents::check_present))
        .route(
            "/api/presents/{id}/reserve",
            post(presents::reserve_present).delete(presents::unreserve_present),
        )
        .route("/api/updates", get(feed::get_updates))
        .route("/api/recipients-hash", get(feed::recipients_hash))
        .route("/api/notifications", get(notifications::list_notifications))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/notifications/unread-count", get(notifications::unread_count))
        .route("/api/notifications/{id}/read", post(notifications::mark_read))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn version() -> Json<VersionResponse> {
    Json(VersionResponse {
        name: "giftlist".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
