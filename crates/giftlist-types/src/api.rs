use serde::{Deserialize, Serialize};

use crate::events::Notification;
use crate::models::Id;

// -- Auth --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Id,
    pub username: String,
    #[serde(default)]
    pub identified_recipient_id: Option<Id>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub success: bool,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserInfo>,
}

// -- Recipients --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecipientRequest {
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PictureUrlRequest {
    pub url: String,
}

// -- Presents --

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CreatePresentRequest {
    pub title: String,
    pub recipient_id: Id,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UpdatePresentRequest {
    pub title: String,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub recipient_id: Option<Id>,
}

/// Body of `PUT /api/presents/{id}/check`. An absent flag toggles.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CheckRequest {
    #[serde(default)]
    pub is_checked: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PresentQuery {
    pub recipient_id: Option<Id>,
}

// -- Feed --

#[derive(Debug, Deserialize)]
pub struct UpdatesQuery {
    /// Unix epoch milliseconds. Absent means "tell me where the feed is now".
    #[serde(default)]
    pub since: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationPage {
    pub notifications: Vec<Notification>,
    pub total: u64,
    pub unread: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UnreadCount {
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MarkAllRead {
    pub success: bool,
    pub marked: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHash {
    pub hash: String,
}

// -- Misc --

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionResponse {
    pub name: String,
    pub version: String,
}
