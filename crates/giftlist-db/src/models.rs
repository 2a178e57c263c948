//! Database row types. These map directly to SQLite rows; conversions into
//! the wire models live next to them.

use giftlist_types::events::{NotificationKind, NotificationPayload, Update, render_message};
use giftlist_types::models::{Id, Present, PresentDetails, Recipient};

pub struct UserRow {
    pub id: Id,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

pub struct SessionRow {
    pub id: String,
    pub user_id: Id,
    pub username: String,
    /// Unix epoch milliseconds.
    pub expires_at: i64,
}

pub struct RecipientRow {
    pub id: Id,
    pub name: String,
    pub identified_by: Option<Id>,
    pub identified_by_username: Option<String>,
    pub has_picture: bool,
    pub picture_url: Option<String>,
    pub present_count: u32,
    pub checked_count: u32,
    pub reserved_count: u32,
    pub created_at: String,
}

impl RecipientRow {
    /// Wire model as seen by `viewer`.
    pub fn into_model(self, viewer: Id) -> Recipient {
        Recipient {
            is_me: self.identified_by == Some(viewer),
            id: self.id,
            name: self.name,
            identified_by: self.identified_by,
            identified_by_username: self.identified_by_username,
            has_picture: self.has_picture,
            picture_url: self.picture_url,
            present_count: self.present_count,
            checked_count: self.checked_count,
            reserved_count: self.reserved_count,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PresentRow {
    pub id: Id,
    pub title: String,
    pub comments: Option<String>,
    pub recipient_id: Id,
    pub is_checked: bool,
    pub reserved_by: Option<Id>,
    pub created_by: Option<Id>,
    pub created_at: String,
}

impl From<PresentRow> for Present {
    fn from(row: PresentRow) -> Self {
        Present {
            id: row.id,
            title: row.title,
            comments: row.comments,
            recipient_id: row.recipient_id,
            is_checked: row.is_checked,
            reserved_by: row.reserved_by,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

pub struct PresentDetailsRow {
    pub present: PresentRow,
    pub recipient_name: String,
    pub reserved_by_username: Option<String>,
    pub created_by_username: Option<String>,
}

impl From<PresentDetailsRow> for PresentDetails {
    fn from(row: PresentDetailsRow) -> Self {
        PresentDetails {
            present: row.present.into(),
            recipient_name: row.recipient_name,
            reserved_by_username: row.reserved_by_username,
            created_by_username: row.created_by_username,
        }
    }
}

/// Stored profile picture. Either an external URL or an uploaded blob.
pub enum Picture {
    Url(String),
    Data { mime: String, bytes: Vec<u8> },
}

pub struct NotificationRow {
    pub id: Id,
    pub kind: NotificationKind,
    pub actor_id: Option<Id>,
    pub actor_username: Option<String>,
    pub payload: NotificationPayload,
    pub created_at: i64,
    /// Read state for the requesting user.
    pub is_read: bool,
}

impl From<NotificationRow> for Update {
    fn from(row: NotificationRow) -> Self {
        let message = render_message(row.kind, row.actor_username.as_deref(), &row.payload);
        Update {
            id: row.id,
            kind: row.kind,
            actor_id: row.actor_id,
            actor_username: row.actor_username,
            payload: row.payload,
            message,
            created_at: row.created_at,
        }
    }
}

/// Who is asking. Presents of `own_recipient` are hidden from this user
/// unless they created them, and so are feed entries about those presents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: Id,
    pub own_recipient: Option<Id>,
}

/// Result of an insert or update that can collide with a unique constraint.
#[derive(Debug)]
pub enum WriteOutcome<T> {
    Done(T),
    Duplicate,
    NotFound,
}

/// Result of taking an exclusive claim (reservation or identification).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    AlreadyHeld,
    HeldByOther(Id),
    NotFound,
}

/// Result of giving an exclusive claim back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    NotHeld,
    HeldByOther(Id),
    NotFound,
}
