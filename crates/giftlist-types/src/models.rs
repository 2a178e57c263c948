use serde::{Deserialize, Serialize};

/// Row identifier used by every entity. SQLite rowids are 64-bit.
pub type Id = i64;

/// A person gifts are tracked for. At most one user may identify as them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: Id,
    pub name: String,
    pub identified_by: Option<Id>,
    pub identified_by_username: Option<String>,
    pub has_picture: bool,
    pub picture_url: Option<String>,
    /// Progress counters. These stay visible when the presents themselves
    /// are hidden from the identified user.
    pub present_count: u32,
    pub checked_count: u32,
    pub reserved_count: u32,
    /// True when the requesting user is the one identified as this recipient.
    #[serde(default)]
    pub is_me: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Present {
    pub id: Id,
    pub title: String,
    pub comments: Option<String>,
    pub recipient_id: Id,
    pub is_checked: bool,
    pub reserved_by: Option<Id>,
    pub created_by: Option<Id>,
    pub created_at: String,
}

/// A present joined with the display names the list view needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresentDetails {
    #[serde(flatten)]
    pub present: Present,
    pub recipient_name: String,
    pub reserved_by_username: Option<String>,
    pub created_by_username: Option<String>,
}
