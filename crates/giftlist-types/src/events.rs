use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::Id;

/// Kinds of recorded user actions in the notification feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    RecipientAdded,
    RecipientUpdated,
    RecipientDeleted,
    RecipientIdentified,
    RecipientUnidentified,
    PresentAdded,
    PresentUpdated,
    PresentDeleted,
    PresentReserved,
    PresentUnreserved,
    PresentChecked,
    PresentUnchecked,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 12] = [
        Self::RecipientAdded,
        Self::RecipientUpdated,
        Self::RecipientDeleted,
        Self::RecipientIdentified,
        Self::RecipientUnidentified,
        Self::PresentAdded,
        Self::PresentUpdated,
        Self::PresentDeleted,
        Self::PresentReserved,
        Self::PresentUnreserved,
        Self::PresentChecked,
        Self::PresentUnchecked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RecipientAdded => "recipient_added",
            Self::RecipientUpdated => "recipient_updated",
            Self::RecipientDeleted => "recipient_deleted",
            Self::RecipientIdentified => "recipient_identified",
            Self::RecipientUnidentified => "recipient_unidentified",
            Self::PresentAdded => "present_added",
            Self::PresentUpdated => "present_updated",
            Self::PresentDeleted => "present_deleted",
            Self::PresentReserved => "present_reserved",
            Self::PresentUnreserved => "present_unreserved",
            Self::PresentChecked => "present_checked",
            Self::PresentUnchecked => "present_unchecked",
        }
    }

    /// Whether the event concerns a single present rather than a recipient.
    pub fn is_present_event(&self) -> bool {
        matches!(
            self,
            Self::PresentAdded
                | Self::PresentUpdated
                | Self::PresentDeleted
                | Self::PresentReserved
                | Self::PresentUnreserved
                | Self::PresentChecked
                | Self::PresentUnchecked
        )
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown notification kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for NotificationKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Entity references and display fields captured when the action happened.
/// Names are copied so the message still renders after the entity is gone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub present_id: Option<Id>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub present_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_name: Option<String>,
}

impl NotificationPayload {
    pub fn recipient(id: Id, name: &str) -> Self {
        Self {
            recipient_id: Some(id),
            recipient_name: Some(name.to_string()),
            ..Default::default()
        }
    }

    pub fn present(recipient_id: Id, recipient_name: &str, present_id: Id, title: &str) -> Self {
        Self {
            recipient_id: Some(recipient_id),
            recipient_name: Some(recipient_name.to_string()),
            present_id: Some(present_id),
            present_title: Some(title.to_string()),
            previous_name: None,
        }
    }
}

/// One entry of the change feed as delivered to polling clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub id: Id,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub actor_id: Option<Id>,
    pub actor_username: Option<String>,
    pub payload: NotificationPayload,
    pub message: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatesResponse {
    pub has_updates: bool,
    pub updates: Vec<Update>,
    /// Cursor to send as `since` on the next poll.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(flatten)]
    pub update: Update,
    pub is_read: bool,
}

/// Render the Polish one-line description shown in the feed.
pub fn render_message(
    kind: NotificationKind,
    actor: Option<&str>,
    payload: &NotificationPayload,
) -> String {
    let actor = actor.unwrap_or("Ktoś");
    let recipient = payload.recipient_name.as_deref().unwrap_or("?");
    let title = payload.present_title.as_deref().unwrap_or("?");

    match kind {
        NotificationKind::RecipientAdded => format!("{actor}: dodano osobę {recipient}"),
        NotificationKind::RecipientUpdated => match payload.previous_name.as_deref() {
            Some(prev) if prev != recipient => {
                format!("{actor}: zmieniono nazwę osoby {prev} na {recipient}")
            }
            _ => format!("{actor}: zaktualizowano osobę {recipient}"),
        },
        NotificationKind::RecipientDeleted => format!("{actor}: usunięto osobę {recipient}"),
        NotificationKind::RecipientIdentified => {
            format!("{actor}: zidentyfikowano się jako {recipient}")
        }
        NotificationKind::RecipientUnidentified => {
            format!("{actor}: cofnięto identyfikację jako {recipient}")
        }
        NotificationKind::PresentAdded => {
            format!("{actor}: dodano prezent „{title}” dla {recipient}")
        }
        NotificationKind::PresentUpdated => {
            format!("{actor}: zmieniono prezent „{title}” dla {recipient}")
        }
        NotificationKind::PresentDeleted => {
            format!("{actor}: usunięto prezent „{title}” dla {recipient}")
        }
        NotificationKind::PresentReserved => {
            format!("{actor}: zarezerwowano prezent „{title}” dla {recipient}")
        }
        NotificationKind::PresentUnreserved => {
            format!("{actor}: anulowano rezerwację prezentu „{title}” dla {recipient}")
        }
        NotificationKind::PresentChecked => {
            format!("{actor}: kupiono prezent „{title}” dla {recipient}")
        }
        NotificationKind::PresentUnchecked => {
            format!("{actor}: odznaczono prezent „{title}” dla {recipient}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_string_matches_serde_name() {
        for kind in NotificationKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
            assert_eq!(kind.as_str().parse::<NotificationKind>().unwrap(), kind);
        }
        assert!("present_exploded".parse::<NotificationKind>().is_err());
    }

    #[test]
    fn payload_omits_missing_fields() {
        let payload = NotificationPayload::recipient(4, "Anna");
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json, serde_json::json!({ "recipientId": 4, "recipientName": "Anna" }));
    }

    #[test]
    fn message_mentions_present_and_recipient() {
        let payload = NotificationPayload::present(1, "Anna", 7, "Książka");
        let msg = render_message(NotificationKind::PresentReserved, Some("Marek"), &payload);
        assert_eq!(msg, "Marek: zarezerwowano prezent „Książka” dla Anna");
    }

    #[test]
    fn rename_message_uses_previous_name() {
        let mut payload = NotificationPayload::recipient(1, "Ania");
        payload.previous_name = Some("Anna".into());
        let msg = render_message(NotificationKind::RecipientUpdated, None, &payload);
        assert_eq!(msg, "Ktoś: zmieniono nazwę osoby Anna na Ania");
    }

    #[test]
    fn update_uses_camel_case_and_type_tag() {
        let update = Update {
            id: 3,
            kind: NotificationKind::PresentChecked,
            actor_id: Some(2),
            actor_username: Some("Marek".into()),
            payload: NotificationPayload::default(),
            message: String::new(),
            created_at: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["type"], "present_checked");
        assert_eq!(json["actorUsername"], "Marek");
        assert_eq!(json["createdAt"], 1_700_000_000_000i64);
    }
}
