use anyhow::Result;
use rusqlite::{Connection, Row, types::Type};

use giftlist_types::events::{NotificationKind, NotificationPayload};
use giftlist_types::models::Id;

use crate::models::{NotificationRow, Viewer};

/// Everything is visible except other people's actions on presents for the
/// viewer's own recipient. Binds ?1 = user id, ?2 = identified recipient id.
const VISIBLE_TO_VIEWER: &str = "NOT (?2 IS NOT NULL
          AND COALESCE(n.gift_for, -1) = ?2
          AND COALESCE(n.actor_id, -1) != ?1)";

const NOTIFICATION_SELECT: &str = "
    SELECT n.id, n.kind, n.actor_id, u.username, n.payload, n.created_at,
           EXISTS(SELECT 1 FROM notification_reads r WHERE r.notification_id = n.id AND r.user_id = ?1)
    FROM notifications n
    LEFT JOIN users u ON u.id = n.actor_id";

fn map_notification(row: &Row<'_>) -> rusqlite::Result<NotificationRow> {
    let kind: String = row.get(1)?;
    let kind = kind
        .parse::<NotificationKind>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    let payload: String = row.get(4)?;
    let payload: NotificationPayload = serde_json::from_str(&payload)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(NotificationRow {
        id: row.get(0)?,
        kind,
        actor_id: row.get(2)?,
        actor_username: row.get(3)?,
        payload,
        created_at: row.get(5)?,
        is_read: row.get(6)?,
    })
}

/// Append to the feed. `created_at` is forced strictly above the newest
/// existing row so timestamps double as a total order for `since` cursors.
pub(crate) fn insert_notification(
    conn: &Connection,
    kind: NotificationKind,
    actor_id: Option<Id>,
    payload: &NotificationPayload,
    now_ms: i64,
) -> Result<Id> {
    let payload_json = serde_json::to_string(payload)?;
    let gift_for = if kind.is_present_event() { payload.recipient_id } else { None };
    conn.execute(
        "INSERT INTO notifications (kind, actor_id, gift_for, payload, created_at)
         VALUES (?1, ?2, ?3, ?4,
                 MAX(?5, COALESCE((SELECT MAX(created_at) FROM notifications), 0) + 1))",
        rusqlite::params![kind.as_str(), actor_id, gift_for, payload_json, now_ms],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Oldest first, strictly after `since`.
pub(crate) fn notifications_since(
    conn: &Connection,
    viewer: Viewer,
    since: i64,
    limit: u32,
) -> Result<Vec<NotificationRow>> {
    let sql = format!(
        "{NOTIFICATION_SELECT}
         WHERE n.created_at > ?3 AND {VISIBLE_TO_VIEWER}
         ORDER BY n.created_at, n.id
         LIMIT ?4"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params![viewer.user_id, viewer.own_recipient, since, limit as i64],
            map_notification,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn latest_timestamp(conn: &Connection, viewer: Viewer) -> Result<Option<i64>> {
    let sql = format!("SELECT MAX(n.created_at) FROM notifications n WHERE {VISIBLE_TO_VIEWER}");
    let latest = conn.query_row(
        &sql,
        rusqlite::params![viewer.user_id, viewer.own_recipient],
        |row| row.get(0),
    )?;
    Ok(latest)
}

/// Newest first.
pub(crate) fn list_notifications(
    conn: &Connection,
    viewer: Viewer,
    limit: u32,
    offset: u32,
) -> Result<Vec<NotificationRow>> {
    let sql = format!(
        "{NOTIFICATION_SELECT}
         WHERE {VISIBLE_TO_VIEWER}
         ORDER BY n.created_at DESC, n.id DESC
         LIMIT ?3 OFFSET ?4"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params![viewer.user_id, viewer.own_recipient, limit as i64, offset as i64],
            map_notification,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn count_notifications(conn: &Connection, viewer: Viewer) -> Result<u64> {
    let sql = format!("SELECT COUNT(*) FROM notifications n WHERE {VISIBLE_TO_VIEWER}");
    let count: i64 = conn.query_row(
        &sql,
        rusqlite::params![viewer.user_id, viewer.own_recipient],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

pub(crate) fn count_unread(conn: &Connection, viewer: Viewer) -> Result<u64> {
    let sql = format!(
        "SELECT COUNT(*) FROM notifications n
         WHERE {VISIBLE_TO_VIEWER}
           AND NOT EXISTS(SELECT 1 FROM notification_reads r
                          WHERE r.notification_id = n.id AND r.user_id = ?1)"
    );
    let count: i64 = conn.query_row(
        &sql,
        rusqlite::params![viewer.user_id, viewer.own_recipient],
        |row| row.get(0),
    )?;
    Ok(count as u64)
}

/// Returns false when the notification does not exist for this viewer.
pub(crate) fn mark_read(conn: &Connection, viewer: Viewer, id: Id) -> Result<bool> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM notifications n WHERE n.id = ?3 AND {VISIBLE_TO_VIEWER})");
    let exists: bool = conn.query_row(
        &sql,
        rusqlite::params![viewer.user_id, viewer.own_recipient, id],
        |row| row.get(0),
    )?;
    if !exists {
        return Ok(false);
    }

    conn.execute(
        "INSERT OR IGNORE INTO notification_reads (notification_id, user_id) VALUES (?1, ?2)",
        rusqlite::params![id, viewer.user_id],
    )?;
    Ok(true)
}

/// Returns how many notifications changed from unread to read.
pub(crate) fn mark_all_read(conn: &Connection, viewer: Viewer) -> Result<u64> {
    let sql = format!(
        "INSERT OR IGNORE INTO notification_reads (notification_id, user_id)
         SELECT n.id, ?1 FROM notifications n WHERE {VISIBLE_TO_VIEWER}"
    );
    let marked = conn.execute(&sql, rusqlite::params![viewer.user_id, viewer.own_recipient])?;
    Ok(marked as u64)
}
