use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row};

use giftlist_types::models::Id;

use crate::models::{ClaimOutcome, PresentDetailsRow, PresentRow, ReleaseOutcome, Viewer, WriteOutcome};

const PRESENT_COLUMNS: &str =
    "p.id, p.title, p.comments, p.recipient_id, p.is_checked, p.reserved_by, p.created_by, p.created_at";

/// Hides the viewer's own gifts unless they added them. Binds ?1 = user id,
/// ?2 = identified recipient id (or NULL).
const VISIBLE_TO_VIEWER: &str = "(?2 IS NULL OR p.recipient_id != ?2 OR COALESCE(p.created_by, -1) = ?1)";

fn map_present(row: &Row<'_>) -> rusqlite::Result<PresentRow> {
    Ok(PresentRow {
        id: row.get(0)?,
        title: row.get(1)?,
        comments: row.get(2)?,
        recipient_id: row.get(3)?,
        is_checked: row.get(4)?,
        reserved_by: row.get(5)?,
        created_by: row.get(6)?,
        created_at: row.get(7)?,
    })
}

pub(crate) fn list_presents(
    conn: &Connection,
    viewer: Viewer,
    recipient_id: Option<Id>,
) -> Result<Vec<PresentRow>> {
    let sql = format!(
        "SELECT {PRESENT_COLUMNS} FROM presents p
         WHERE {VISIBLE_TO_VIEWER} AND (?3 IS NULL OR p.recipient_id = ?3)
         ORDER BY p.created_at, p.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::params![viewer.user_id, viewer.own_recipient, recipient_id],
            map_present,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn list_present_details(conn: &Connection, viewer: Viewer) -> Result<Vec<PresentDetailsRow>> {
    let sql = format!(
        "SELECT {PRESENT_COLUMNS}, r.name, ru.username, cu.username
         FROM presents p
         JOIN recipients r ON r.id = p.recipient_id
         LEFT JOIN users ru ON ru.id = p.reserved_by
         LEFT JOIN users cu ON cu.id = p.created_by
         WHERE {VISIBLE_TO_VIEWER}
         ORDER BY r.name COLLATE NOCASE, p.created_at, p.id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params![viewer.user_id, viewer.own_recipient], |row| {
            Ok(PresentDetailsRow {
                present: map_present(row)?,
                recipient_name: row.get(8)?,
                reserved_by_username: row.get(9)?,
                created_by_username: row.get(10)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn present_by_id(conn: &Connection, id: Id) -> Result<Option<PresentRow>> {
    let sql = format!("SELECT {PRESENT_COLUMNS} FROM presents p WHERE p.id = ?1");
    let row = conn.query_row(&sql, [id], map_present).optional()?;
    Ok(row)
}

fn recipient_exists(conn: &Connection, id: Id) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM recipients WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

pub(crate) fn create_present(
    conn: &Connection,
    title: &str,
    comments: Option<&str>,
    recipient_id: Id,
    created_by: Id,
) -> Result<WriteOutcome<PresentRow>> {
    if !recipient_exists(conn, recipient_id)? {
        return Ok(WriteOutcome::NotFound);
    }

    conn.execute(
        "INSERT INTO presents (title, comments, recipient_id, created_by) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![title, comments, recipient_id, created_by],
    )?;

    let id = conn.last_insert_rowid();
    present_by_id(conn, id)?
        .map(WriteOutcome::Done)
        .ok_or_else(|| anyhow!("Present {} missing right after insert", id))
}

/// `recipient_id = None` keeps the current recipient. A missing present or
/// target recipient yields `NotFound`.
pub(crate) fn update_present(
    conn: &Connection,
    id: Id,
    title: &str,
    comments: Option<&str>,
    recipient_id: Option<Id>,
) -> Result<WriteOutcome<PresentRow>> {
    if let Some(rid) = recipient_id {
        if !recipient_exists(conn, rid)? {
            return Ok(WriteOutcome::NotFound);
        }
    }

    let changed = conn.execute(
        "UPDATE presents SET title = ?2, comments = ?3, recipient_id = COALESCE(?4, recipient_id)
         WHERE id = ?1",
        rusqlite::params![id, title, comments, recipient_id],
    )?;
    if changed == 0 {
        return Ok(WriteOutcome::NotFound);
    }
    Ok(present_by_id(conn, id)?.map_or(WriteOutcome::NotFound, WriteOutcome::Done))
}

/// Set the bought flag, or flip it when `checked` is `None`.
pub(crate) fn set_checked(conn: &Connection, id: Id, checked: Option<bool>) -> Result<Option<PresentRow>> {
    let changed = conn.execute(
        "UPDATE presents SET is_checked = COALESCE(?2, 1 - is_checked) WHERE id = ?1",
        rusqlite::params![id, checked],
    )?;
    if changed == 0 {
        return Ok(None);
    }
    present_by_id(conn, id)
}

pub(crate) fn delete_present(conn: &Connection, id: Id) -> Result<bool> {
    let removed = conn.execute("DELETE FROM presents WHERE id = ?1", [id])?;
    Ok(removed > 0)
}

fn current_reserver(conn: &Connection, id: Id) -> Result<Option<Option<Id>>> {
    let reserver = conn
        .query_row(
            "SELECT reserved_by FROM presents WHERE id = ?1",
            [id],
            |row| row.get::<_, Option<Id>>(0),
        )
        .optional()?;
    Ok(reserver)
}

/// Compare-and-set on `reserved_by`: only succeeds while nobody holds it.
pub(crate) fn reserve_present(conn: &Connection, id: Id, user_id: Id) -> Result<ClaimOutcome> {
    let changed = conn.execute(
        "UPDATE presents SET reserved_by = ?2 WHERE id = ?1 AND reserved_by IS NULL",
        rusqlite::params![id, user_id],
    )?;
    if changed == 1 {
        return Ok(ClaimOutcome::Claimed);
    }

    match current_reserver(conn, id)? {
        None => Ok(ClaimOutcome::NotFound),
        Some(Some(holder)) if holder == user_id => Ok(ClaimOutcome::AlreadyHeld),
        Some(Some(holder)) => Ok(ClaimOutcome::HeldByOther(holder)),
        Some(None) => Err(anyhow!("Present {} unreserved but update matched nothing", id)),
    }
}

pub(crate) fn unreserve_present(conn: &Connection, id: Id, user_id: Id) -> Result<ReleaseOutcome> {
    let changed = conn.execute(
        "UPDATE presents SET reserved_by = NULL WHERE id = ?1 AND reserved_by = ?2",
        rusqlite::params![id, user_id],
    )?;
    if changed == 1 {
        return Ok(ReleaseOutcome::Released);
    }

    Ok(match current_reserver(conn, id)? {
        None => ReleaseOutcome::NotFound,
        Some(None) => ReleaseOutcome::NotHeld,
        Some(Some(holder)) => ReleaseOutcome::HeldByOther(holder),
    })
}
