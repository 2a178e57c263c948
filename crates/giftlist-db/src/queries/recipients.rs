use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row};

use giftlist_types::models::Id;

use super::is_unique_violation;
use crate::models::{ClaimOutcome, Picture, RecipientRow, ReleaseOutcome, WriteOutcome};

const RECIPIENT_SELECT: &str = "
    SELECT r.id, r.name, r.identified_by, u.username,
           (r.picture_data IS NOT NULL OR r.picture_url IS NOT NULL),
           r.picture_url,
           (SELECT COUNT(*) FROM presents p WHERE p.recipient_id = r.id),
           (SELECT COUNT(*) FROM presents p WHERE p.recipient_id = r.id AND p.is_checked = 1),
           (SELECT COUNT(*) FROM presents p WHERE p.recipient_id = r.id AND p.reserved_by IS NOT NULL),
           r.created_at
    FROM recipients r
    LEFT JOIN users u ON u.id = r.identified_by";

fn map_recipient(row: &Row<'_>) -> rusqlite::Result<RecipientRow> {
    Ok(RecipientRow {
        id: row.get(0)?,
        name: row.get(1)?,
        identified_by: row.get(2)?,
        identified_by_username: row.get(3)?,
        has_picture: row.get(4)?,
        picture_url: row.get(5)?,
        present_count: row.get::<_, i64>(6)? as u32,
        checked_count: row.get::<_, i64>(7)? as u32,
        reserved_count: row.get::<_, i64>(8)? as u32,
        created_at: row.get(9)?,
    })
}

pub(crate) fn list_recipients(conn: &Connection) -> Result<Vec<RecipientRow>> {
    let sql = format!("{RECIPIENT_SELECT} ORDER BY r.name COLLATE NOCASE, r.id");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], map_recipient)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn recipient_by_id(conn: &Connection, id: Id) -> Result<Option<RecipientRow>> {
    let sql = format!("{RECIPIENT_SELECT} WHERE r.id = ?1");
    let row = conn.query_row(&sql, [id], map_recipient).optional()?;
    Ok(row)
}

/// Case-insensitive exact match on the name.
pub(crate) fn recipient_by_name(conn: &Connection, name: &str) -> Result<Option<RecipientRow>> {
    let sql = format!("{RECIPIENT_SELECT} WHERE r.name = ?1 COLLATE NOCASE");
    let row = conn.query_row(&sql, [name], map_recipient).optional()?;
    Ok(row)
}

pub(crate) fn identified_recipient(conn: &Connection, user_id: Id) -> Result<Option<Id>> {
    let id = conn
        .query_row(
            "SELECT id FROM recipients WHERE identified_by = ?1",
            [user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub(crate) fn create_recipient(
    conn: &Connection,
    name: &str,
    created_by: Id,
) -> Result<WriteOutcome<RecipientRow>> {
    match conn.execute(
        "INSERT INTO recipients (name, created_by) VALUES (?1, ?2)",
        rusqlite::params![name, created_by],
    ) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Ok(WriteOutcome::Duplicate),
        Err(e) => return Err(e.into()),
    }

    let id = conn.last_insert_rowid();
    recipient_by_id(conn, id)?
        .map(WriteOutcome::Done)
        .ok_or_else(|| anyhow!("Recipient {} missing right after insert", id))
}

pub(crate) fn rename_recipient(
    conn: &Connection,
    id: Id,
    name: &str,
) -> Result<WriteOutcome<RecipientRow>> {
    let changed = match conn.execute(
        "UPDATE recipients SET name = ?2 WHERE id = ?1",
        rusqlite::params![id, name],
    ) {
        Ok(n) => n,
        Err(e) if is_unique_violation(&e) => return Ok(WriteOutcome::Duplicate),
        Err(e) => return Err(e.into()),
    };

    if changed == 0 {
        return Ok(WriteOutcome::NotFound);
    }
    Ok(recipient_by_id(conn, id)?.map_or(WriteOutcome::NotFound, WriteOutcome::Done))
}

/// Presents go with the recipient through the ON DELETE CASCADE.
pub(crate) fn delete_recipient(conn: &Connection, id: Id) -> Result<bool> {
    let removed = conn.execute("DELETE FROM recipients WHERE id = ?1", [id])?;
    Ok(removed > 0)
}

fn current_claim(conn: &Connection, id: Id) -> Result<Option<Option<Id>>> {
    let claim = conn
        .query_row(
            "SELECT identified_by FROM recipients WHERE id = ?1",
            [id],
            |row| row.get::<_, Option<Id>>(0),
        )
        .optional()?;
    Ok(claim)
}

/// Identify `user_id` as recipient `id`. A user holds at most one recipient,
/// so any previous claim by the same user is dropped in the same transaction.
pub(crate) fn claim_recipient(conn: &mut Connection, id: Id, user_id: Id) -> Result<ClaimOutcome> {
    let tx = conn.transaction()?;

    tx.execute(
        "UPDATE recipients SET identified_by = NULL WHERE identified_by = ?1 AND id != ?2",
        rusqlite::params![user_id, id],
    )?;
    let changed = tx.execute(
        "UPDATE recipients SET identified_by = ?1 WHERE id = ?2 AND identified_by IS NULL",
        rusqlite::params![user_id, id],
    )?;

    if changed == 1 {
        tx.commit()?;
        return Ok(ClaimOutcome::Claimed);
    }

    // Nothing changed: dropping `tx` rolls back the release above.
    match current_claim(&tx, id)? {
        None => Ok(ClaimOutcome::NotFound),
        Some(Some(holder)) if holder == user_id => {
            tx.commit()?;
            Ok(ClaimOutcome::AlreadyHeld)
        }
        Some(Some(holder)) => Ok(ClaimOutcome::HeldByOther(holder)),
        Some(None) => Err(anyhow!("Recipient {} unclaimed but update matched nothing", id)),
    }
}

pub(crate) fn release_recipient(conn: &Connection, id: Id, user_id: Id) -> Result<ReleaseOutcome> {
    let changed = conn.execute(
        "UPDATE recipients SET identified_by = NULL WHERE id = ?1 AND identified_by = ?2",
        rusqlite::params![id, user_id],
    )?;
    if changed == 1 {
        return Ok(ReleaseOutcome::Released);
    }

    Ok(match current_claim(conn, id)? {
        None => ReleaseOutcome::NotFound,
        Some(None) => ReleaseOutcome::NotHeld,
        Some(Some(holder)) => ReleaseOutcome::HeldByOther(holder),
    })
}

/// Store an uploaded image, replacing any previous URL.
pub(crate) fn set_picture_data(conn: &Connection, id: Id, mime: &str, bytes: &[u8]) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE recipients SET picture_data = ?2, picture_mime = ?3, picture_url = NULL WHERE id = ?1",
        rusqlite::params![id, bytes, mime],
    )?;
    Ok(changed > 0)
}

/// Point the picture at an external URL, dropping any uploaded blob.
pub(crate) fn set_picture_url(conn: &Connection, id: Id, url: &str) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE recipients SET picture_url = ?2, picture_data = NULL, picture_mime = NULL WHERE id = ?1",
        rusqlite::params![id, url],
    )?;
    Ok(changed > 0)
}

pub(crate) fn picture(conn: &Connection, id: Id) -> Result<Option<Picture>> {
    let row = conn
        .query_row(
            "SELECT picture_url, picture_data, picture_mime FROM recipients WHERE id = ?1",
            [id],
            |row| {
                Ok((
                    row.get::<_, Option<String>>(0)?,
                    row.get::<_, Option<Vec<u8>>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            },
        )
        .optional()?;

    Ok(match row {
        Some((_, Some(bytes), mime)) => Some(Picture::Data {
            mime: mime.unwrap_or_else(|| "application/octet-stream".to_string()),
            bytes,
        }),
        Some((Some(url), None, _)) => Some(Picture::Url(url)),
        _ => None,
    })
}
