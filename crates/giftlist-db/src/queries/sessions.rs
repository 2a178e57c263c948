use anyhow::Result;
use rusqlite::{Connection, OptionalExtension};

use giftlist_types::models::Id;

use crate::models::SessionRow;

pub(crate) fn create_session(
    conn: &Connection,
    id: &str,
    user_id: Id,
    username: &str,
    expires_at: i64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO sessions (id, user_id, username, expires_at) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![id, user_id, username, expires_at],
    )?;
    Ok(())
}

/// Only returns sessions that have not expired at `now`.
pub(crate) fn live_session(conn: &Connection, id: &str, now: i64) -> Result<Option<SessionRow>> {
    let row = conn
        .query_row(
            "SELECT id, user_id, username, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
            rusqlite::params![id, now],
            |row| {
                Ok(SessionRow {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    username: row.get(2)?,
                    expires_at: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}

pub(crate) fn delete_session(conn: &Connection, id: &str) -> Result<()> {
    conn.execute("DELETE FROM sessions WHERE id = ?1", [id])?;
    Ok(())
}

pub(crate) fn delete_expired_sessions(conn: &Connection, now: i64) -> Result<usize> {
    let removed = conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", [now])?;
    Ok(removed)
}
