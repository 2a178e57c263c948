use anyhow::{Result, anyhow};
use rusqlite::{Connection, OptionalExtension, Row};

use giftlist_types::models::Id;

use super::is_unique_violation;
use crate::models::{UserRow, WriteOutcome};

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub(crate) fn create_user(
    conn: &Connection,
    username: &str,
    password_hash: &str,
) -> Result<WriteOutcome<UserRow>> {
    match conn.execute(
        "INSERT INTO users (username, password) VALUES (?1, ?2)",
        (username, password_hash),
    ) {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => return Ok(WriteOutcome::Duplicate),
        Err(e) => return Err(e.into()),
    }

    let id = conn.last_insert_rowid();
    user_by_id(conn, id)?
        .map(WriteOutcome::Done)
        .ok_or_else(|| anyhow!("User {} missing right after insert", id))
}

pub(crate) fn user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, username, password, created_at FROM users WHERE username = ?1",
            [username],
            map_user,
        )
        .optional()?;
    Ok(row)
}

pub(crate) fn user_by_id(conn: &Connection, id: Id) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            "SELECT id, username, password, created_at FROM users WHERE id = ?1",
            [id],
            map_user,
        )
        .optional()?;
    Ok(row)
}
