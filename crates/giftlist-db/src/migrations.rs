use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE sessions (
                id          TEXT PRIMARY KEY,
                user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                username    TEXT NOT NULL,
                expires_at  INTEGER NOT NULL
            );

            CREATE INDEX idx_sessions_expiry ON sessions(expires_at);

            CREATE TABLE recipients (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                name            TEXT NOT NULL UNIQUE COLLATE NOCASE,
                identified_by   INTEGER UNIQUE REFERENCES users(id) ON DELETE SET NULL,
                picture_url     TEXT,
                picture_data    BLOB,
                picture_mime    TEXT,
                created_by      INTEGER REFERENCES users(id) ON DELETE SET NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE presents (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                title           TEXT NOT NULL,
                comments        TEXT,
                recipient_id    INTEGER NOT NULL REFERENCES recipients(id) ON DELETE CASCADE,
                is_checked      INTEGER NOT NULL DEFAULT 0,
                reserved_by     INTEGER REFERENCES users(id) ON DELETE SET NULL,
                created_by      INTEGER REFERENCES users(id) ON DELETE SET NULL,
                created_at      TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_presents_recipient ON presents(recipient_id);

            -- gift_for is the recipient of a present event, copied out of the
            -- payload so the feed can be filtered per viewer without parsing JSON.
            CREATE TABLE notifications (
                id              INTEGER PRIMARY KEY AUTOINCREMENT,
                kind            TEXT NOT NULL,
                actor_id        INTEGER REFERENCES users(id) ON DELETE SET NULL,
                gift_for        INTEGER,
                payload         TEXT NOT NULL,
                created_at      INTEGER NOT NULL
            );

            CREATE INDEX idx_notifications_created ON notifications(created_at, id);

            CREATE TABLE notification_reads (
                notification_id INTEGER NOT NULL REFERENCES notifications(id) ON DELETE CASCADE,
                user_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                PRIMARY KEY (notification_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
