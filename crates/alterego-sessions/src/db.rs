use rusqlite::Connection;

use crate::error::Result;

/// Initialise the conversation and exchange tables.
///
/// Safe to call on every startup; uses `IF NOT EXISTS` throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS conversations (
            id          TEXT PRIMARY KEY,
            state       TEXT NOT NULL,
            active      INTEGER NOT NULL DEFAULT 0,
            win_count   INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS exchanges (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id  TEXT NOT NULL,
            message          TEXT NOT NULL,
            response         TEXT NOT NULL,
            kind             TEXT NOT NULL,
            timestamp        TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_exchanges_conversation
            ON exchanges(conversation_id, id DESC);",
    )?;
    Ok(())
}
