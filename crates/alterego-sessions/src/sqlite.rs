use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, instrument, warn};

use crate::db::init_db;
use crate::error::{Result, StoreError};
use crate::store::ConversationStore;
use crate::types::{ConversationState, Exchange, ExchangeKind, StoreTotals};

/// SQLite-backed store. State survives restarts.
///
/// Wraps a single connection in a `Mutex`; every operation is a short
/// statement or two, so one connection is enough for a single relay.
pub struct SqliteStore {
    db: Mutex<Connection>,
}

impl SqliteStore {
    /// Wrap an already-open connection, creating tables if needed.
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Open (or create) the database file, creating parent directories.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    warn!(path = %parent.display(), error = %e, "could not create database directory");
                }
            }
        }
        Self::new(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db.lock().map_err(|e| StoreError::Lock(e.to_string()))
    }
}

impl ConversationStore for SqliteStore {
    #[instrument(skip(self))]
    fn get_or_create(&self, id: &str) -> Result<ConversationState> {
        if let Some(state) = self.get(id)? {
            return Ok(state);
        }

        let state = ConversationState::new(id);
        let json = serde_json::to_string(&state)?;
        let now = state.created_at.to_rfc3339();
        let db = self.conn()?;
        db.execute(
            "INSERT OR IGNORE INTO conversations (id, state, active, win_count, created_at, updated_at)
             VALUES (?1, ?2, 0, 0, ?3, ?3)",
            params![id, json, now],
        )?;
        debug!("created conversation state");

        // Read back so a concurrent insert for the same id wins consistently.
        let stored: String = db.query_row(
            "SELECT state FROM conversations WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        Ok(serde_json::from_str(&stored)?)
    }

    #[instrument(skip(self))]
    fn get(&self, id: &str) -> Result<Option<ConversationState>> {
        let db = self.conn()?;
        let stored: Option<String> = db
            .query_row(
                "SELECT state FROM conversations WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        match stored {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, state), fields(id = %state.id))]
    fn save(&self, state: &ConversationState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        let db = self.conn()?;
        db.execute(
            "INSERT INTO conversations (id, state, active, win_count, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                 state      = excluded.state,
                 active     = excluded.active,
                 win_count  = excluded.win_count,
                 updated_at = excluded.updated_at",
            params![
                state.id,
                json,
                state.active,
                state.stats.win_count as i64,
                state.created_at.to_rfc3339(),
                state.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self, exchange), fields(id = %exchange.conversation_id, kind = exchange.kind.as_str()))]
    fn record_exchange(&self, exchange: &Exchange) -> Result<()> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO exchanges (conversation_id, message, response, kind, timestamp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                exchange.conversation_id,
                exchange.message,
                exchange.response,
                exchange.kind.as_str(),
                exchange.timestamp.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn recent_exchanges(&self, id: &str, limit: usize) -> Result<Vec<Exchange>> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT conversation_id, message, response, kind, timestamp
             FROM exchanges
             WHERE conversation_id = ?1
             ORDER BY id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![id, limit as i64], row_to_exchange)?;
        let mut out = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        out.reverse();
        Ok(out)
    }

    #[instrument(skip(self))]
    fn search_exchanges(&self, id: &str, topic: &str, limit: usize) -> Result<Vec<Exchange>> {
        // Matched in Rust so wildcards in `topic` stay literal and case folding
        // covers non-ASCII text.
        let needle = topic.to_lowercase();
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT conversation_id, message, response, kind, timestamp
             FROM exchanges
             WHERE conversation_id = ?1
             ORDER BY id DESC",
        )?;
        let mut hits = Vec::new();
        for row in stmt.query_map(params![id], row_to_exchange)? {
            let exchange = row?;
            if exchange.message.to_lowercase().contains(&needle)
                || exchange.response.to_lowercase().contains(&needle)
            {
                hits.push(exchange);
                if hits.len() >= limit {
                    break;
                }
            }
        }
        Ok(hits)
    }

    fn totals(&self) -> Result<StoreTotals> {
        let db = self.conn()?;
        let (users, wins): (i64, i64) = db.query_row(
            "SELECT COUNT(*), COALESCE(SUM(win_count), 0) FROM conversations",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let exchanges: i64 =
            db.query_row("SELECT COUNT(*) FROM exchanges", [], |row| row.get(0))?;
        Ok(StoreTotals {
            total_users: users as u64,
            total_exchanges: exchanges as u64,
            total_wins: wins as u64,
        })
    }

    fn ping(&self) -> Result<()> {
        let db = self.conn()?;
        db.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }
}

/// Map a SQLite row to an `Exchange`.
fn row_to_exchange(row: &rusqlite::Row<'_>) -> rusqlite::Result<Exchange> {
    let kind: String = row.get(3)?;
    let timestamp: String = row.get(4)?;
    Ok(Exchange {
        conversation_id: row.get(0)?,
        message: row.get(1)?,
        response: row.get(2)?,
        // Unknown kinds from a newer schema read back as plain completions.
        kind: ExchangeKind::parse(&kind).unwrap_or(ExchangeKind::Completion),
        timestamp: DateTime::parse_from_rfc3339(&timestamp)
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{GameKind, GameState, Turn};

    #[test]
    fn state_roundtrips_through_json_column() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut state = store.get_or_create("thread-1").unwrap();
        state.active = true;
        state.mood = Some("playful".into());
        state.push_turn(Turn::user("hey"), 10);
        state.game = Some(GameState {
            kind: GameKind::NumberGuess,
            prompt: "guess!".into(),
            expected_answer: "7".into(),
            remaining_attempts: 3,
        });
        store.save(&state).unwrap();

        let loaded = store.get("thread-1").unwrap().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn clear_persists_reset() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut state = store.get_or_create("t").unwrap();
        state.active = true;
        state.stats.record_win();
        store.save(&state).unwrap();

        store.clear("t").unwrap();
        let loaded = store.get("t").unwrap().unwrap();
        assert!(!loaded.active);
        assert_eq!(loaded.stats.win_count, 1);
        store.clear("unknown").unwrap();
    }

    #[test]
    fn exchange_log_queries() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (m, r) in [("first", "one"), ("talk about cats", "meow"), ("third", "three")] {
            store
                .record_exchange(&Exchange::new("u1", m, r, ExchangeKind::Completion))
                .unwrap();
        }
        store
            .record_exchange(&Exchange::new("u2", "cats", "yes", ExchangeKind::QuickReply))
            .unwrap();

        let recent = store.recent_exchanges("u1", 2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].message, "talk about cats");
        assert_eq!(recent[1].message, "third");

        let hits = store.search_exchanges("u1", "cats", 2).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].response, "meow");
    }

    #[test]
    fn search_treats_wildcards_literally_and_folds_unicode_case() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (m, r) in [("plain words", "ok"), ("100% real", "fr"), ("ÉCOLE starts monday", "rip")] {
            store
                .record_exchange(&Exchange::new("u1", m, r, ExchangeKind::Completion))
                .unwrap();
        }

        assert!(store.search_exchanges("u1", "_", 10).unwrap().is_empty());
        let pct = store.search_exchanges("u1", "%", 10).unwrap();
        assert_eq!(pct.len(), 1);
        assert_eq!(pct[0].message, "100% real");

        let accented = store.search_exchanges("u1", "école", 10).unwrap();
        assert_eq!(accented.len(), 1);
        assert_eq!(accented[0].response, "rip");
    }

    #[test]
    fn totals_count_users_exchanges_and_wins() {
        let store = SqliteStore::open_in_memory().unwrap();
        let mut a = store.get_or_create("a").unwrap();
        a.stats.record_win();
        a.stats.record_win();
        store.save(&a).unwrap();
        store.get_or_create("b").unwrap();
        store
            .record_exchange(&Exchange::new("a", "x", "y", ExchangeKind::Game))
            .unwrap();

        let totals = store.totals().unwrap();
        assert_eq!(totals.total_users, 2);
        assert_eq!(totals.total_exchanges, 1);
        assert_eq!(totals.total_wins, 2);
        store.ping().unwrap();
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("alterego.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            let mut s = store.get_or_create("t").unwrap();
            s.active = true;
            store.save(&s).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get("t").unwrap().unwrap().active);
    }
}
