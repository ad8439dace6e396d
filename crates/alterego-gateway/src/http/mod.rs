pub mod chat;
pub mod health;
pub mod memory;
pub mod webhook;

use alterego_sessions::ConversationStats;
use serde_json::{json, Value};

/// Counters exposed to API clients.
pub(crate) fn stats_json(stats: &ConversationStats) -> Value {
    json!({
        "message_count": stats.message_count,
        "win_count": stats.win_count,
        "streak": stats.streak,
        "games_played": stats.games_played,
    })
}
