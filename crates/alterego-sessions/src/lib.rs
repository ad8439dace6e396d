pub mod db;
pub mod error;
pub mod locks;
pub mod memory;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use locks::ConversationLocks;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use store::ConversationStore;
pub use types::{
    ConversationState, ConversationStats, Exchange, ExchangeKind, GameKind, GameState, Speaker,
    StoreTotals, Turn,
};
