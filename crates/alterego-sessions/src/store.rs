use crate::error::Result;
use crate::types::{ConversationState, Exchange, StoreTotals};

/// Persistence for per-conversation state and the exchange log.
///
/// Calls are synchronous and short; callers serialise access per
/// conversation through [`ConversationLocks`](crate::locks::ConversationLocks).
pub trait ConversationStore: Send + Sync {
    /// Return the stored state, creating a fresh inactive one if absent.
    fn get_or_create(&self, id: &str) -> Result<ConversationState>;

    fn get(&self, id: &str) -> Result<Option<ConversationState>>;

    /// Insert or replace the state for `state.id`.
    fn save(&self, state: &ConversationState) -> Result<()>;

    /// Deactivate and wipe history, game and mood. Stats and the exchange
    /// log are kept. Unknown ids are a no-op.
    fn clear(&self, id: &str) -> Result<()> {
        if let Some(mut state) = self.get(id)? {
            state.reset();
            self.save(&state)?;
        }
        Ok(())
    }

    fn record_exchange(&self, exchange: &Exchange) -> Result<()>;

    /// The newest `limit` exchanges for a conversation, oldest first.
    fn recent_exchanges(&self, id: &str, limit: usize) -> Result<Vec<Exchange>>;

    /// Exchanges whose message or response contains `topic`
    /// (case-insensitive), newest first.
    fn search_exchanges(&self, id: &str, topic: &str, limit: usize) -> Result<Vec<Exchange>>;

    fn totals(&self) -> Result<StoreTotals>;

    /// Cheap liveness probe for health checks.
    fn ping(&self) -> Result<()> {
        Ok(())
    }
}
