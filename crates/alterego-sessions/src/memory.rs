use std::collections::VecDeque;

use dashmap::DashMap;
use tracing::{debug, instrument};

use crate::error::Result;
use crate::store::ConversationStore;
use crate::types::{ConversationState, Exchange, StoreTotals};

/// Exchanges kept per conversation. Older entries are dropped first.
pub const EXCHANGE_LOG_CAP: usize = 500;

/// Process-lifetime store. State is lost on restart.
#[derive(Default)]
pub struct InMemoryStore {
    states: DashMap<String, ConversationState>,
    exchanges: DashMap<String, VecDeque<Exchange>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConversationStore for InMemoryStore {
    #[instrument(skip(self))]
    fn get_or_create(&self, id: &str) -> Result<ConversationState> {
        let entry = self.states.entry(id.to_string()).or_insert_with(|| {
            debug!("creating conversation state");
            ConversationState::new(id)
        });
        Ok(entry.value().clone())
    }

    fn get(&self, id: &str) -> Result<Option<ConversationState>> {
        Ok(self.states.get(id).map(|s| s.value().clone()))
    }

    #[instrument(skip(self, state), fields(id = %state.id))]
    fn save(&self, state: &ConversationState) -> Result<()> {
        self.states.insert(state.id.clone(), state.clone());
        Ok(())
    }

    fn record_exchange(&self, exchange: &Exchange) -> Result<()> {
        let mut log = self
            .exchanges
            .entry(exchange.conversation_id.clone())
            .or_default();
        log.push_back(exchange.clone());
        while log.len() > EXCHANGE_LOG_CAP {
            log.pop_front();
        }
        Ok(())
    }

    fn recent_exchanges(&self, id: &str, limit: usize) -> Result<Vec<Exchange>> {
        Ok(self
            .exchanges
            .get(id)
            .map(|log| {
                let skip = log.len().saturating_sub(limit);
                log.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default())
    }

    fn search_exchanges(&self, id: &str, topic: &str, limit: usize) -> Result<Vec<Exchange>> {
        let needle = topic.to_lowercase();
        Ok(self
            .exchanges
            .get(id)
            .map(|log| {
                log.iter()
                    .rev()
                    .filter(|e| {
                        e.message.to_lowercase().contains(&needle)
                            || e.response.to_lowercase().contains(&needle)
                    })
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn totals(&self) -> Result<StoreTotals> {
        Ok(StoreTotals {
            total_users: self.states.len() as u64,
            total_exchanges: self.exchanges.iter().map(|e| e.value().len() as u64).sum(),
            total_wins: self.states.iter().map(|s| s.value().stats.win_count).sum(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ExchangeKind, Turn};

    #[test]
    fn get_or_create_is_lazy_and_stable() {
        let store = InMemoryStore::new();
        assert!(store.get("t1").unwrap().is_none());
        let state = store.get_or_create("t1").unwrap();
        assert!(!state.active);
        let again = store.get_or_create("t1").unwrap();
        assert_eq!(state.created_at, again.created_at);
    }

    #[test]
    fn clear_wipes_context_but_keeps_stats() {
        let store = InMemoryStore::new();
        let mut state = store.get_or_create("t1").unwrap();
        state.active = true;
        state.stats.record_win();
        state.push_turn(Turn::user("hi"), 10);
        store.save(&state).unwrap();

        store.clear("t1").unwrap();

        let state = store.get("t1").unwrap().unwrap();
        assert!(!state.active);
        assert!(state.history.is_empty());
        assert_eq!(state.stats.win_count, 1);
    }

    #[test]
    fn exchanges_are_searchable_newest_first() {
        let store = InMemoryStore::new();
        store
            .record_exchange(&Exchange::new("t1", "i love pizza", "same", ExchangeKind::Completion))
            .unwrap();
        store
            .record_exchange(&Exchange::new("t1", "what about tacos", "PIZZA > tacos", ExchangeKind::Completion))
            .unwrap();
        store
            .record_exchange(&Exchange::new("t2", "pizza", "yes", ExchangeKind::Completion))
            .unwrap();

        let hits = store.search_exchanges("t1", "Pizza", 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].message, "what about tacos");

        let recent = store.recent_exchanges("t1", 1).unwrap();
        assert_eq!(recent[0].message, "what about tacos");

        let totals = store.totals().unwrap();
        assert_eq!(totals.total_exchanges, 3);
    }

    #[test]
    fn exchange_log_keeps_only_newest_entries() {
        let store = InMemoryStore::new();
        for i in 0..EXCHANGE_LOG_CAP + 25 {
            store
                .record_exchange(&Exchange::new("t1", &format!("msg {i}"), "ok", ExchangeKind::Completion))
                .unwrap();
        }
        store
            .record_exchange(&Exchange::new("t2", "hi", "yo", ExchangeKind::Completion))
            .unwrap();

        let all = store.recent_exchanges("t1", usize::MAX).unwrap();
        assert_eq!(all.len(), EXCHANGE_LOG_CAP);
        assert_eq!(all[0].message, "msg 25");
        assert_eq!(all[EXCHANGE_LOG_CAP - 1].message, format!("msg {}", EXCHANGE_LOG_CAP + 24));
        assert!(store.search_exchanges("t1", "msg 24", 5).unwrap().iter().all(|e| e.message != "msg 24"));

        let totals = store.totals().unwrap();
        assert_eq!(totals.total_exchanges, EXCHANGE_LOG_CAP as u64 + 1);
    }
}
