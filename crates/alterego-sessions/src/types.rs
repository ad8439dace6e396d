use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    User,
    Persona,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn persona(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Persona,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// The closed set of mini-games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    /// Decode a movie title from emoji.
    Emoji,
    /// Two-operand arithmetic, one attempt.
    Math,
    /// Guess a number between 1 and 10.
    NumberGuess,
}

impl GameKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GameKind::Emoji => "emoji",
            GameKind::Math => "math",
            GameKind::NumberGuess => "number_guess",
        }
    }
}

/// An in-progress mini-game. At most one per conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub kind: GameKind,
    /// The prompt shown when the game started.
    pub prompt: String,
    pub expected_answer: String,
    pub remaining_attempts: u32,
}

/// Per-conversation game and activity counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationStats {
    pub win_count: u64,
    /// Consecutive wins; reset to 0 on a loss or forfeit.
    pub streak: u32,
    /// Messages processed while the persona was active.
    pub message_count: u64,
    pub games_played: u64,
}

impl ConversationStats {
    /// Record a win and return the new streak.
    pub fn record_win(&mut self) -> u32 {
        self.win_count += 1;
        self.streak += 1;
        self.streak
    }

    pub fn record_loss(&mut self) {
        self.streak = 0;
    }
}

/// Everything the router knows about one conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: String,
    pub active: bool,
    /// Mood name selecting a prompt template (profiles with moods only).
    pub mood: Option<String>,
    /// Most recent turns, oldest at the front.
    pub history: VecDeque<Turn>,
    pub game: Option<GameState>,
    pub stats: ConversationStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            active: false,
            mood: None,
            history: VecDeque::new(),
            game: None,
            stats: ConversationStats::default(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Append a turn, evicting from the head so at most `max` remain.
    pub fn push_turn(&mut self, turn: Turn, max: usize) {
        self.history.push_back(turn);
        while self.history.len() > max {
            self.history.pop_front();
        }
    }

    /// The last `n` turns in chronological order.
    pub fn recent_turns(&self, n: usize) -> impl Iterator<Item = &Turn> {
        let skip = self.history.len().saturating_sub(n);
        self.history.iter().skip(skip)
    }

    /// Deactivate and wipe conversational context. Stats survive.
    pub fn reset(&mut self) {
        self.active = false;
        self.mood = None;
        self.history.clear();
        self.game = None;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// How a persona reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeKind {
    Greeting,
    Farewell,
    Game,
    Mood,
    QuickReply,
    EasterEgg,
    Activity,
    Function,
    Completion,
    Fallback,
}

impl ExchangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExchangeKind::Greeting => "greeting",
            ExchangeKind::Farewell => "farewell",
            ExchangeKind::Game => "game",
            ExchangeKind::Mood => "mood",
            ExchangeKind::QuickReply => "quick_reply",
            ExchangeKind::EasterEgg => "easter_egg",
            ExchangeKind::Activity => "activity",
            ExchangeKind::Function => "function",
            ExchangeKind::Completion => "completion",
            ExchangeKind::Fallback => "fallback",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "greeting" => ExchangeKind::Greeting,
            "farewell" => ExchangeKind::Farewell,
            "game" => ExchangeKind::Game,
            "mood" => ExchangeKind::Mood,
            "quick_reply" => ExchangeKind::QuickReply,
            "easter_egg" => ExchangeKind::EasterEgg,
            "activity" => ExchangeKind::Activity,
            "function" => ExchangeKind::Function,
            "completion" => ExchangeKind::Completion,
            "fallback" => ExchangeKind::Fallback,
            _ => return None,
        })
    }
}

/// One message/response pair in the long-term exchange log.
///
/// Unlike `history`, the log is unbounded and survives deactivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub conversation_id: String,
    pub message: String,
    pub response: String,
    pub kind: ExchangeKind,
    pub timestamp: DateTime<Utc>,
}

impl Exchange {
    pub fn new(
        conversation_id: impl Into<String>,
        message: impl Into<String>,
        response: impl Into<String>,
        kind: ExchangeKind,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            message: message.into(),
            response: response.into(),
            kind,
            timestamp: Utc::now(),
        }
    }
}

/// Store-wide counters for the stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreTotals {
    pub total_users: u64,
    pub total_exchanges: u64,
    pub total_wins: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_keeps_most_recent_turns() {
        let mut state = ConversationState::new("t1");
        for i in 0..7 {
            state.push_turn(Turn::user(format!("m{i}")), 4);
        }
        assert_eq!(state.history.len(), 4);
        let texts: Vec<&str> = state.history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["m3", "m4", "m5", "m6"]);
    }

    #[test]
    fn recent_turns_are_chronological() {
        let mut state = ConversationState::new("t1");
        for i in 0..5 {
            state.push_turn(Turn::user(format!("m{i}")), 10);
        }
        let texts: Vec<&str> = state.recent_turns(2).map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["m3", "m4"]);
        assert_eq!(state.recent_turns(50).count(), 5);
    }

    #[test]
    fn reset_keeps_stats() {
        let mut state = ConversationState::new("t1");
        state.active = true;
        state.mood = Some("witty".into());
        state.push_turn(Turn::persona("yo"), 10);
        state.stats.record_win();
        state.game = Some(GameState {
            kind: GameKind::Math,
            prompt: "quick!".into(),
            expected_answer: "42".into(),
            remaining_attempts: 1,
        });

        state.reset();

        assert!(!state.active);
        assert!(state.mood.is_none());
        assert!(state.history.is_empty());
        assert!(state.game.is_none());
        assert_eq!(state.stats.win_count, 1);
        assert_eq!(state.stats.streak, 1);
    }

    #[test]
    fn loss_resets_streak_only() {
        let mut stats = ConversationStats::default();
        assert_eq!(stats.record_win(), 1);
        assert_eq!(stats.record_win(), 2);
        stats.record_loss();
        assert_eq!(stats.streak, 0);
        assert_eq!(stats.win_count, 2);
    }

    #[test]
    fn exchange_kind_names_roundtrip() {
        for kind in [ExchangeKind::QuickReply, ExchangeKind::EasterEgg, ExchangeKind::Fallback] {
            assert_eq!(ExchangeKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ExchangeKind::parse("nope"), None);
    }
}
