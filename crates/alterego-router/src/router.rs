use std::sync::Arc;

use alterego_agent::{CompletionProvider, Intent, IntentClassifier};
use alterego_core::config::{PersonaConfig, DEFAULT_MAX_HISTORY, DEFAULT_MAX_RESPONSE_CHARS};
use alterego_sessions::{
    ConversationLocks, ConversationState, ConversationStats, ConversationStore, Exchange,
    ExchangeKind, GameKind, Turn,
};
use chrono::Timelike;
use tracing::{debug, error, info, instrument, warn};

use crate::dice::{Dice, ThreadDice};
use crate::functions;
use crate::games;
use crate::postprocess::{add_nudge, add_quirk, truncate};
use crate::profile::PersonaProfile;
use crate::prompt;

/// Bounds applied to every conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterLimits {
    pub max_history: usize,
    pub max_response_chars: usize,
}

impl Default for RouterLimits {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
            max_response_chars: DEFAULT_MAX_RESPONSE_CHARS,
        }
    }
}

impl From<&PersonaConfig> for RouterLimits {
    fn from(config: &PersonaConfig) -> Self {
        Self {
            max_history: config.max_history,
            max_response_chars: config.max_response_chars,
        }
    }
}

/// What the router did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAction {
    /// No reply: inactive conversation, empty text, or a store failure.
    Ignored,
    Replied(ExchangeKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    /// Text to send back, if any.
    pub reply: Option<String>,
    pub action: RouteAction,
    /// Whether the persona is active after this message.
    pub active: bool,
    pub stats: ConversationStats,
}

impl RouteOutcome {
    fn ignored(state: Option<&ConversationState>) -> Self {
        Self {
            reply: None,
            action: RouteAction::Ignored,
            active: state.map(|s| s.active).unwrap_or(false),
            stats: state.map(|s| s.stats.clone()).unwrap_or_default(),
        }
    }
}

/// Decides how the persona answers each inbound message.
///
/// Routing never fails: provider errors become fallback replies and store
/// errors are logged. Messages for the same conversation are processed one
/// at a time.
pub struct MessageRouter {
    profile: PersonaProfile,
    store: Arc<dyn ConversationStore>,
    provider: Arc<dyn CompletionProvider>,
    intent: Arc<dyn IntentClassifier>,
    dice: Arc<dyn Dice>,
    limits: RouterLimits,
    locks: ConversationLocks,
}

impl MessageRouter {
    pub fn new(
        profile: PersonaProfile,
        store: Arc<dyn ConversationStore>,
        provider: Arc<dyn CompletionProvider>,
        intent: Arc<dyn IntentClassifier>,
    ) -> Self {
        Self {
            profile,
            store,
            provider,
            intent,
            dice: Arc::new(ThreadDice),
            limits: RouterLimits::default(),
            locks: ConversationLocks::new(),
        }
    }

    pub fn with_dice(mut self, dice: Arc<dyn Dice>) -> Self {
        self.dice = dice;
        self
    }

    pub fn with_limits(mut self, limits: RouterLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    /// Route one inbound message and return the reply to send, if any.
    #[instrument(skip(self, text))]
    pub async fn route(&self, conversation_id: &str, text: &str) -> RouteOutcome {
        let text = text.trim();
        if text.is_empty() {
            let state = self.store.get(conversation_id).ok().flatten();
            return RouteOutcome::ignored(state.as_ref());
        }

        let _guard = self.locks.lock(conversation_id).await;

        let mut state = match self.store.get_or_create(conversation_id) {
            Ok(state) => state,
            Err(e) => {
                error!(error = %e, "failed to load conversation state");
                return RouteOutcome::ignored(None);
            }
        };

        match self.intent.classify(text).await {
            Intent::Activate => return self.activate(state, text),
            Intent::Deactivate => return self.deactivate(state, text),
            Intent::Neither => {}
        }

        if !state.active {
            debug!("persona inactive, ignoring message");
            return RouteOutcome::ignored(Some(&state));
        }

        state.stats.message_count += 1;
        let (reply, kind) = self.respond(&mut state, text).await;
        self.finish(state, text, reply, kind)
    }

    fn activate(&self, mut state: ConversationState, text: &str) -> RouteOutcome {
        state.active = true;
        state.game = None;
        if state.mood.is_none() && !self.profile.moods.is_empty() {
            let mood = self.profile.moods[self.dice.index(self.profile.moods.len())];
            state.mood = Some(mood.name.to_string());
        }

        let mood = state.mood.clone().unwrap_or_default();
        let greeting = self.pick(self.profile.greetings).replace("{mood}", &mood);
        info!(mood = %mood, "persona activated");
        self.finish(state, text, greeting, ExchangeKind::Greeting)
    }

    fn deactivate(&self, mut state: ConversationState, text: &str) -> RouteOutcome {
        if !state.active {
            debug!("deactivation while inactive, ignoring");
            return RouteOutcome::ignored(Some(&state));
        }

        state.reset();
        let farewell = truncate(self.pick(self.profile.farewells), self.limits.max_response_chars);
        if let Err(e) = self.store.save(&state) {
            error!(conversation = %state.id, error = %e, "failed to save conversation state");
        }
        self.log_exchange(&state.id, text, &farewell, ExchangeKind::Farewell);
        info!("persona deactivated");

        RouteOutcome {
            reply: Some(farewell),
            action: RouteAction::Replied(ExchangeKind::Farewell),
            active: false,
            stats: state.stats,
        }
    }

    /// Produce the reply for an active conversation, in priority order:
    /// running game, mood command, quick reply, easter egg, game keyword,
    /// activity keyword, then the model.
    async fn respond(&self, state: &mut ConversationState, text: &str) -> (String, ExchangeKind) {
        if let Some(mut game) = state.game.take() {
            let outcome = games::evaluate(&mut game, text, &mut state.stats);
            debug!(game = game.kind.as_str(), over = outcome.is_over(), "game answer evaluated");
            let reply = outcome.reply().to_string();
            if !outcome.is_over() {
                state.game = Some(game);
            }
            return (reply, ExchangeKind::Game);
        }

        let lower = text.to_lowercase();

        if let Some(reply) = self.mood_command(state, &lower) {
            return (reply, ExchangeKind::Mood);
        }

        if let Some(replies) = self.quick_reply(&lower) {
            return (self.pick(replies).to_string(), ExchangeKind::QuickReply);
        }

        if let Some((_, reply)) = self
            .profile
            .easter_eggs
            .iter()
            .find(|(trigger, _)| lower.contains(trigger))
        {
            return (reply.to_string(), ExchangeKind::EasterEgg);
        }

        let words = words(&lower);

        if self.profile.games_enabled {
            if let Some(kind) = self.game_keyword(&words) {
                let game = games::start(kind, &self.profile, self.dice.as_ref());
                let reply = game.prompt.clone();
                state.game = Some(game);
                state.stats.games_played += 1;
                info!(game = kind.as_str(), "game started");
                return (reply, ExchangeKind::Game);
            }
        }

        if let Some(activity) = self
            .profile
            .activities
            .iter()
            .find(|a| words.iter().any(|w| *w == a.keyword))
        {
            let line = self.pick(activity.lines);
            return (activity.render(line), ExchangeKind::Activity);
        }

        self.complete(state, text).await
    }

    async fn complete(&self, state: &mut ConversationState, text: &str) -> (String, ExchangeKind) {
        let hour = chrono::Local::now().hour();
        let req = prompt::build_request(&self.profile, state, text, hour);

        match self.provider.complete(&req).await {
            Ok(completion) => {
                if let Some(call) = completion.function_call {
                    let reply = functions::dispatch(
                        &call,
                        &self.profile,
                        state,
                        self.store.as_ref(),
                        self.dice.as_ref(),
                    );
                    return (reply, ExchangeKind::Function);
                }

                let generated = completion
                    .text
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty());

                match generated {
                    Some(reply) => {
                        let dice = self.dice.as_ref();
                        let reply = add_quirk(reply, &self.profile, state.mood.as_deref(), dice);
                        let reply = add_nudge(reply, &self.profile, state.game.is_some(), dice);
                        (reply, ExchangeKind::Completion)
                    }
                    None => {
                        warn!(provider = %self.provider.name(), "model returned empty response");
                        (self.filler(state).to_string(), ExchangeKind::Completion)
                    }
                }
            }
            Err(e) => {
                warn!(provider = %self.provider.name(), error = %e, "completion failed, sending fallback");
                (self.pick(self.profile.fallbacks).to_string(), ExchangeKind::Fallback)
            }
        }
    }

    /// Append the exchange to history and the log, persist, and build the outcome.
    fn finish(
        &self,
        mut state: ConversationState,
        text: &str,
        reply: String,
        kind: ExchangeKind,
    ) -> RouteOutcome {
        let reply = truncate(&reply, self.limits.max_response_chars);
        let max = self.limits.max_history;
        state.push_turn(Turn::user(text), max);
        state.push_turn(Turn::persona(reply.clone()), max);
        state.touch();

        if let Err(e) = self.store.save(&state) {
            error!(conversation = %state.id, error = %e, "failed to save conversation state");
        }
        self.log_exchange(&state.id, text, &reply, kind);

        RouteOutcome {
            reply: Some(reply),
            action: RouteAction::Replied(kind),
            active: state.active,
            stats: state.stats,
        }
    }

    fn log_exchange(&self, id: &str, text: &str, reply: &str, kind: ExchangeKind) {
        if let Err(e) = self
            .store
            .record_exchange(&Exchange::new(id, text, reply, kind))
        {
            warn!(conversation = %id, error = %e, "failed to record exchange");
        }
    }

    fn mood_command(&self, state: &mut ConversationState, lower: &str) -> Option<String> {
        let name = lower.strip_prefix("mood:")?.trim();
        let mood = self.profile.mood(name)?;
        state.mood = Some(mood.name.to_string());
        info!(mood = mood.name, "mood changed");
        Some(format!(
            "*shifts personality* Now channeling my {} side. Let's see where this goes...",
            mood.name
        ))
    }

    /// Match messages of at most two words that are, start with, or end
    /// with a trigger word.
    fn quick_reply(&self, lower: &str) -> Option<&'static [&'static str]> {
        if lower.split_whitespace().count() > 2 {
            return None;
        }
        let msg = lower.trim().trim_end_matches(['!', '.', ',']);
        self.profile
            .quick_replies
            .iter()
            .find(|(trigger, _)| {
                msg == *trigger
                    || msg.starts_with(&format!("{trigger} "))
                    || msg.ends_with(&format!(" {trigger}"))
            })
            .map(|(_, replies)| *replies)
    }

    fn game_keyword(&self, words: &[&str]) -> Option<GameKind> {
        self.profile
            .game_keywords
            .iter()
            .find(|(keyword, _)| words.contains(keyword))
            .map(|(_, kind)| *kind)
    }

    fn filler(&self, state: &ConversationState) -> &'static str {
        state
            .mood
            .as_deref()
            .and_then(|m| self.profile.mood(m))
            .and_then(|m| m.filler)
            .unwrap_or(self.profile.filler)
    }

    fn pick(&self, options: &'static [&'static str]) -> &'static str {
        if options.is_empty() {
            return "";
        }
        options[self.dice.index(options.len())]
    }
}

fn words(lower: &str) -> Vec<&str> {
    lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::SequenceDice;
    use alterego_agent::{
        Completion, CompletionRequest, FunctionCall, KeywordClassifier, ProviderError,
    };
    use alterego_sessions::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Scripted {
        calls: AtomicUsize,
        reply: Option<String>,
        call: Option<FunctionCall>,
        fail: bool,
    }

    #[async_trait]
    impl CompletionProvider for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }
        async fn complete(&self, _req: &CompletionRequest) -> Result<Completion, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::Timeout { ms: 20_000 });
            }
            Ok(Completion {
                text: self.reply.clone(),
                function_call: self.call.clone(),
            })
        }
    }

    fn router_with(
        profile: PersonaProfile,
        provider: Arc<Scripted>,
        dice: Vec<i64>,
    ) -> (MessageRouter, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let intent = Arc::new(KeywordClassifier::new(
            &profile.activate_phrase,
            &profile.deactivate_phrase,
        ));
        let router = MessageRouter::new(profile, store.clone(), provider, intent)
            .with_dice(Arc::new(SequenceDice::new(dice)));
        (router, store)
    }

    fn harsha(provider: Arc<Scripted>) -> (MessageRouter, Arc<InMemoryStore>) {
        router_with(PersonaProfile::harsha(), provider, vec![])
    }

    #[tokio::test]
    async fn inactive_conversation_is_ignored() {
        let provider = Arc::new(Scripted::default());
        let (router, _) = harsha(provider.clone());
        let out = router.route("t", "hello there").await;
        assert_eq!(out.action, RouteAction::Ignored);
        assert!(out.reply.is_none());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn deactivation_while_inactive_changes_nothing() {
        let (router, store) = harsha(Arc::new(Scripted::default()));
        store.get_or_create("t").unwrap();
        let before = store.get("t").unwrap().unwrap();

        let out = router.route("t", "bye harsha").await;

        assert!(out.reply.is_none());
        assert_eq!(store.get("t").unwrap().unwrap(), before);
        assert!(store.recent_exchanges("t", 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn activation_clears_game_but_keeps_history() {
        let (router, store) = harsha(Arc::new(Scripted::default()));
        router.route("t", "hey harsha").await;
        router.route("t", "emoji").await;
        assert!(store.get("t").unwrap().unwrap().game.is_some());

        let out = router.route("t", "HEY HARSHA again").await;
        assert_eq!(out.action, RouteAction::Replied(ExchangeKind::Greeting));
        let state = store.get("t").unwrap().unwrap();
        assert!(state.active);
        assert!(state.game.is_none());
        assert_eq!(state.history.len(), 6);
    }

    #[tokio::test]
    async fn deactivation_clears_history_and_keeps_stats() {
        let (router, store) = harsha(Arc::new(Scripted::default()));
        router.route("t", "hey harsha").await;
        router.route("t", "sup").await;

        let out = router.route("t", "ok bye harsha").await;
        assert_eq!(out.action, RouteAction::Replied(ExchangeKind::Farewell));
        assert!(!out.active);

        let state = store.get("t").unwrap().unwrap();
        assert!(!state.active);
        assert!(state.history.is_empty());
        assert_eq!(state.stats.message_count, 1);
    }

    #[tokio::test]
    async fn quick_replies_need_short_messages() {
        let provider = Arc::new(Scripted {
            reply: Some("model says hi".into()),
            ..Default::default()
        });
        let (router, _) = harsha(provider.clone());
        router.route("t", "hey harsha").await;

        let out = router.route("t", "lol!").await;
        assert_eq!(out.action, RouteAction::Replied(ExchangeKind::QuickReply));
        let out = router.route("t", "sup fam").await;
        assert_eq!(out.action, RouteAction::Replied(ExchangeKind::QuickReply));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        let out = router.route("t", "that was so lol honestly").await;
        assert_eq!(out.action, RouteAction::Replied(ExchangeKind::Completion));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn game_keywords_match_whole_words_only() {
        let provider = Arc::new(Scripted {
            reply: Some("ok".into()),
            ..Default::default()
        });
        let (router, store) = harsha(provider);
        router.route("t", "hey harsha").await;

        router.route("t", "mathematics is hard ngl").await;
        assert!(store.get("t").unwrap().unwrap().game.is_none());

        let out = router.route("t", "let's play guess!").await;
        assert_eq!(out.reply.as_deref(), Some("i'm thinking 1-10... guess! 🎲"));
        let state = store.get("t").unwrap().unwrap();
        assert!(state.game.is_some());
        assert_eq!(state.stats.games_played, 1);
    }

    #[tokio::test]
    async fn running_game_consumes_quick_reply_triggers() {
        let (router, store) = harsha(Arc::new(Scripted::default()));
        router.route("t", "hey harsha").await;
        router.route("t", "emoji time").await;

        let out = router.route("t", "lol").await;
        assert_eq!(out.action, RouteAction::Replied(ExchangeKind::Game));
        assert_eq!(
            store.get("t").unwrap().unwrap().game.unwrap().remaining_attempts,
            2
        );
    }

    #[tokio::test]
    async fn activity_keywords_return_canned_lines() {
        let (router, _) = harsha(Arc::new(Scripted::default()));
        router.route("t", "hey harsha").await;
        let out = router.route("t", "give me some wisdom please").await;
        assert_eq!(out.action, RouteAction::Replied(ExchangeKind::Activity));
        assert_eq!(
            out.reply.as_deref(),
            Some("comparison is the thief of joy, but you're incomparable anyway 💫")
        );
    }

    #[tokio::test]
    async fn provider_failure_yields_fallback() {
        let provider = Arc::new(Scripted {
            fail: true,
            ..Default::default()
        });
        let (router, store) = harsha(provider);
        router.route("t", "hey harsha").await;

        let out = router.route("t", "tell me about black holes").await;
        assert_eq!(out.action, RouteAction::Replied(ExchangeKind::Fallback));
        assert_eq!(out.reply.as_deref(), Some("bruh my brain glitched 🤖"));
        let log = store.recent_exchanges("t", 10).unwrap();
        assert_eq!(log.last().map(|e| e.kind), Some(ExchangeKind::Fallback));
    }

    #[tokio::test]
    async fn empty_completion_uses_filler() {
        let provider = Arc::new(Scripted {
            reply: Some("   ".into()),
            ..Default::default()
        });
        let (router, _) = router_with(PersonaProfile::classic(), provider, vec![]);
        router.route("t", "activate_alter_ego").await;
        let out = router.route("t", "what's up with you").await;
        assert_eq!(
            out.reply.as_deref(),
            Some("Hmm, let me think about that... Can you rephrase?")
        );
    }

    #[tokio::test]
    async fn function_call_is_dispatched() {
        let provider = Arc::new(Scripted {
            call: Some(FunctionCall {
                name: "start_number_game".into(),
                arguments: serde_json::json!({}),
            }),
            ..Default::default()
        });
        let (router, store) = harsha(provider);
        router.route("t", "hey harsha").await;

        let out = router.route("t", "surprise me with something fun").await;
        assert_eq!(out.action, RouteAction::Replied(ExchangeKind::Function));
        assert_eq!(out.reply.as_deref(), Some("i'm thinking 1-10... guess! 🎲"));
        assert!(store.get("t").unwrap().unwrap().game.is_some());
    }

    #[tokio::test]
    async fn enhanced_profile_moods_and_easter_eggs() {
        let provider = Arc::new(Scripted::default());
        // mood index 4 (playful), greeting index 4 ({mood} template)
        let (router, store) = router_with(PersonaProfile::enhanced(), provider.clone(), vec![4, 4]);

        let out = router.route("t", "activate_alter_ego").await;
        assert_eq!(
            out.reply.as_deref(),
            Some("✨ Activated! Fair warning: I'm in a playful mood today.")
        );

        let out = router.route("t", "mood: Mysterious").await;
        assert_eq!(out.action, RouteAction::Replied(ExchangeKind::Mood));
        assert_eq!(store.get("t").unwrap().unwrap().mood.as_deref(), Some("mysterious"));

        let out = router.route("t", "so what is the meaning of life").await;
        assert_eq!(out.action, RouteAction::Replied(ExchangeKind::EasterEgg));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);

        // empty completion in the mysterious mood
        let out = router.route("t", "hmm").await;
        assert_eq!(out.reply.as_deref(), Some("..."));
    }

    #[tokio::test]
    async fn replies_are_truncated_to_limit() {
        let provider = Arc::new(Scripted {
            reply: Some("x".repeat(50)),
            ..Default::default()
        });
        let (router, _) = router_with(PersonaProfile::classic(), provider, vec![]);
        let router = router.with_limits(RouterLimits {
            max_history: 10,
            max_response_chars: 20,
        });
        router.route("t", "activate_alter_ego").await;
        let out = router.route("t", "talk to me").await;
        let reply = out.reply.unwrap();
        assert_eq!(reply.chars().count(), 20);
        assert!(reply.ends_with("..."));
    }

    #[test]
    fn words_split_on_punctuation() {
        assert_eq!(
            words("what's 2+2 style? start math"),
            vec!["what", "s", "2", "2", "style", "start", "math"]
        );
    }
}
