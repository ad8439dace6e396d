//! Functions offered to the model and their local implementations.

use alterego_agent::{FunctionCall, FunctionSpec};
use alterego_sessions::{ConversationState, ConversationStore, GameKind};
use tracing::{debug, warn};

use crate::dice::Dice;
use crate::games;
use crate::profile::PersonaProfile;

pub const NOT_FOUND: &str = "function not found lol";

/// Function specs for `profile`. Game starters are offered only when the
/// profile plays games.
pub fn specs(profile: &PersonaProfile) -> Vec<FunctionSpec> {
    let mut specs = Vec::new();
    if profile.games_enabled {
        specs.push(FunctionSpec::no_args("start_emoji_game", "Start an emoji movie guessing game"));
        specs.push(FunctionSpec::no_args("start_math_game", "Start a quick math challenge"));
        specs.push(FunctionSpec::no_args("start_number_game", "Start a guess-the-number game (1-10)"));
    }
    specs.push(FunctionSpec::no_args("roast_user", "Give a playful roast to the user"));
    specs.push(FunctionSpec::no_args("hype_user", "Hype up and motivate the user"));
    specs.push(FunctionSpec::no_args("vibe_check", "Run a random vibe check on the user"));
    specs.push(FunctionSpec {
        name: "recall_memory".to_string(),
        description: "Reference something from a previous conversation".to_string(),
        parameters: serde_json::json!({
            "type": "object",
            "properties": {
                "topic": {"type": "string", "description": "Topic to recall"}
            },
            "required": ["topic"]
        }),
    });
    specs
}

/// Execute a model-requested function and return the reply text.
pub fn dispatch(
    call: &FunctionCall,
    profile: &PersonaProfile,
    state: &mut ConversationState,
    store: &dyn ConversationStore,
    dice: &dyn Dice,
) -> String {
    debug!(conversation = %state.id, function = %call.name, "dispatching function call");
    match call.name.as_str() {
        "start_emoji_game" => start_game(GameKind::Emoji, profile, state, dice),
        "start_math_game" => start_game(GameKind::Math, profile, state, dice),
        "start_number_game" => start_game(GameKind::NumberGuess, profile, state, dice),
        "roast_user" => activity_line("roast", profile, dice),
        "hype_user" => activity_line("hype", profile, dice),
        "vibe_check" => activity_line("vibe", profile, dice),
        "recall_memory" => {
            let topic = call
                .arguments
                .get("topic")
                .and_then(|t| t.as_str())
                .unwrap_or_default()
                .trim();
            recall(topic, state, store)
        }
        other => {
            warn!(conversation = %state.id, function = %other, "model called unknown function");
            NOT_FOUND.to_string()
        }
    }
}

fn start_game(
    kind: GameKind,
    profile: &PersonaProfile,
    state: &mut ConversationState,
    dice: &dyn Dice,
) -> String {
    let game = games::start(kind, profile, dice);
    let prompt = game.prompt.clone();
    state.game = Some(game);
    state.stats.games_played += 1;
    prompt
}

fn activity_line(keyword: &str, profile: &PersonaProfile, dice: &dyn Dice) -> String {
    match profile.activity_or_default(keyword) {
        Some(activity) if !activity.lines.is_empty() => {
            activity.render(activity.lines[dice.index(activity.lines.len())])
        }
        _ => NOT_FOUND.to_string(),
    }
}

fn recall(topic: &str, state: &ConversationState, store: &dyn ConversationStore) -> String {
    if topic.is_empty() {
        return "recall what tho? 🤔".to_string();
    }
    match store.search_exchanges(&state.id, topic, 1) {
        Ok(hits) => match hits.first() {
            Some(hit) => format!("I remember we talked about {topic}! You said: {}", hit.message),
            None => format!("hmm don't think we've talked about {topic} before"),
        },
        Err(e) => {
            warn!(conversation = %state.id, error = %e, "memory search failed");
            "my memory's being weird rn".to_string()
        }
    }
}
