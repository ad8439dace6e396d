//! Completion request assembly.

use alterego_agent::{CompletionRequest, Message};
use alterego_sessions::{ConversationState, Speaker};

use crate::functions;
use crate::profile::{PersonaProfile, ENHANCED_GUIDANCE};

/// Render the system turn for `state` under `profile`.
pub fn system_prompt(profile: &PersonaProfile, state: &ConversationState) -> String {
    let mood = state
        .mood
        .as_deref()
        .and_then(|m| profile.mood(m))
        .or_else(|| profile.moods.first());

    let mut prompt = match mood {
        Some(mood) => {
            let base = if profile.system_prompt.is_empty() {
                mood.template
            } else {
                profile.system_prompt.as_str()
            };
            format!(
                "{base}\n{}",
                ENHANCED_GUIDANCE.replace("{mood}", mood.name)
            )
        }
        None => profile.system_prompt.clone(),
    };

    if profile.stats_in_prompt {
        let stats = &state.stats;
        prompt.push_str(&format!(
            "\n\nUser has sent {} messages, won {} games, current streak {}.",
            stats.message_count, stats.win_count, stats.streak
        ));
    }
    if profile.function_calling {
        prompt.push_str("\nUse functions when appropriate. Remember previous conversations.");
    }
    prompt
}

/// Coarse time-of-day hint appended to the user turn.
pub fn time_hint(hour: u32) -> &'static str {
    match hour {
        0..=5 => " [Context: very late night/early morning]",
        6..=11 => " [Context: morning]",
        12..=16 => " [Context: afternoon]",
        17..=20 => " [Context: evening]",
        _ => " [Context: night]",
    }
}

/// Build the full completion request for a user message.
///
/// `state.history` must not yet contain the current message.
pub fn build_request(
    profile: &PersonaProfile,
    state: &ConversationState,
    text: &str,
    hour: u32,
) -> CompletionRequest {
    let mut messages = Vec::with_capacity(profile.context_turns.min(state.history.len()) + 2);
    messages.push(Message::system(system_prompt(profile, state)));

    for turn in state.recent_turns(profile.context_turns) {
        messages.push(match turn.speaker {
            Speaker::User => Message::user(turn.text.clone()),
            Speaker::Persona => Message::assistant(turn.text.clone()),
        });
    }

    let user_text = if profile.time_hint {
        format!("{text}{}", time_hint(hour))
    } else {
        text.to_string()
    };
    messages.push(Message::user(user_text));

    let mut params = profile.sampling;
    if let Some(mood) = state.mood.as_deref().and_then(|m| profile.mood(m)) {
        params.temperature = mood.temperature;
    }

    let mut req = CompletionRequest::new(messages, params);
    if profile.function_calling {
        req.functions = functions::specs(profile);
    }
    req
}
