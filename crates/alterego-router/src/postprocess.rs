//! Reply shaping applied after generation.

use crate::dice::Dice;
use crate::profile::PersonaProfile;

/// Cut `text` to at most `max` characters, marking the cut with `...`.
///
/// Counts Unicode scalar values, so emoji never split mid-character.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    if max < 3 {
        return ".".repeat(max);
    }
    let mut out: String = text.chars().take(max - 3).collect();
    out.push_str("...");
    out
}

/// Occasionally decorate a reply with a mood quirk, before or after the text.
pub fn add_quirk(text: String, profile: &PersonaProfile, mood: Option<&str>, dice: &dyn Dice) -> String {
    let Some(mood) = mood.and_then(|m| profile.mood(m)) else {
        return text;
    };
    if mood.quirks.is_empty() || !dice.chance(profile.quirk_chance) {
        return text;
    }
    let quirk = mood.quirks[dice.index(mood.quirks.len())];
    if dice.chance(0.5) {
        format!("{quirk} {text}")
    } else {
        format!("{text} {quirk}")
    }
}

/// Occasionally append a game suggestion when no game is running.
pub fn add_nudge(text: String, profile: &PersonaProfile, in_game: bool, dice: &dyn Dice) -> String {
    if in_game || profile.nudges.is_empty() || !dice.chance(profile.nudge_chance) {
        return text;
    }
    let nudge = profile.nudges[dice.index(profile.nudges.len())];
    format!("{text}{nudge}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dice::SequenceDice;

    #[test]
    fn truncation_is_exact() {
        let long = "a".repeat(1500);
        let out = truncate(&long, 1000);
        assert_eq!(out.chars().count(), 1000);
        assert!(out.ends_with("..."));
        assert_eq!(&out[..997], &long[..997]);
    }

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("0123456789", 10), "0123456789");
    }

    #[test]
    fn truncation_counts_characters_not_bytes() {
        let text = "🔥".repeat(20);
        let out = truncate(&text, 10);
        assert_eq!(out.chars().count(), 10);
        assert_eq!(out, format!("{}...", "🔥".repeat(7)));
    }

    #[test]
    fn quirk_prefix_or_suffix() {
        let profile = PersonaProfile::enhanced();
        // chance, index 1, prefix
        let dice = SequenceDice::new([1, 1, 1]);
        let out = add_quirk("hi".into(), &profile, Some("witty"), &dice);
        assert_eq!(out, "*mic drop* hi");

        let dice = SequenceDice::new([1, 0, 0]);
        let out = add_quirk("hi".into(), &profile, Some("witty"), &dice);
        assert_eq!(out, "hi *adjusts imaginary monocle*");

        let dice = SequenceDice::new([0]);
        assert_eq!(add_quirk("hi".into(), &profile, Some("witty"), &dice), "hi");
    }

    #[test]
    fn nudge_only_outside_games() {
        let profile = PersonaProfile::harsha();
        let dice = SequenceDice::new([1, 1]);
        assert_eq!(add_nudge("ok".into(), &profile, false, &dice), "ok\n\nquick math? ⚡");
        let dice = SequenceDice::new([1, 1]);
        assert_eq!(add_nudge("ok".into(), &profile, true, &dice), "ok");
    }
}
