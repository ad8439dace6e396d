//! Mini-game generation and answer evaluation.

use alterego_sessions::{ConversationStats, GameKind, GameState};

use crate::dice::Dice;
use crate::profile::PersonaProfile;

pub const EMOJI_ATTEMPTS: u32 = 3;
pub const MATH_ATTEMPTS: u32 = 1;
pub const NUMBER_GUESS_ATTEMPTS: u32 = 3;

/// Start a game of `kind`, returning the new state. The opening prompt is
/// `state.prompt`.
pub fn start(kind: GameKind, profile: &PersonaProfile, dice: &dyn Dice) -> GameState {
    match kind {
        GameKind::Emoji => {
            let (puzzle, answer) = if profile.emoji_puzzles.is_empty() {
                ("🎬🦁👑", "lion king")
            } else {
                profile.emoji_puzzles[dice.index(profile.emoji_puzzles.len())]
            };
            GameState {
                kind,
                prompt: format!("decode this: {puzzle} (movie) 🎬"),
                expected_answer: answer.to_string(),
                remaining_attempts: EMOJI_ATTEMPTS,
            }
        }
        GameKind::Math => {
            let a = dice.between(10, 99);
            let b = dice.between(10, 99);
            let op = if profile.math_ops.is_empty() {
                '+'
            } else {
                profile.math_ops[dice.index(profile.math_ops.len())]
            };
            let answer = match op {
                '-' => a - b,
                '*' => a * b,
                _ => a + b,
            };
            GameState {
                kind,
                prompt: format!("quick! {a} {op} {b} = ? ⏱️"),
                expected_answer: answer.to_string(),
                remaining_attempts: MATH_ATTEMPTS,
            }
        }
        GameKind::NumberGuess => GameState {
            kind,
            prompt: "i'm thinking 1-10... guess! 🎲".to_string(),
            expected_answer: dice.between(1, 10).to_string(),
            remaining_attempts: NUMBER_GUESS_ATTEMPTS,
        },
    }
}

/// Result of feeding one message to an active game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    /// Correct answer. The game is over.
    Won { reply: String },
    /// Wrong answer with attempts left. The game continues.
    Retry { reply: String },
    /// Out of attempts or forfeited. The game is over.
    Lost { reply: String },
    /// The stored game was unusable and has been dropped.
    Abandoned { reply: String },
}

impl GameOutcome {
    pub fn reply(&self) -> &str {
        match self {
            GameOutcome::Won { reply }
            | GameOutcome::Retry { reply }
            | GameOutcome::Lost { reply }
            | GameOutcome::Abandoned { reply } => reply,
        }
    }

    pub fn is_over(&self) -> bool {
        !matches!(self, GameOutcome::Retry { .. })
    }
}

const ABANDONED: &str = "my bad, lost track of that game 😅 wanna start a new one?";

/// Evaluate `answer` against `game`, updating attempts and stats.
///
/// The caller clears the game when the outcome is over.
pub fn evaluate(game: &mut GameState, answer: &str, stats: &mut ConversationStats) -> GameOutcome {
    let answer = answer.trim();

    if game.remaining_attempts == 0 {
        return GameOutcome::Abandoned {
            reply: ABANDONED.to_string(),
        };
    }

    if answer.eq_ignore_ascii_case("skip") {
        stats.record_loss();
        return GameOutcome::Lost {
            reply: format!("skipped! it was {} 🤷", game.expected_answer),
        };
    }

    match game.kind {
        GameKind::Emoji => evaluate_emoji(game, answer, stats),
        GameKind::Math => evaluate_math(game, answer, stats),
        GameKind::NumberGuess => evaluate_number(game, answer, stats),
    }
}

fn evaluate_emoji(game: &mut GameState, answer: &str, stats: &mut ConversationStats) -> GameOutcome {
    let expected = game.expected_answer.to_lowercase();
    if !expected.is_empty() && answer.to_lowercase().contains(&expected) {
        let streak = stats.record_win();
        return GameOutcome::Won {
            reply: format!("W! 🏆 streak: {streak} 🔥"),
        };
    }

    game.remaining_attempts -= 1;
    if game.remaining_attempts == 0 {
        stats.record_loss();
        return GameOutcome::Lost {
            reply: format!("out of tries! it was {} 🎬", game.expected_answer),
        };
    }
    GameOutcome::Retry {
        reply: format!("nah, try again! hint: 🎬 ({} left)", game.remaining_attempts),
    }
}

fn evaluate_math(game: &mut GameState, answer: &str, stats: &mut ConversationStats) -> GameOutcome {
    if answer == game.expected_answer {
        let streak = stats.record_win();
        return GameOutcome::Won {
            reply: format!("genius! 🧠 streak: {streak}"),
        };
    }

    game.remaining_attempts -= 1;
    if game.remaining_attempts == 0 {
        stats.record_loss();
        return GameOutcome::Lost {
            reply: format!("L... it was {} 💀", game.expected_answer),
        };
    }
    GameOutcome::Retry {
        reply: format!("nope! {} left ⏱️", game.remaining_attempts),
    }
}

fn evaluate_number(game: &mut GameState, answer: &str, stats: &mut ConversationStats) -> GameOutcome {
    let Ok(target) = game.expected_answer.trim().parse::<i64>() else {
        return GameOutcome::Abandoned {
            reply: ABANDONED.to_string(),
        };
    };

    if answer == game.expected_answer.trim() {
        let streak = stats.record_win();
        return GameOutcome::Won {
            reply: format!("yooo psychic! 🔮 streak: {streak}"),
        };
    }

    game.remaining_attempts -= 1;
    if game.remaining_attempts == 0 {
        stats.record_loss();
        return GameOutcome::Lost {
            reply: format!("nah it was {target} 😅"),
        };
    }

    let left = game.remaining_attempts;
    let reply = match answer.parse::<i64>().ok() {
        Some(g) if g < target => format!("higher ⬆️ ({left} left)"),
        Some(_) => format!("lower ⬇️ ({left} left)"),
        None => format!("just gimme a number 1-10! 🎲 ({left} left)"),
    };
    GameOutcome::Retry { reply }
}
