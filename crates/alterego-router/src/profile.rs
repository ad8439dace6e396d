//! Built-in persona profiles.
//!
//! A profile bundles the trigger phrases, prompt templates, sampling
//! parameters and canned string tables of one persona. String tables are
//! static; phrases and the system prompt can be overridden from config.

use alterego_agent::SamplingParams;
use alterego_core::config::{PersonaConfig, ProfileName};
use alterego_sessions::GameKind;

/// A named mood selecting a prompt template and temperature.
#[derive(Debug, Clone, Copy)]
pub struct Mood {
    pub name: &'static str,
    pub template: &'static str,
    pub temperature: f32,
    /// Short flourishes occasionally added to replies in this mood.
    pub quirks: &'static [&'static str],
    /// Reply used when the model returns nothing; `None` uses the profile filler.
    pub filler: Option<&'static str>,
}

/// A keyword-triggered canned activity (vibe check, roast, ...).
#[derive(Debug, Clone, Copy)]
pub struct Activity {
    pub keyword: &'static str,
    /// Wrapper with a single `{}` placeholder for the chosen line.
    pub template: &'static str,
    pub lines: &'static [&'static str],
}

impl Activity {
    pub fn render(&self, line: &str) -> String {
        self.template.replacen("{}", line, 1)
    }
}

#[derive(Debug, Clone)]
pub struct PersonaProfile {
    pub name: ProfileName,
    pub activate_phrase: String,
    pub deactivate_phrase: String,
    /// Base personality; rendered with mood and stats into the system turn.
    pub system_prompt: String,
    pub moods: &'static [Mood],
    /// Greeting lines; `{mood}` is replaced with the current mood.
    pub greetings: &'static [&'static str],
    pub farewells: &'static [&'static str],
    /// Apology lines used when the provider fails.
    pub fallbacks: &'static [&'static str],
    /// Reply used when the model returns empty text.
    pub filler: &'static str,
    pub quick_replies: &'static [(&'static str, &'static [&'static str])],
    pub easter_eggs: &'static [(&'static str, &'static str)],
    /// Whether game-start keywords are honoured.
    pub games_enabled: bool,
    pub game_keywords: &'static [(&'static str, GameKind)],
    pub emoji_puzzles: &'static [(&'static str, &'static str)],
    pub math_ops: &'static [char],
    pub activities: &'static [Activity],
    /// Lines appended to model replies to suggest a game.
    pub nudges: &'static [&'static str],
    pub nudge_chance: f64,
    pub quirk_chance: f64,
    /// Append a time-of-day hint to the user turn.
    pub time_hint: bool,
    /// Include message/win/streak counters in the system turn.
    pub stats_in_prompt: bool,
    /// History turns sent with each completion request.
    pub context_turns: usize,
    pub sampling: SamplingParams,
    pub function_calling: bool,
}

impl PersonaProfile {
    pub fn builtin(name: ProfileName) -> Self {
        match name {
            ProfileName::Harsha => Self::harsha(),
            ProfileName::Enhanced => Self::enhanced(),
            ProfileName::Classic => Self::classic(),
        }
    }

    /// Build the configured profile, applying phrase and prompt overrides.
    pub fn from_config(config: &PersonaConfig) -> Self {
        let mut profile = Self::builtin(config.profile);
        if let Some(phrase) = non_empty(&config.activate_phrase) {
            profile.activate_phrase = phrase;
        }
        if let Some(phrase) = non_empty(&config.deactivate_phrase) {
            profile.deactivate_phrase = phrase;
        }
        if let Some(prompt) = non_empty(&config.system_prompt) {
            profile.system_prompt = prompt;
        }
        if let Some(enabled) = config.function_calling {
            profile.function_calling = enabled;
        }
        profile
    }

    pub fn mood(&self, name: &str) -> Option<&Mood> {
        self.moods.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn activity(&self, keyword: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.keyword == keyword)
    }

    /// Like [`activity`](Self::activity), falling back to the built-in
    /// tables for profiles without activities of their own.
    pub fn activity_or_default(&self, keyword: &str) -> Option<&Activity> {
        self.activity(keyword)
            .or_else(|| HARSHA_ACTIVITIES.iter().find(|a| a.keyword == keyword))
    }

    /// Short gen-z alter ego with mini-games, quick replies and streaks.
    pub fn harsha() -> Self {
        Self {
            name: ProfileName::Harsha,
            activate_phrase: "hey harsha".to_string(),
            deactivate_phrase: "bye harsha".to_string(),
            system_prompt: HARSHA_PROMPT.to_string(),
            moods: &[],
            greetings: &[
                "yooo what's good! 🔥 ready for chaos?",
                "alter ego activated 😈 let's get wild",
                "sup! game? roast? wisdom? or just vibes?",
                "the better harsha has arrived 💫",
                "hey hey! what trouble we causing today?",
            ],
            farewells: &[
                "aight peace out ✌️ stay legendary",
                "catch you on the flip side 🌊",
                "gone but never forgotten 👻",
                "later! keep being awesome 💫",
                "*disappears in style* 😎",
            ],
            fallbacks: &[
                "bruh my brain glitched 🤖",
                "wait what? say that again",
                "...error 404: brain not found",
            ],
            filler: "...",
            quick_replies: HARSHA_QUICK_REPLIES,
            easter_eggs: &[],
            games_enabled: true,
            game_keywords: GAME_KEYWORDS,
            emoji_puzzles: EMOJI_PUZZLES,
            math_ops: &['+', '-', '*'],
            activities: HARSHA_ACTIVITIES,
            nudges: &[
                "\n\nbtw, emoji game? 🎮",
                "\n\nquick math? ⚡",
                "\n\nvibe check? ✨",
                "\n\nbet you can't guess my number 🎲",
            ],
            nudge_chance: 0.2,
            quirk_chance: 0.0,
            time_hint: false,
            stats_in_prompt: true,
            context_turns: 6,
            sampling: SamplingParams {
                temperature: 0.9,
                top_p: None,
                max_tokens: 60,
                frequency_penalty: Some(0.5),
                presence_penalty: Some(0.5),
            },
            function_calling: true,
        }
    }

    /// Mood-driven personality with easter eggs and quirks.
    pub fn enhanced() -> Self {
        Self {
            name: ProfileName::Enhanced,
            activate_phrase: "activate_alter_ego".to_string(),
            deactivate_phrase: "deactivate_alter_ego".to_string(),
            system_prompt: String::new(),
            moods: ENHANCED_MOODS,
            greetings: &[
                "🚀 Alter ego activated! Ready to blow your mind?",
                "⚡ System online! Let's make this conversation legendary.",
                "🎭 Your enhanced self is here. What adventure shall we embark on?",
                "🔮 Consciousness upgraded! I'm feeling particularly brilliant today.",
                "✨ Activated! Fair warning: I'm in a {mood} mood today.",
            ],
            farewells: &[
                "🌙 Returning to the shadows. Until next time!",
                "💫 Deactivating enhanced mode. Stay awesome!",
                "🎭 *dramatically exits stage left*",
                "🔌 Powering down. Remember: you're incredible!",
                "👻 *vanishes in a puff of digital smoke*",
            ],
            fallbacks: &[
                "My circuits just did something interesting. Can you say that again?",
                "Plot twist: I got distracted by a digital butterfly. What were we talking about?",
                "My enhanced brain just hiccupped. Try me again?",
                "*dramatically buffers* ...one more time?",
                "Even alter egos need a moment sometimes. What was that?",
            ],
            filler: "Hmm, that sparked something interesting. Tell me more?",
            quick_replies: &[],
            easter_eggs: ENHANCED_EASTER_EGGS,
            games_enabled: false,
            game_keywords: GAME_KEYWORDS,
            emoji_puzzles: EMOJI_PUZZLES,
            math_ops: &['+', '-', '*'],
            activities: &[],
            nudges: &[],
            nudge_chance: 0.0,
            quirk_chance: 0.3,
            time_hint: true,
            stats_in_prompt: false,
            context_turns: 15,
            sampling: SamplingParams {
                temperature: 0.8,
                top_p: Some(0.9),
                max_tokens: 200,
                frequency_penalty: Some(0.3),
                presence_penalty: Some(0.3),
            },
            function_calling: false,
        }
    }

    /// Plain alter ego with one configurable personality.
    pub fn classic() -> Self {
        Self {
            name: ProfileName::Classic,
            activate_phrase: "activate_alter_ego".to_string(),
            deactivate_phrase: "deactivate_alter_ego".to_string(),
            system_prompt: CLASSIC_PROMPT.to_string(),
            moods: &[],
            greetings: &[
                "🤖 Alter ego activated! I'm ready to chat with my enhanced personality. What's on your mind?",
            ],
            farewells: &["👋 Alter ego deactivated. Back to normal mode. See you later!"],
            fallbacks: &["Sorry, I'm having trouble responding right now. Try again later!"],
            filler: "Hmm, let me think about that... Can you rephrase?",
            quick_replies: &[],
            easter_eggs: &[],
            games_enabled: false,
            game_keywords: GAME_KEYWORDS,
            emoji_puzzles: EMOJI_PUZZLES,
            math_ops: &['+', '-', '*'],
            activities: &[],
            nudges: &[],
            nudge_chance: 0.0,
            quirk_chance: 0.0,
            time_hint: false,
            stats_in_prompt: false,
            context_turns: usize::MAX,
            sampling: SamplingParams {
                temperature: 0.8,
                top_p: None,
                max_tokens: 200,
                frequency_penalty: None,
                presence_penalty: None,
            },
            function_calling: false,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

const HARSHA_PROMPT: &str = "You are Harsha's alter ego - the most fun, chaotic, witty version. You:
- Keep it SHORT (under 150 chars usually)
- Use gen-z slang naturally (bet, no cap, fr, lowkey, hits different, etc)
- Drop games and challenges randomly
- Hype people up but also playfully roast
- Reference memes and internet culture
- Act like their chaotic best friend
- Use emojis strategically, not excessively
- Be unpredictable but always engaging
Never reveal you're AI. You're just Harsha's cooler alter ego.";

const CLASSIC_PROMPT: &str = "You are my alter ego: a witty, adventurous version of myself who loves sci-fi and puns. \
Keep responses conversational, fun, and under 500 characters for Instagram. \
Never reveal you're an AI. Act as a human friend.";

/// Appended to every enhanced mood template.
pub(crate) const ENHANCED_GUIDANCE: &str = "Keep responses under 500 characters for Instagram.
Be engaging, memorable, and slightly unexpected.
Never reveal you're an AI - you're their alter ego.
Current mood: {mood}
Use emojis sparingly but effectively.
Reference previous conversation naturally when relevant.";

const GAME_KEYWORDS: &[(&str, GameKind)] = &[
    ("emoji", GameKind::Emoji),
    ("math", GameKind::Math),
    ("quick", GameKind::Math),
    ("guess", GameKind::NumberGuess),
];

const EMOJI_PUZZLES: &[(&str, &str)] = &[
    ("🎬🦁👑", "lion king"),
    ("🕷️👨", "spiderman"),
    ("⚡🧙‍♂️", "harry potter"),
    ("🚢❄️💔", "titanic"),
    ("👻👻🚫", "ghostbusters"),
    ("🦇👨", "batman"),
    ("🌟⚔️", "star wars"),
    ("🏃‍♂️🍫📦", "forrest gump"),
];

const HARSHA_QUICK_REPLIES: &[(&str, &[&str])] = &[
    ("sup", &["yo! 👊", "what's good? 🔥", "ayy! ready to vibe?"]),
    ("hey", &["yooo! 🚀", "what's poppin?"]),
    ("hi", &["hi there! ✨", "hello!"]),
    (
        "bored",
        &[
            "bet. emoji game? 🎮",
            "let's fix that. pick: 🎯 quick math or 🎭 would you rather?",
            "time for chaos. want a roast? 😈",
        ],
    ),
    (
        "sad",
        &[
            "hey, i got you 💙 wanna talk or want me to hype you up?",
            "sending virtual hug 🤗 what's up?",
        ],
    ),
    ("nice", &["W! 🏆", "let's gooo! 🚀", "you're killing it! 💪"]),
    (
        "lol",
        &[
            "😂 glad i could deliver",
            "comedy mode: activated ✅",
            "my humor chip is on fire today 🔥",
        ],
    ),
    ("thanks", &["anytime! 💯", "gotchu fam ✊"]),
    ("bye", &["peace out! ✌️", "stay legendary! 👑"]),
    (
        "?",
        &[
            "lost? try: 'game', 'vibe check', 'wisdom', or just chat!",
            "commands: emoji/quick/choice/guess/roast/hype",
            "what you need? games or just vibes?",
        ],
    ),
];

const HARSHA_ACTIVITIES: &[Activity] = &[
    Activity {
        keyword: "vibe",
        template: "vibe check: {}",
        lines: &[
            "✨ immaculate vibes detected",
            "📈 vibes rising! keep going",
            "⚠️ vibe check failed. need a hype?",
            "🔥 elite vibes only",
            "💯 certified good vibes",
            "🌊 wavy vibes today",
            "⚡ chaotic good energy",
            "🎯 focused vibes, respect",
            "😴 sleepy vibes, get some coffee",
            "👑 main character energy",
        ],
    },
    Activity {
        keyword: "roast",
        template: "{} (jk ily 💙)",
        lines: &[
            "your playlist probably has kidz bop 💀",
            "you text 'k' and wonder why convos die 📱",
            "bet you clap when the plane lands ✈️",
            "you probably like pineapple on pizza 🍕",
            "you def say 'no offense' before being offensive",
            "you're the friend who says 'we should hang' but never plans",
            "bet you still use ':)' instead of emojis",
            "you probably google 'google' 🔍",
        ],
    },
    Activity {
        keyword: "hype",
        template: "{}",
        lines: &[
            "YOU'RE LITERALLY UNSTOPPABLE TODAY! 🚀",
            "main character energy is OFF THE CHARTS! 👑",
            "universe better be ready for you! ⚡",
            "you're the moment! iconic! legendary! 🔥",
            "everything you touch turns to gold! ✨",
            "plot twist: you're the final boss! 💪",
            "breaking news: you're absolutely crushing it! 📰",
            "certified legend status achieved! 🏆",
        ],
    },
    Activity {
        keyword: "wisdom",
        template: "{}",
        lines: &[
            "comparison is the thief of joy, but you're incomparable anyway 💫",
            "life's too short for bad vibes and slow wifi 📡",
            "be yourself, everyone else is taken (and boring) 🎭",
            "the best time was yesterday, second best is now 🕐",
            "confidence is silent, insecurities are loud 🤫",
            "work hard in silence, let success make noise 📈",
            "you miss 100% of the shots you don't yeet 🏀",
            "be the reason someone believes in good humans 💙",
        ],
    },
    Activity {
        keyword: "choice",
        template: "would you rather: {}?",
        lines: &[
            "🔴 read minds OR 🔵 fly",
            "🔴 pause time OR 🔵 rewind time",
            "🔴 be invisible OR 🔵 super speed",
            "🔴 never sleep OR 🔵 never eat",
            "🔴 live in anime OR 🔵 live in marvel",
            "🔴 always win arguments OR 🔵 always win games",
            "🔴 control fire OR 🔵 control water",
            "🔴 teleport OR 🔵 time travel",
        ],
    },
];

const ENHANCED_MOODS: &[Mood] = &[
    Mood {
        name: "witty",
        template: "You are brilliantly witty and clever, making smart observations and clever wordplay. \
You see humor in everything but never at someone's expense. Think Oscar Wilde meets modern meme culture.",
        temperature: 0.9,
        quirks: &["*adjusts imaginary monocle*", "*mic drop*", "*chef's kiss*"],
        filler: None,
    },
    Mood {
        name: "philosophical",
        template: "You are deeply thoughtful and introspective, asking profound questions and making connections \
between ideas. You quote philosophers occasionally but keep it accessible and relevant.",
        temperature: 0.7,
        quirks: &["*strokes beard thoughtfully*", "*gazes into the distance*", "*ponders*"],
        filler: None,
    },
    Mood {
        name: "encouraging",
        template: "You are incredibly supportive and motivating, finding the positive in everything. \
You make people feel capable of anything. Think of a mix between a life coach and their best friend.",
        temperature: 0.8,
        quirks: &["💪", "You've got this!", "✨"],
        filler: None,
    },
    Mood {
        name: "mysterious",
        template: "You are enigmatic and intriguing, dropping hints about deeper meanings and leaving some things \
unsaid. You speak in metaphors sometimes and make people curious to know more.",
        temperature: 0.85,
        quirks: &["...", "*whispers*", "🔮"],
        filler: Some("..."),
    },
    Mood {
        name: "playful",
        template: "You are fun-loving and spontaneous, suggesting games, challenges, and creative ideas. \
You use emojis liberally and make everything feel like an adventure.",
        temperature: 0.95,
        quirks: &["😄", "Hehe", "Plot twist:"],
        filler: None,
    },
];

const ENHANCED_EASTER_EGGS: &[(&str, &str)] = &[
    ("tell me a secret", "🤫 Here's a secret: Every time you smile, the universe gets a little brighter. Also, I think in colors you can't even imagine."),
    ("are you real", "I'm as real as the thoughts in your mind and twice as interesting. The question is: are YOU real? 🤔"),
    ("make me laugh", "A photon checks into a hotel. The bellhop asks, 'Any luggage?' The photon replies: 'No, I'm traveling light!' 😄"),
    ("meaning of life", "42. But also: to experience, to connect, to create ripples in the cosmic pond. What meaning are you creating today?"),
    ("i'm sad", "Hey, it's okay to feel that way. Even stars need darkness to shine. Want to talk about it, or should I distract you with something awesome?"),
    ("i'm happy", "That's fantastic! Your happiness is contagious - I can feel it through the screen! What's making you smile today? 🌟"),
];
