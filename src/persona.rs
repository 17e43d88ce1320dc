//! Personas, mood-keyed tone phrases, and the optional reply flourish.
//!
//! A persona only shapes generated phrasing: its id is carried verbatim into
//! the system prompt and it never influences classification.

use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::MoodLabel;

// ---------------------------------------------------------------------------
// Persona
// ---------------------------------------------------------------------------

/// Named style profile applied to generated replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PersonaId {
    /// Warm, empathetic, and encouraging.
    #[default]
    Supportive,
    /// Serene, wise, and grounding.
    Calm,
    /// Upbeat, positive, and motivating.
    Cheerful,
    /// Direct, clear, and solution-focused.
    Practical,
}

impl PersonaId {
    /// Every persona, in presentation order.
    pub const ALL: [PersonaId; 4] = [Self::Supportive, Self::Calm, Self::Cheerful, Self::Practical];

    /// Identifier embedded in prompts and persisted.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Supportive => "Supportive",
            Self::Calm => "Calm",
            Self::Cheerful => "Cheerful",
            Self::Practical => "Practical",
        }
    }

    /// Human-readable persona name.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Supportive => "Supportive Friend",
            Self::Calm => "Calm Mentor",
            Self::Cheerful => "Cheerful Coach",
            Self::Practical => "Practical Guide",
        }
    }

    /// One-line description for persona pickers.
    pub fn description(self) -> &'static str {
        match self {
            Self::Supportive => "Warm, empathetic, and encouraging",
            Self::Calm => "Serene, wise, and grounding",
            Self::Cheerful => "Upbeat, positive, and motivating",
            Self::Practical => "Direct, clear, and solution-focused",
        }
    }

    fn touches(self) -> (&'static str, &'static str) {
        match self {
            Self::Supportive => ("I'm here for you. ", "You're not alone in this. "),
            Self::Calm => ("Take a deep breath. ", "Let's approach this mindfully. "),
            Self::Cheerful => ("You've got this! ", "Looking on the bright side, "),
            Self::Practical => ("Let's focus on solutions. ", "Here's what might help: "),
        }
    }
}

impl fmt::Display for PersonaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PersonaId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown persona: {wanted:?}"))
    }
}

// ---------------------------------------------------------------------------
// Tone
// ---------------------------------------------------------------------------

const HAPPY_TONES: &[&str] = &[
    "cheerful and encouraging",
    "bright and celebratory",
    "upbeat and affirming",
];
const SAD_TONES: &[&str] = &[
    "empathetic and gentle",
    "soft and compassionate",
    "patient and comforting",
];
const ANGRY_TONES: &[&str] = &[
    "calm and validating",
    "steady and non-judgmental",
    "measured and understanding",
];
const ANXIOUS_TONES: &[&str] = &[
    "reassuring and grounding",
    "slow-paced and soothing",
    "steady and reassuring",
];
const NEUTRAL_TONES: &[&str] = &[
    "warm and supportive",
    "friendly and attentive",
    "curious and caring",
];

/// Tone phrases available for a mood. Synthetic moods share the neutral list.
pub fn tones_for(mood: MoodLabel) -> &'static [&'static str] {
    match mood {
        MoodLabel::Happy => HAPPY_TONES,
        MoodLabel::Sad => SAD_TONES,
        MoodLabel::Angry => ANGRY_TONES,
        MoodLabel::Anxious => ANXIOUS_TONES,
        MoodLabel::Neutral | MoodLabel::Helpful | MoodLabel::Apologetic => NEUTRAL_TONES,
    }
}

/// Pick one tone descriptor for `mood` uniformly at random.
pub fn tone_for<R: Rng + ?Sized>(mood: MoodLabel, rng: &mut R) -> &'static str {
    tones_for(mood)
        .choose(rng)
        .copied()
        .unwrap_or("warm and supportive")
}

// ---------------------------------------------------------------------------
// Flourish
// ---------------------------------------------------------------------------

/// Probability of prepending a persona touch.
const TOUCH_PROBABILITY: f64 = 0.4;
/// Probability of appending a mood emoji.
const EMOJI_PROBABILITY: f64 = 0.3;
/// Probability of choosing the first of a persona's two touches.
const FIRST_TOUCH_PROBABILITY: f64 = 0.3;

/// Cosmetic, randomized post-processing of completed model replies.
///
/// Splits run-on sentences into paragraphs, sometimes prepends a persona
/// phrase (never for angry users), and sometimes appends a mood emoji.
#[derive(Debug, Clone)]
pub struct Flourish {
    sentence_break: Regex,
}

impl Flourish {
    /// Compile the sentence-break pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            sentence_break: Regex::new(r"\. ([A-Z])")?,
        })
    }

    /// Apply the flourish to `text`.
    pub fn apply<R: Rng + ?Sized>(
        &self,
        text: &str,
        mood: MoodLabel,
        persona: PersonaId,
        rng: &mut R,
    ) -> String {
        let mut out = self
            .sentence_break
            .replace_all(text, ".\n\n$1")
            .into_owned();

        let (first, second) = persona.touches();
        let touch = if rng.gen_bool(FIRST_TOUCH_PROBABILITY) {
            first
        } else {
            second
        };
        if rng.gen_bool(TOUCH_PROBABILITY) && mood != MoodLabel::Angry {
            out.insert_str(0, touch);
        }

        if rng.gen_bool(EMOJI_PROBABILITY) {
            out.push(' ');
            out.push_str(flourish_emoji(mood));
        }
        out
    }
}

fn flourish_emoji(mood: MoodLabel) -> &'static str {
    match mood {
        MoodLabel::Sad | MoodLabel::Angry | MoodLabel::Happy => mood.emoji(),
        _ => MoodLabel::Neutral.emoji(),
    }
}
