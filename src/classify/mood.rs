//! Keyword-tier mood detection with negation dampening.
//!
//! Each scored mood carries three keyword tiers worth 3, 2 and 1 points.
//! Keywords are matched as substrings of the lower-cased message, so
//! `"mad"` also fires inside `"made"`. The one exception is a keyword
//! sitting inside a longer keyword of another mood: `"unhappy"` scores Sad
//! and its inner `"happy"` is not counted. Every occurrence of a negation term
//! opens a window from 3 bytes before to 20 bytes after its start; each
//! mood keyword found inside that window takes 2 points off its mood.
//!
//! Overlapping windows from unrelated negations can dampen a mood the user
//! never negated. This is accepted noise for a heuristic classifier.

use crate::types::MoodLabel;

/// Points for a high-tier keyword hit.
pub const HIGH_WEIGHT: u32 = 3;
/// Points for a medium-tier keyword hit.
pub const MEDIUM_WEIGHT: u32 = 2;
/// Points for a low-tier keyword hit.
pub const LOW_WEIGHT: u32 = 1;
/// Points removed per keyword found inside a negation window.
pub const NEGATION_PENALTY: u32 = 2;
/// Bytes inspected before a negation term's start index.
pub const NEGATION_LOOKBEHIND: usize = 3;
/// Bytes inspected after a negation term's start index.
pub const NEGATION_LOOKAHEAD: usize = 20;

/// Weighted keyword lists for a single mood.
#[derive(Debug, Clone, Copy)]
pub struct KeywordTiers {
    /// Strong indicators.
    pub high: &'static [&'static str],
    /// Moderate indicators.
    pub medium: &'static [&'static str],
    /// Weak indicators.
    pub low: &'static [&'static str],
}

impl KeywordTiers {
    fn weighted(&self) -> impl Iterator<Item = (&'static str, u32)> + '_ {
        self.high
            .iter()
            .map(|k| (*k, HIGH_WEIGHT))
            .chain(self.medium.iter().map(|k| (*k, MEDIUM_WEIGHT)))
            .chain(self.low.iter().map(|k| (*k, LOW_WEIGHT)))
    }

    fn all(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.weighted().map(|(k, _)| k)
    }
}

/// Static keyword data injected into a [`MoodDetector`].
#[derive(Debug, Clone)]
pub struct MoodLexicon {
    /// Scored moods with their keyword tiers, in tie-breaking order.
    pub moods: Vec<(MoodLabel, KeywordTiers)>,
    /// Terms that open a negation window.
    pub negations: &'static [&'static str],
}

const HAPPY: KeywordTiers = KeywordTiers {
    high: &["happy", "joyful", "thrilled", "ecstatic", "delighted", "wonderful"],
    medium: &["good", "great", "glad", "excited", "cheerful", "grateful"],
    low: &["fine", "okay", "nice", "better", "relieved"],
};

const SAD: KeywordTiers = KeywordTiers {
    high: &["depressed", "miserable", "heartbroken", "hopeless", "devastated", "unhappy"],
    medium: &["sad", "lonely", "crying", "empty", "down", "awful"],
    low: &["tired", "bad", "blue", "alone", "terrible"],
};

const ANGRY: KeywordTiers = KeywordTiers {
    high: &["furious", "enraged", "livid", "outraged", "hate"],
    medium: &["angry", "mad", "frustrated", "irritated", "annoyed"],
    low: &["upset", "bothered", "fed up", "resent"],
};

const ANXIOUS: KeywordTiers = KeywordTiers {
    high: &["anxious", "panic", "terrified", "dread"],
    medium: &["worried", "nervous", "stressed", "overwhelmed", "scared", "afraid"],
    low: &["uneasy", "tense", "restless", "concerned"],
};

const NEGATIONS: &[&str] = &[
    "not", "don't", "dont", "never", "isn't", "wasn't", "can't", "won't", "didn't", "no longer",
    "hardly",
];

impl Default for MoodLexicon {
    fn default() -> Self {
        Self {
            moods: vec![
                (MoodLabel::Happy, HAPPY),
                (MoodLabel::Sad, SAD),
                (MoodLabel::Angry, ANGRY),
                (MoodLabel::Anxious, ANXIOUS),
            ],
            negations: NEGATIONS,
        }
    }
}

/// Heuristic mood classifier over free text.
#[derive(Debug, Clone, Default)]
pub struct MoodDetector {
    lexicon: MoodLexicon,
}

impl MoodDetector {
    /// Create a detector over the given keyword data.
    pub fn new(lexicon: MoodLexicon) -> Self {
        Self { lexicon }
    }

    /// Per-mood scores after negation dampening, in lexicon order.
    pub fn scores(&self, message: &str) -> Vec<(MoodLabel, u32)> {
        let lowered = message.to_lowercase();

        self.lexicon
            .moods
            .iter()
            .enumerate()
            .map(|(index, (mood, tiers))| {
                let text = self.without_shadowing(&lowered, index);
                let mut score = tiers
                    .weighted()
                    .filter(|(keyword, _)| text.contains(keyword))
                    .fold(0u32, |acc, (_, weight)| acc.saturating_add(weight));

                for negation in self.lexicon.negations {
                    for (start, _) in text.match_indices(negation) {
                        let window = negation_window(&text, start);
                        for keyword in tiers.all() {
                            if window.contains(keyword) {
                                score = score.saturating_sub(NEGATION_PENALTY);
                            }
                        }
                    }
                }
                (*mood, score)
            })
            .collect()
    }

    /// Blank out other moods' keywords that contain one of this mood's keywords.
    fn without_shadowing(&self, lowered: &str, index: usize) -> String {
        let mut text = lowered.to_owned();
        let Some((_, own)) = self.lexicon.moods.get(index) else {
            return text;
        };
        for (other_index, (_, tiers)) in self.lexicon.moods.iter().enumerate() {
            if other_index == index {
                continue;
            }
            for longer in tiers.all() {
                if own.all().any(|k| k != longer && longer.contains(k)) {
                    text = text.replace(longer, &" ".repeat(longer.len()));
                }
            }
        }
        text
    }

    /// Classify a message. Ties keep the earliest mood; a zero top score is `Neutral`.
    pub fn detect(&self, message: &str) -> MoodLabel {
        let mut best = (MoodLabel::Neutral, 0u32);
        for (mood, score) in self.scores(message) {
            if score > best.1 {
                best = (mood, score);
            }
        }
        best.0
    }
}

/// Slice of `text` around a negation starting at byte `start`, snapped to char boundaries.
fn negation_window(text: &str, start: usize) -> &str {
    let mut from = start.saturating_sub(NEGATION_LOOKBEHIND);
    while !text.is_char_boundary(from) {
        from = from.saturating_sub(1);
    }
    let mut to = start.saturating_add(NEGATION_LOOKAHEAD).min(text.len());
    while !text.is_char_boundary(to) {
        to = to.saturating_add(1);
    }
    &text[from..to]
}
