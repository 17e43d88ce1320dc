//! Core conversation types: transcript messages and mood labels.
//!
//! These are shared by the classifiers, the prompt builder, the engine and
//! the presentation layer. A [`Message`] is immutable once appended to the
//! transcript.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Mood
// ---------------------------------------------------------------------------

/// Emotional tone attached to a message or persisted in the user profile.
///
/// `Helpful` and `Apologetic` are synthetic: the engine assigns them to
/// tool answers and error replies. The mood detector never returns them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MoodLabel {
    /// Positive, upbeat tone.
    Happy,
    /// Low, sorrowful tone.
    Sad,
    /// Irritated or hostile tone.
    Angry,
    /// Worried or fearful tone.
    Anxious,
    /// No dominant signal.
    #[default]
    Neutral,
    /// Assigned to locally computed tool answers.
    Helpful,
    /// Assigned to error and configuration replies.
    Apologetic,
}

impl MoodLabel {
    /// Moods the detector scores, in tie-breaking order.
    pub const SCORED: [MoodLabel; 4] = [Self::Happy, Self::Sad, Self::Angry, Self::Anxious];

    /// Stable string form, as persisted.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Happy => "Happy",
            Self::Sad => "Sad",
            Self::Angry => "Angry",
            Self::Anxious => "Anxious",
            Self::Neutral => "Neutral",
            Self::Helpful => "Helpful",
            Self::Apologetic => "Apologetic",
        }
    }

    /// Emoji the presentation layer shows next to bot messages.
    pub fn emoji(self) -> &'static str {
        match self {
            Self::Happy => "😊",
            Self::Sad => "😔",
            Self::Angry => "😌",
            Self::Anxious => "😟",
            Self::Neutral => "💭",
            Self::Helpful => "💡",
            Self::Apologetic => "😥",
        }
    }
}

impl fmt::Display for MoodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoodLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Ok(Self::Happy),
            "sad" => Ok(Self::Sad),
            "angry" => Ok(Self::Angry),
            "anxious" => Ok(Self::Anxious),
            "neutral" => Ok(Self::Neutral),
            "helpful" => Ok(Self::Helpful),
            "apologetic" => Ok(Self::Apologetic),
            other => Err(format!("unknown mood: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Who authored a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    /// The human user.
    User,
    /// The companion (model reply, tool answer or system notice).
    Bot,
}

/// A single entry in the visible transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message text.
    pub text: String,
    /// Author of the message.
    pub sender: Sender,
    /// Mood label attached to the message.
    pub mood: MoodLabel,
    /// When the message was appended.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message stamped with the current time.
    pub fn user(text: impl Into<String>, mood: MoodLabel) -> Self {
        Self {
            text: text.into(),
            sender: Sender::User,
            mood,
            timestamp: Utc::now(),
        }
    }

    /// Create a bot message stamped with the current time.
    pub fn bot(text: impl Into<String>, mood: MoodLabel) -> Self {
        Self {
            text: text.into(),
            sender: Sender::Bot,
            mood,
            timestamp: Utc::now(),
        }
    }
}
