//! User profile accretion and profile/persona persistence.
//!
//! The profile is mutated once per completed turn (tool turns included) and
//! written back through the [`KeyValueStore`] after every mutation. Stored
//! values that fail to deserialize are discarded in favour of defaults.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::classify::GENERAL_TOPIC;
use crate::persona::PersonaId;
use crate::store::{KeyValueStore, StoreError};
use crate::types::MoodLabel;

/// Store key holding the [`UserProfile`].
pub const PROFILE_KEY: &str = "userProfile";
/// Store key holding the selected [`PersonaId`].
pub const PERSONA_KEY: &str = "botPersona";
/// Maximum number of remembered topics.
pub const MAX_TOPICS: usize = 5;

/// Accreting record of what the companion knows about the user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    /// First name, once the user has introduced themselves.
    pub name: Option<String>,
    /// Mood detected on the most recently completed user turn.
    pub mood: MoodLabel,
    /// Recently discussed topics, oldest first.
    pub topics: Vec<String>,
}

impl UserProfile {
    /// Fold a completed turn into the profile.
    ///
    /// `mood` is the detected user mood, never the reply label. Topics are
    /// appended in order; a topic already present moves to the end, the
    /// placeholder topic is ignored, and the oldest topics are evicted past
    /// [`MAX_TOPICS`]. `name` is only applied when no name is known yet.
    pub fn record_turn(&mut self, mood: MoodLabel, topics: &[String], name: Option<String>) {
        self.mood = mood;

        for topic in topics.iter().filter(|t| t.as_str() != GENERAL_TOPIC) {
            self.topics.retain(|existing| existing != topic);
            self.topics.push(topic.clone());
        }
        if self.topics.len() > MAX_TOPICS {
            let excess = self.topics.len().saturating_sub(MAX_TOPICS);
            self.topics.drain(..excess);
        }

        if self.name.is_none() {
            self.name = name;
        }
    }
}

/// Pulls a first name out of "my name is ..." introductions.
#[derive(Debug, Clone)]
pub struct NameExtractor {
    pattern: Regex,
}

impl NameExtractor {
    /// Compile the introduction pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(r"(?i)my name is (\w+)")?,
        })
    }

    /// The introduced name, if the message contains one.
    pub fn extract(&self, message: &str) -> Option<String> {
        self.pattern
            .captures(message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_owned())
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Load the stored profile, falling back to the default on absence or corruption.
pub fn load_profile(store: &dyn KeyValueStore) -> UserProfile {
    match store.get(PROFILE_KEY, Value::Null) {
        Value::Null => UserProfile::default(),
        raw => serde_json::from_value(raw).unwrap_or_else(|e| {
            warn!(key = PROFILE_KEY, error = %e, "discarding unreadable profile");
            UserProfile::default()
        }),
    }
}

/// Persist `profile`.
///
/// # Errors
///
/// Returns [`StoreError`] if serialization or the write fails.
pub fn save_profile(store: &dyn KeyValueStore, profile: &UserProfile) -> Result<(), StoreError> {
    store.set(PROFILE_KEY, serde_json::to_value(profile)?)
}

/// Load the stored persona, falling back to the default on absence or corruption.
pub fn load_persona(store: &dyn KeyValueStore) -> PersonaId {
    match store.get(PERSONA_KEY, Value::Null) {
        Value::String(raw) => raw.parse().unwrap_or_else(|e: String| {
            warn!(key = PERSONA_KEY, error = %e, "discarding unknown persona");
            PersonaId::default()
        }),
        Value::Null => PersonaId::default(),
        other => {
            warn!(key = PERSONA_KEY, value = %other, "discarding malformed persona");
            PersonaId::default()
        }
    }
}

/// Persist `persona`.
///
/// # Errors
///
/// Returns [`StoreError`] if the write fails.
pub fn save_persona(store: &dyn KeyValueStore, persona: PersonaId) -> Result<(), StoreError> {
    store.set(PERSONA_KEY, Value::String(persona.as_str().to_owned()))
}
