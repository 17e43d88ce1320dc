//! Prompt assembly: system instruction, bounded history and the new user turn.
//!
//! The builder is backend-agnostic. Providers map [`ModelRequest`] onto their
//! own wire format.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::classify::GENERAL_TOPIC;
use crate::knowledge::KnowledgeBase;
use crate::persona::{tone_for, PersonaId};
use crate::profile::UserProfile;
use crate::types::{Message, MoodLabel, Sender};

/// Number of prior transcript messages sent as context.
pub const DEFAULT_HISTORY_WINDOW: usize = 6;
/// Sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Output length limit.
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;

const GUIDELINES: &str = "Guidelines:
- Be empathetic and validate the user's feelings
- Provide evidence-based coping strategies when appropriate
- Never diagnose or prescribe treatment
- If there are signs of crisis, gently suggest professional resources (like mentioning talking to a professional or providing a helpline number if appropriate and safe)
- Keep responses conversational and authentic
- Use occasional emojis for emotional warmth, but be judicious with serious topics";

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Conversation role in the model's vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human turn.
    User,
    /// Companion turn.
    Model,
}

/// One context turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author role.
    pub role: Role,
    /// Turn text.
    pub content: String,
}

impl ChatMessage {
    fn from_transcript(message: &Message) -> Self {
        let role = match message.sender {
            Sender::User => Role::User,
            Sender::Bot => Role::Model,
        };
        Self {
            role,
            content: message.text.clone(),
        }
    }
}

/// Backend-agnostic model request.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    /// System instruction.
    pub system: String,
    /// Recent history followed by the new user turn.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output length limit.
    pub max_output_tokens: u32,
    /// Whether an incremental stream is requested.
    pub stream: bool,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Fixed request limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PromptLimits {
    /// Prior messages kept as context.
    pub history_window: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Output length limit.
    pub max_output_tokens: u32,
    /// Request a streamed reply.
    pub stream: bool,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            history_window: DEFAULT_HISTORY_WINDOW,
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            stream: true,
        }
    }
}

/// Assembles [`ModelRequest`]s.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    knowledge: KnowledgeBase,
    limits: PromptLimits,
}

impl PromptBuilder {
    /// Create a builder over `knowledge` with fixed `limits`.
    pub fn new(knowledge: KnowledgeBase, limits: PromptLimits) -> Self {
        Self { knowledge, limits }
    }

    /// Request limits in effect.
    pub fn limits(&self) -> PromptLimits {
        self.limits
    }

    /// Build a request for `user_message`.
    ///
    /// `history` is the transcript before this turn; only its last
    /// `history_window` entries are used.
    pub fn build<R: Rng + ?Sized>(
        &self,
        user_message: &str,
        mood: MoodLabel,
        persona: PersonaId,
        profile: &UserProfile,
        history: &[Message],
        rng: &mut R,
    ) -> ModelRequest {
        let tone = tone_for(mood, rng);
        let background = self.knowledge.retrieve(user_message);
        let system = system_instruction(persona, mood, profile, background.as_deref(), tone);

        let start = history.len().saturating_sub(self.limits.history_window);
        let mut messages: Vec<ChatMessage> = history[start..]
            .iter()
            .map(ChatMessage::from_transcript)
            .collect();
        messages.push(ChatMessage {
            role: Role::User,
            content: user_message.to_owned(),
        });

        ModelRequest {
            system,
            messages,
            temperature: self.limits.temperature,
            max_output_tokens: self.limits.max_output_tokens,
            stream: self.limits.stream,
        }
    }
}

/// Render the system instruction.
///
/// Sections: persona, mood, remembered topics, name (if known), background
/// facts (if any), tone directive, guidelines.
pub fn system_instruction(
    persona: PersonaId,
    mood: MoodLabel,
    profile: &UserProfile,
    background: Option<&[&str]>,
    tone: &str,
) -> String {
    let mut sections: Vec<String> = Vec::new();

    sections.push(format!(
        "You are a mental health support assistant with a {persona} persona."
    ));

    let topics = if profile.topics.is_empty() {
        GENERAL_TOPIC.to_owned()
    } else {
        profile.topics.join(", ")
    };
    let mut state = format!(
        "The user's current mood appears to be: {mood}\nTheir conversation history shows interest in: {topics}"
    );
    if let Some(name) = &profile.name {
        state.push_str(&format!("\nTheir name is {name}."));
    }
    sections.push(state);

    if let Some(facts) = background {
        sections.push(format!("Relevant background information: {}", facts.join(" ")));
    }

    sections.push(format!("Please respond in a {tone} tone."));
    sections.push(format!(
        "{GUIDELINES}\n- Tailor your language to a {persona} communication style"
    ));

    sections.join("\n\n")
}
