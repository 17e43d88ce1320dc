//! Conversation orchestrator and turn state machine.
//!
//! One [`ConversationEngine`] owns a single conversation: the append-only
//! transcript, the user profile, the selected persona and at most one
//! in-flight turn. Turns move `Idle -> Requesting -> Streaming` and end as a
//! [`TurnOutcome`]; the status always returns to `Idle`, whatever the exit
//! path.
//!
//! Every failure inside a turn is recovered into an apologetic transcript
//! message. Only refusals at the boundary ([`EngineError`]) reach the caller,
//! and those change nothing.

use std::sync::{Arc, Mutex, MutexGuard};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::classify::{MoodDetector, MoodLexicon, TopicIdentifier};
use crate::knowledge::KnowledgeBase;
use crate::persona::{Flourish, PersonaId};
use crate::profile::{self, NameExtractor, UserProfile};
use crate::prompt::{PromptBuilder, PromptLimits};
use crate::providers::{ModelBackend, ProviderError};
use crate::store::KeyValueStore;
use crate::tools::{ToolAnswers, ToolError, ToolId, ToolRegistry};
use crate::types::{Message, MoodLabel};

mod stream;

use stream::StreamEnd;

/// Transcript text appended when the user cancels a turn.
pub const CANCELLED_MESSAGE: &str = "Request cancelled.";

const GENERIC_APOLOGY: &str =
    "I'm so sorry, I seem to be having trouble right now. Let's try again in a moment. 😥";
const CONFIGURATION_APOLOGY: &str = "I'm sorry, but I'm not properly configured. Please make sure the API key is set in your environment or in ~/.kindred/.env.";
const RATE_LIMITED_APOLOGY: &str =
    "I'm getting a lot of messages right now. Let's pause for a moment and try again shortly. 😥";
const SERVER_APOLOGY: &str =
    "The service I rely on is having trouble at the moment. Please try again in a little while. 😥";

// ---------------------------------------------------------------------------
// Errors and outcomes
// ---------------------------------------------------------------------------

/// Submissions refused at the engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// The message was empty after trimming.
    #[error("message is empty")]
    EmptyMessage,
    /// Another turn is still in flight.
    #[error("a turn is already in flight")]
    TurnInFlight,
}

/// Failures recovered inside a turn.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// No usable credential or backend.
    #[error("model backend is not configured")]
    Configuration,
    /// The endpoint answered with a non-success status.
    #[error("model API returned status {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Server-provided message.
        message: String,
    },
    /// Transport, decoding or empty-reply failure.
    #[error("streaming failed: {0}")]
    Streaming(String),
    /// A local tool could not produce an answer.
    #[error("tool failed: {0}")]
    ToolExecution(#[from] ToolError),
}

impl TurnError {
    /// Fixed transcript copy shown for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Configuration => CONFIGURATION_APOLOGY,
            Self::Api { status: 429, .. } => RATE_LIMITED_APOLOGY,
            Self::Api { status, .. } if *status >= 500 => SERVER_APOLOGY,
            Self::Api { .. } | Self::Streaming(_) | Self::ToolExecution(_) => GENERIC_APOLOGY,
        }
    }
}

impl From<ProviderError> for TurnError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::HttpStatus { status, message } => Self::Api { status, message },
            ProviderError::Unavailable(_) => Self::Configuration,
            other => Self::Streaming(other.to_string()),
        }
    }
}

/// Where a completed reply came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplySource {
    /// Answered locally by a tool.
    Tool(ToolId),
    /// Generated by the remote model.
    Model,
}

/// Terminal result of a turn.
#[derive(Debug)]
pub enum TurnOutcome {
    /// A reply was appended and the profile updated.
    Answered {
        /// Reply text as appended to the transcript.
        reply: String,
        /// Reply origin.
        source: ReplySource,
    },
    /// The user cancelled; the profile is unchanged.
    Cancelled,
    /// An apology was appended; the profile is unchanged.
    Failed(TurnError),
}

/// Non-terminal turn states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnState {
    /// Ready for a submission.
    #[default]
    Idle,
    /// Request sent, no reply yet.
    Requesting,
    /// Reply fragments arriving.
    Streaming,
}

/// Snapshot published to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TurnStatus {
    /// Current state.
    pub state: TurnState,
    /// A turn is in flight.
    pub loading: bool,
    /// Fragments are arriving.
    pub streaming: bool,
}

impl TurnStatus {
    fn of(state: TurnState) -> Self {
        Self {
            state,
            loading: state != TurnState::Idle,
            streaming: state == TurnState::Streaming,
        }
    }
}

/// The single in-flight turn.
#[derive(Debug)]
struct PendingTurn {
    id: Uuid,
    token: CancellationToken,
}

/// Releases the pending slot and resets observables on every exit path.
struct TurnGuard<'a> {
    engine: &'a ConversationEngine,
    id: Uuid,
    token: CancellationToken,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        let mut pending = lock(&self.engine.pending);
        if pending.as_ref().is_some_and(|p| p.id == self.id) {
            *pending = None;
        }
        drop(pending);
        self.engine.partial_tx.send_replace(String::new());
        self.engine.status_tx.send_replace(TurnStatus::default());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Construction-time knobs.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Prompt limits.
    pub limits: PromptLimits,
    /// Apply the randomized reply flourish.
    pub flourishes: bool,
    /// Seed for the random source; entropy when unset.
    pub seed: Option<u64>,
    /// Knowledge base used for topics and background facts.
    pub knowledge: KnowledgeBase,
    /// Keyword data for mood detection.
    pub lexicon: MoodLexicon,
    /// Answer lists for the random-pick tools.
    pub tool_answers: ToolAnswers,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            limits: PromptLimits::default(),
            flourishes: true,
            seed: None,
            knowledge: KnowledgeBase::default(),
            lexicon: MoodLexicon::default(),
            tool_answers: ToolAnswers::default(),
        }
    }
}

/// Mood-aware conversation orchestrator.
pub struct ConversationEngine {
    detector: MoodDetector,
    topics: TopicIdentifier,
    tools: ToolRegistry,
    prompts: PromptBuilder,
    names: NameExtractor,
    flourish: Option<Flourish>,
    backend: Option<Arc<dyn ModelBackend>>,
    store: Arc<dyn KeyValueStore>,
    rng: Mutex<StdRng>,
    transcript: Mutex<Vec<Message>>,
    profile: Mutex<UserProfile>,
    persona: Mutex<PersonaId>,
    pending: Mutex<Option<PendingTurn>>,
    partial_tx: watch::Sender<String>,
    status_tx: watch::Sender<TurnStatus>,
}

impl std::fmt::Debug for ConversationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationEngine")
            .field("backend", &self.backend.as_ref().map(|b| b.model_id()))
            .field("persona", &self.persona())
            .field("status", &*self.status_tx.borrow())
            .finish_non_exhaustive()
    }
}

impl ConversationEngine {
    /// Create an engine, loading the profile and persona from `store`.
    ///
    /// Without a backend every model turn fails with the configuration apology.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in pattern fails to compile.
    pub fn new(
        settings: EngineSettings,
        backend: Option<Arc<dyn ModelBackend>>,
        store: Arc<dyn KeyValueStore>,
    ) -> Result<Self, regex::Error> {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let flourish = if settings.flourishes {
            Some(Flourish::new()?)
        } else {
            None
        };
        let profile = profile::load_profile(store.as_ref());
        let persona = profile::load_persona(store.as_ref());
        let (partial_tx, _) = watch::channel(String::new());
        let (status_tx, _) = watch::channel(TurnStatus::default());

        Ok(Self {
            detector: MoodDetector::new(settings.lexicon),
            topics: TopicIdentifier::from_knowledge(&settings.knowledge),
            tools: ToolRegistry::with_answers(settings.tool_answers)?,
            prompts: PromptBuilder::new(settings.knowledge, settings.limits),
            names: NameExtractor::new()?,
            flourish,
            backend,
            store,
            rng: Mutex::new(rng),
            transcript: Mutex::new(Vec::new()),
            profile: Mutex::new(profile),
            persona: Mutex::new(persona),
            pending: Mutex::new(None),
            partial_tx,
            status_tx,
        })
    }

    // -- presentation contract ---------------------------------------------

    /// Snapshot of the transcript.
    pub fn transcript(&self) -> Vec<Message> {
        lock(&self.transcript).clone()
    }

    /// Live partial response of the streaming turn (empty otherwise).
    pub fn subscribe_partial(&self) -> watch::Receiver<String> {
        self.partial_tx.subscribe()
    }

    /// Live turn status.
    pub fn subscribe_status(&self) -> watch::Receiver<TurnStatus> {
        self.status_tx.subscribe()
    }

    /// Current turn status.
    pub fn status(&self) -> TurnStatus {
        *self.status_tx.borrow()
    }

    /// Snapshot of the user profile.
    pub fn profile(&self) -> UserProfile {
        lock(&self.profile).clone()
    }

    /// Selected persona.
    pub fn persona(&self) -> PersonaId {
        *lock(&self.persona)
    }

    /// Selectable personas.
    pub fn persona_options(&self) -> &'static [PersonaId] {
        &PersonaId::ALL
    }

    /// Select a persona; takes effect on the next generated turn.
    pub fn set_persona(&self, persona: PersonaId) {
        *lock(&self.persona) = persona;
        if let Err(e) = profile::save_persona(self.store.as_ref(), persona) {
            warn!(error = %e, "failed to persist persona");
        }
        info!(persona = %persona, "persona selected");
    }

    /// Restore the default profile and persona, in memory and in the store.
    pub fn reset(&self) {
        let fresh = UserProfile::default();
        *lock(&self.profile) = fresh.clone();
        if let Err(e) = profile::save_profile(self.store.as_ref(), &fresh) {
            warn!(error = %e, "failed to persist profile reset");
        }
        self.set_persona(PersonaId::default());
    }

    /// Cancel the in-flight turn. Returns `false` when nothing was in flight.
    pub fn cancel(&self) -> bool {
        match lock(&self.pending).as_ref() {
            Some(pending) => {
                info!(turn_id = %pending.id, "cancellation requested");
                pending.token.cancel();
                true
            }
            None => false,
        }
    }

    // -- turns ---------------------------------------------------------------

    /// Run one turn for `text`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError`] when the submission is refused; a refused
    /// submission leaves the transcript and profile untouched.
    pub async fn submit(&self, text: &str) -> Result<TurnOutcome, EngineError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(EngineError::EmptyMessage);
        }
        let turn = self.claim_turn()?;

        let mood = self.detector.detect(text);
        let topics = self.topics.identify(text);
        let history = self.append_user(text, mood);
        info!(turn_id = %turn.id, mood = ?mood, topics = ?topics, "turn started");

        if let Some(tool) = self.tools.detect(text) {
            return Ok(self.answer_with_tool(&turn, tool, text, mood, &topics));
        }

        let Some(backend) = self.backend.clone() else {
            return Ok(self.fail(&turn, TurnError::Configuration));
        };

        let persona = self.persona();
        let request = {
            let profile = lock(&self.profile).clone();
            let mut rng = lock(&self.rng);
            self.prompts.build(text, mood, persona, &profile, &history, &mut *rng)
        };

        let end = stream::consume(
            backend.as_ref(),
            &request,
            &turn.token,
            &self.partial_tx,
            || {
                self.status_tx.send_replace(TurnStatus::of(TurnState::Streaming));
            },
        )
        .await;

        Ok(match end {
            StreamEnd::Completed(raw) => {
                let reply = match &self.flourish {
                    Some(flourish) => {
                        let mut rng = lock(&self.rng);
                        flourish.apply(&raw, mood, persona, &mut *rng)
                    }
                    None => raw,
                };
                self.append_bot(&reply, mood);
                self.record_turn(text, mood, &topics);
                info!(turn_id = %turn.id, outcome = "completed", "turn finished");
                TurnOutcome::Answered {
                    reply,
                    source: ReplySource::Model,
                }
            }
            StreamEnd::Cancelled => {
                self.append_bot(CANCELLED_MESSAGE, MoodLabel::Neutral);
                info!(turn_id = %turn.id, outcome = "cancelled", "turn finished");
                TurnOutcome::Cancelled
            }
            StreamEnd::Failed(err) => self.fail(&turn, err),
        })
    }

    fn claim_turn(&self) -> Result<TurnGuard<'_>, EngineError> {
        let mut pending = lock(&self.pending);
        if pending.is_some() {
            debug!("submission refused, turn in flight");
            return Err(EngineError::TurnInFlight);
        }
        let id = Uuid::new_v4();
        let token = CancellationToken::new();
        *pending = Some(PendingTurn {
            id,
            token: token.clone(),
        });
        drop(pending);

        self.partial_tx.send_replace(String::new());
        self.status_tx.send_replace(TurnStatus::of(TurnState::Requesting));
        Ok(TurnGuard {
            engine: self,
            id,
            token,
        })
    }

    fn answer_with_tool(
        &self,
        turn: &TurnGuard<'_>,
        tool: ToolId,
        text: &str,
        mood: MoodLabel,
        topics: &[String],
    ) -> TurnOutcome {
        let result = {
            let mut rng = lock(&self.rng);
            self.tools.invoke(tool, text, &mut *rng)
        };
        match result {
            Ok(reply) => {
                self.append_bot(&reply, MoodLabel::Helpful);
                self.record_turn(text, mood, topics);
                info!(turn_id = %turn.id, tool = tool.name(), outcome = "tool", "turn finished");
                TurnOutcome::Answered {
                    reply,
                    source: ReplySource::Tool(tool),
                }
            }
            Err(e) => self.fail(turn, TurnError::ToolExecution(e)),
        }
    }

    fn fail(&self, turn: &TurnGuard<'_>, err: TurnError) -> TurnOutcome {
        warn!(turn_id = %turn.id, error = %err, outcome = "failed", "turn finished");
        self.append_bot(err.user_message(), MoodLabel::Apologetic);
        TurnOutcome::Failed(err)
    }

    /// Append the user message, returning the transcript before it.
    fn append_user(&self, text: &str, mood: MoodLabel) -> Vec<Message> {
        let mut transcript = lock(&self.transcript);
        let history = transcript.clone();
        transcript.push(Message::user(text, mood));
        history
    }

    fn append_bot(&self, text: &str, mood: MoodLabel) {
        lock(&self.transcript).push(Message::bot(text, mood));
    }

    fn record_turn(&self, text: &str, mood: MoodLabel, topics: &[String]) {
        let mut profile = lock(&self.profile);
        let name = if profile.name.is_none() {
            self.names.extract(text)
        } else {
            None
        };
        profile.record_turn(mood, topics, name);
        if let Err(e) = profile::save_profile(self.store.as_ref(), &profile) {
            warn!(error = %e, "failed to persist profile");
        }
    }
}
