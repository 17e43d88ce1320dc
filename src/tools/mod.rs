//! Local tools that answer a request without calling the remote model.
//!
//! Detection takes priority over model invocation: when [`ToolRegistry::detect`]
//! returns a tool, the engine answers locally. Tool failures surface as
//! [`ToolError`] and are converted into an apology by the engine; they never
//! escape a turn.

use rand::seq::SliceRandom;
use rand::Rng;

pub mod bmi;

use bmi::BmiExtractor;

// ---------------------------------------------------------------------------
// Tool identity
// ---------------------------------------------------------------------------

/// Deterministic local tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolId {
    /// Body-mass index from a weight and a height found in the message.
    CalculateBmi,
    /// A randomly chosen mindfulness exercise.
    MindfulnessExercise,
    /// A randomly chosen sleep hygiene tip.
    SleepTip,
}

impl ToolId {
    /// Stable tool name used in logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::CalculateBmi => "calculateBMI",
            Self::MindfulnessExercise => "getMindfulnessExercise",
            Self::SleepTip => "getSleepTip",
        }
    }
}

/// Errors raised while running a tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// A captured measurement could not be parsed as a number.
    #[error("invalid measurement {value:?}: {reason}")]
    InvalidMeasurement {
        /// Raw captured text.
        value: String,
        /// Parser error description.
        reason: String,
    },
    /// The computation produced NaN or infinity.
    #[error("tool {0} produced a non-finite result")]
    NonFinite(&'static str),
    /// A fixed answer list was empty.
    #[error("tool {0} has no answers configured")]
    NoAnswers(&'static str),
}

// ---------------------------------------------------------------------------
// Fixed answer lists
// ---------------------------------------------------------------------------

const MINDFULNESS_EXERCISES: &[&str] = &[
    "Body Scan: Starting from your toes, slowly bring attention to each part of your body, noticing sensations without judgment.",
    "5-4-3-2-1 Technique: Acknowledge 5 things you see, 4 things you can touch, 3 things you hear, 2 things you smell, and 1 thing you taste.",
    "Mindful Breathing: Focus on your breath. Inhale for 4 counts, hold for 2, exhale for 6. Repeat for 5 minutes.",
    "Loving-kindness Meditation: Direct positive wishes to yourself, then a loved one, then an acquaintance, then a difficult person, and finally to all beings.",
];

const SLEEP_TIPS: &[&str] = &[
    "Maintain a consistent sleep schedule, even on weekends.",
    "Create a restful environment by keeping your bedroom cool, quiet, and dark.",
    "Avoid caffeine and large meals before bedtime.",
    "Try a relaxation technique like deep breathing or progressive muscle relaxation before sleeping.",
    "Limit exposure to screens at least an hour before bed.",
];

const SLEEP_REQUEST_TERMS: &[&str] = &["tip", "help", "advice"];

/// Answer lists the random-pick tools draw from.
#[derive(Debug, Clone, Copy)]
pub struct ToolAnswers {
    /// Mindfulness exercises.
    pub exercises: &'static [&'static str],
    /// Sleep hygiene tips.
    pub sleep_tips: &'static [&'static str],
}

impl Default for ToolAnswers {
    fn default() -> Self {
        Self {
            exercises: MINDFULNESS_EXERCISES,
            sleep_tips: SLEEP_TIPS,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Detects tool requests and runs the matching tool.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    bmi: BmiExtractor,
    exercises: &'static [&'static str],
    sleep_tips: &'static [&'static str],
}

impl ToolRegistry {
    /// Create the registry with the built-in answer lists.
    ///
    /// # Errors
    ///
    /// Returns an error if a measurement pattern fails to compile.
    pub fn new() -> Result<Self, regex::Error> {
        Self::with_answers(ToolAnswers::default())
    }

    /// Create the registry with custom answer lists.
    ///
    /// # Errors
    ///
    /// Returns an error if a measurement pattern fails to compile.
    pub fn with_answers(answers: ToolAnswers) -> Result<Self, regex::Error> {
        Ok(Self {
            bmi: BmiExtractor::new()?,
            exercises: answers.exercises,
            sleep_tips: answers.sleep_tips,
        })
    }

    /// Which tool, if any, the message asks for. Checked BMI, mindfulness, sleep.
    pub fn detect(&self, message: &str) -> Option<ToolId> {
        let lowered = message.to_lowercase();

        if lowered.contains("bmi") || (lowered.contains("weight") && lowered.contains("height")) {
            return Some(ToolId::CalculateBmi);
        }
        if lowered.contains("mindfulness") || lowered.contains("meditation") {
            return Some(ToolId::MindfulnessExercise);
        }
        if lowered.contains("sleep") && SLEEP_REQUEST_TERMS.iter().any(|t| lowered.contains(t)) {
            return Some(ToolId::SleepTip);
        }
        None
    }

    /// Run `tool` against `message`, drawing random picks from `rng`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError`] when the tool cannot produce an answer.
    pub fn invoke<R: Rng + ?Sized>(
        &self,
        tool: ToolId,
        message: &str,
        rng: &mut R,
    ) -> Result<String, ToolError> {
        match tool {
            ToolId::CalculateBmi => self.bmi.answer(message),
            ToolId::MindfulnessExercise => {
                let exercise = pick(self.exercises, tool, rng)?;
                Ok(format!(
                    "I'd love to share a mindfulness exercise with you! 🧘\n\n{exercise}\n\nWould you like to try this now? I can guide you through it step by step."
                ))
            }
            ToolId::SleepTip => {
                let tip = pick(self.sleep_tips, tool, rng)?;
                Ok(format!(
                    "Here's a helpful sleep tip for you: 💤\n\n{tip}\n\nWould you like another tip or would you prefer to talk about creating a bedtime routine?"
                ))
            }
        }
    }
}

fn pick<R: Rng + ?Sized>(
    answers: &'static [&'static str],
    tool: ToolId,
    rng: &mut R,
) -> Result<&'static str, ToolError> {
    answers
        .choose(rng)
        .copied()
        .ok_or(ToolError::NoAnswers(tool.name()))
}
