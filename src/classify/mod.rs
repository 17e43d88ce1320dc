//! Lexical classifiers: pure functions over a message and static keyword tables.
//!
//! - [`mood::MoodDetector`] — tiered keyword scoring with negation dampening
//! - [`topic::TopicIdentifier`] — knowledge-base and auxiliary topic matching
//!
//! Tool-request detection lives with the tools themselves in
//! [`crate::tools::ToolRegistry::detect`].

pub mod mood;
pub mod topic;

pub use mood::{MoodDetector, MoodLexicon};
pub use topic::{TopicIdentifier, GENERAL_TOPIC};
