//! Topic identification for prompt context and profile accretion.

use crate::knowledge::KnowledgeBase;

/// Placeholder topic returned when nothing matches. Never persisted.
pub const GENERAL_TOPIC: &str = "general mental health";

/// A topic recognised outside the knowledge base, matched by any of its terms.
#[derive(Debug, Clone, Copy)]
pub struct AuxiliaryTopic {
    /// Topic name reported on a match.
    pub name: &'static str,
    /// Lower-case substrings that signal the topic.
    pub terms: &'static [&'static str],
}

/// BMI and mindfulness are recognised topics without knowledge-base facts.
pub const AUXILIARY_TOPICS: &[AuxiliaryTopic] = &[
    AuxiliaryTopic {
        name: "bmi",
        terms: &["bmi", "body mass"],
    },
    AuxiliaryTopic {
        name: "mindfulness",
        terms: &["mindfulness", "meditation", "meditate"],
    },
];

/// Substring matcher over knowledge-base keys plus auxiliary topics.
#[derive(Debug, Clone)]
pub struct TopicIdentifier {
    keys: Vec<&'static str>,
    auxiliary: Vec<AuxiliaryTopic>,
}

impl TopicIdentifier {
    /// Build an identifier from explicit topic keys and auxiliary topics.
    pub fn new(keys: Vec<&'static str>, auxiliary: Vec<AuxiliaryTopic>) -> Self {
        Self { keys, auxiliary }
    }

    /// Build an identifier over a knowledge base's topics plus the built-in auxiliaries.
    pub fn from_knowledge(knowledge: &KnowledgeBase) -> Self {
        Self::new(knowledge.topics().collect(), AUXILIARY_TOPICS.to_vec())
    }

    /// Topics mentioned in `message`, deduplicated in declaration order.
    ///
    /// Never empty: returns `[GENERAL_TOPIC]` when nothing matches.
    pub fn identify(&self, message: &str) -> Vec<String> {
        let lowered = message.to_lowercase();
        let mut found: Vec<String> = Vec::new();

        let key_hits = self.keys.iter().copied().filter(|key| lowered.contains(key));
        let aux_hits = self
            .auxiliary
            .iter()
            .filter(|aux| aux.terms.iter().any(|term| lowered.contains(term)))
            .map(|aux| aux.name);

        for topic in key_hits.chain(aux_hits) {
            if !found.iter().any(|t| t == topic) {
                found.push(topic.to_owned());
            }
        }

        if found.is_empty() {
            found.push(GENERAL_TOPIC.to_owned());
        }
        found
    }
}

impl Default for TopicIdentifier {
    fn default() -> Self {
        Self::from_knowledge(&KnowledgeBase::default())
    }
}
