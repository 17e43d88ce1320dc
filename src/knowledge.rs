//! Hand-authored knowledge base injected into prompts as background facts.
//!
//! Topics are matched as substrings of the lower-cased user message. The
//! retriever preserves topic declaration order and the order of facts within
//! each topic.

/// A knowledge-base topic with its fixed facts.
#[derive(Debug, Clone, Copy)]
pub struct KnowledgeTopic {
    /// Lower-case topic key, also used as a profile topic.
    pub key: &'static str,
    /// Facts appended to the prompt when the topic is mentioned.
    pub facts: &'static [&'static str],
}

const BUILTIN_TOPICS: &[KnowledgeTopic] = &[
    KnowledgeTopic {
        key: "anxiety",
        facts: &[
            "Anxiety is a normal response to stress that can be helpful in some situations, keeping us alert and aware.",
            "Deep breathing exercises can help reduce anxiety by triggering the body's relaxation response.",
            "Progressive muscle relaxation involves tensing and then releasing each muscle group, which can help manage anxiety.",
        ],
    },
    KnowledgeTopic {
        key: "depression",
        facts: &[
            "Depression is more than just feeling sad; it is a persistent feeling of sadness and loss of interest.",
            "Physical activity has been shown to help reduce symptoms of depression by releasing endorphins.",
            "Setting small, achievable goals can help combat depression by providing a sense of accomplishment.",
        ],
    },
    KnowledgeTopic {
        key: "stress",
        facts: &[
            "Stress is the body's response to pressure from a situation or life event.",
            "Mindfulness meditation can help reduce stress by focusing your attention on the present moment.",
            "Adequate sleep is essential for stress management as it helps the body recover and regenerate.",
        ],
    },
    KnowledgeTopic {
        key: "sleep",
        facts: &[
            "Adults typically need 7-9 hours of quality sleep per night.",
            "Creating a consistent sleep schedule helps regulate your body's internal clock.",
            "Avoiding screens before bedtime can improve sleep quality by reducing blue light exposure.",
        ],
    },
    KnowledgeTopic {
        key: "loneliness",
        facts: &[
            "Loneliness is about the quality of connection rather than the number of people around you.",
            "Small, regular social contacts such as a short call or message can ease feelings of isolation.",
            "Shared-interest groups, volunteering and classes are low-pressure ways to build new connections.",
        ],
    },
];

/// Immutable topic -> facts table.
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    topics: Vec<KnowledgeTopic>,
}

impl KnowledgeBase {
    /// Create a knowledge base from explicit topics (declaration order is kept).
    pub fn new(topics: Vec<KnowledgeTopic>) -> Self {
        Self { topics }
    }

    /// Topic keys in declaration order.
    pub fn topics(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.topics.iter().map(|t| t.key)
    }

    /// Facts for every topic key contained in `message`.
    ///
    /// Returns `None` when no topic matched so callers can omit the
    /// background section entirely.
    pub fn retrieve(&self, message: &str) -> Option<Vec<&'static str>> {
        let lowered = message.to_lowercase();
        let facts: Vec<&'static str> = self
            .topics
            .iter()
            .filter(|topic| lowered.contains(topic.key))
            .flat_map(|topic| topic.facts.iter().copied())
            .collect();

        if facts.is_empty() {
            None
        } else {
            Some(facts)
        }
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::new(BUILTIN_TOPICS.to_vec())
    }
}
