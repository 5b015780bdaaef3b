//! Memory write gates.
//!
//! A gate decides whether a user message is worth persisting to long-term
//! memory. Two policies exist: a cheap keyword heuristic and an LLM
//! classifier (see [`super::classifier`]). Both fail closed: when in doubt,
//! nothing is stored.

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::classifier::ClassifierGate;

/// First-person phrases that mark a message as carrying a user fact.
pub const IMPORTANT_TRIGGERS: &[&str] = &[
    "my name is",
    "i am",
    "i'm",
    "i like",
    "i love",
    "i hate",
    "i prefer",
    "i work as",
    "i am working on",
    "i'm working on",
    "i study",
    "i want",
    "i need",
    "i can",
    "i cannot",
    "i can't",
    "i have",
    "i own",
    "i live in",
    "i lived in",
    "i was born",
    "my job",
    "my hobby",
    "my favorite",
];

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GateDecision {
    /// Whether the message should be stored
    pub save: bool,
    /// Non-fatal problem the caller may want to surface (classifier fallback)
    pub warning: Option<String>,
}

impl GateDecision {
    pub fn approve() -> Self {
        Self {
            save: true,
            warning: None,
        }
    }

    pub fn reject() -> Self {
        Self::default()
    }

    /// Do not store, and report why the gate could not decide.
    pub fn fallback(warning: impl Into<String>) -> Self {
        Self {
            save: false,
            warning: Some(warning.into()),
        }
    }
}

/// A save/don't-save policy applied to each user message.
#[async_trait]
pub trait MemoryGate: Send + Sync {
    /// Decide whether `text` should be written to long-term memory.
    async fn should_store(&self, text: &str) -> GateDecision;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;
}

/// Word-boundary trigger matching over the lower-cased message.
pub struct KeywordGate {
    patterns: Vec<(String, Regex)>,
}

impl KeywordGate {
    /// Gate over the built-in [`IMPORTANT_TRIGGERS`] table.
    pub fn new() -> Self {
        Self::with_triggers(IMPORTANT_TRIGGERS.iter().copied())
    }

    /// Gate over a custom trigger table. Triggers are matched literally.
    pub fn with_triggers<'a>(triggers: impl IntoIterator<Item = &'a str>) -> Self {
        let patterns = triggers
            .into_iter()
            .filter_map(|trigger| {
                let trigger = trigger.to_lowercase();
                let re = Regex::new(&format!(r"\b{}\b", regex::escape(&trigger))).ok()?;
                Some((trigger, re))
            })
            .collect();
        Self { patterns }
    }

    /// The first trigger found in `text`, if any.
    pub fn matching_trigger(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.patterns
            .iter()
            .find(|(_, re)| re.is_match(&lowered))
            .map(|(trigger, _)| trigger.as_str())
    }

    /// Every trigger found in `text`, in table order.
    pub fn matching_triggers(&self, text: &str) -> Vec<&str> {
        let lowered = text.to_lowercase();
        self.patterns
            .iter()
            .filter(|(_, re)| re.is_match(&lowered))
            .map(|(trigger, _)| trigger.as_str())
            .collect()
    }

    pub fn is_fact_important(&self, text: &str) -> bool {
        self.matching_trigger(text).is_some()
    }
}

impl Default for KeywordGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MemoryGate for KeywordGate {
    async fn should_store(&self, text: &str) -> GateDecision {
        match self.matching_trigger(text) {
            Some(trigger) => {
                tracing::debug!(trigger, "Keyword gate matched");
                GateDecision::approve()
            }
            None => GateDecision::reject(),
        }
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

/// Which gate implementation to run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatePolicy {
    #[default]
    Keyword,
    Classifier,
}

impl GatePolicy {
    /// Build the gate for this policy. The classifier policy needs the
    /// classifier gate already wired to its model client.
    pub fn build(self, classifier: Option<ClassifierGate>) -> crate::types::Result<Arc<dyn MemoryGate>> {
        match self {
            GatePolicy::Keyword => Ok(Arc::new(KeywordGate::new())),
            GatePolicy::Classifier => classifier
                .map(|gate| Arc::new(gate) as Arc<dyn MemoryGate>)
                .ok_or_else(|| {
                    crate::types::AppError::Config(
                        "memory.gate = \"classifier\" requires a [classifier] provider".to_string(),
                    )
                }),
        }
    }
}

impl std::fmt::Display for GatePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatePolicy::Keyword => write!(f, "keyword"),
            GatePolicy::Classifier => write!(f, "classifier"),
        }
    }
}
