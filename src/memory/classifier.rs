//! LLM-classifier memory gate.
//!
//! Sends the user's message to a small model with a fixed instruction and a
//! JSON schema that admits exactly `{"save": "yes"}` or `{"save": "no"}`.
//! Anything else, including transport failures, means "do not store".

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::gate::{GateDecision, MemoryGate};
use crate::llm::{GenerationOptions, LLMClient, StructuredOutput};
use crate::types::AppError;

/// Fixed classifier instruction. Changing it changes which facts get stored.
pub const MEMORY_CLASSIFIER_SYSTEM_PROMPT: &str = r#"You are a classifier for long-term memory in a chatbot.

Decide whether the user's message contains a stable, user-specific fact that
will be useful in future conversations. Save-worthy facts include:
- Identity or background (name, job, location, education)
- Long-term preferences (likes, dislikes, favorites)
- Long-term projects or goals
- Personal traits or recurring constraints

Do NOT save if the message is:
- A question or request
- A transient status update or one-off plan
- Generic conversation with no user-specific facts
- Sensitive data (passwords, secrets, medical, financial, legal)

Output JSON only, exactly in one of these forms:
{"save": "yes"}
{"save": "no"}"#;

/// Default sampling for the classifier call.
pub const CLASSIFIER_TEMPERATURE: f32 = 0.0;
pub const CLASSIFIER_MAX_TOKENS: u32 = 20;

/// The two admissible verdicts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SaveVerdict {
    Yes,
    No,
}

/// Validated classifier output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryDecision {
    pub save: SaveVerdict,
}

impl MemoryDecision {
    pub fn should_save(&self) -> bool {
        self.save == SaveVerdict::Yes
    }

    /// JSON schema sent along with the classifier request.
    pub fn response_schema() -> StructuredOutput {
        StructuredOutput {
            name: "memory_decision".to_string(),
            schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "save": { "type": "string", "enum": ["yes", "no"] }
                },
                "required": ["save"],
                "additionalProperties": false
            }),
        }
    }
}

/// Why a classification could not be trusted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifierError {
    /// The model output is not JSON at all
    #[error("Memory classifier returned invalid JSON: {0}")]
    Parse(String),

    /// JSON, but not one of the two admissible forms
    #[error("Memory classifier returned an unexpected decision: {0}")]
    Validation(String),

    /// The call itself failed
    #[error("Memory classifier failed: {0}")]
    Transport(String),
}

impl From<AppError> for ClassifierError {
    fn from(e: AppError) -> Self {
        match e {
            AppError::Parse(msg) => ClassifierError::Parse(msg),
            other => ClassifierError::Transport(other.to_string()),
        }
    }
}

/// Parse raw model output into a validated [`MemoryDecision`].
pub fn parse_memory_decision(raw: &str) -> Result<MemoryDecision, ClassifierError> {
    let value: serde_json::Value = serde_json::from_str(raw.trim())
        .map_err(|e| ClassifierError::Parse(format!("{} (output: {:?})", e, raw)))?;
    serde_json::from_value(value).map_err(|e| ClassifierError::Validation(e.to_string()))
}

/// Memory gate backed by a classification model.
pub struct ClassifierGate {
    client: Arc<dyn LLMClient>,
    options: GenerationOptions,
}

impl ClassifierGate {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self {
            client,
            options: GenerationOptions::new(CLASSIFIER_TEMPERATURE)
                .with_max_tokens(CLASSIFIER_MAX_TOKENS),
        }
    }

    /// Override the sampling options (temperature, output cap).
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Run one classification call. Never retried.
    pub async fn classify(&self, text: &str) -> Result<MemoryDecision, ClassifierError> {
        let raw = self
            .client
            .generate_structured(
                MEMORY_CLASSIFIER_SYSTEM_PROMPT,
                text,
                &self.options,
                &MemoryDecision::response_schema(),
            )
            .await?;
        parse_memory_decision(&raw)
    }
}

#[async_trait]
impl MemoryGate for ClassifierGate {
    async fn should_store(&self, text: &str) -> GateDecision {
        match self.classify(text).await {
            Ok(decision) => {
                tracing::debug!(model = self.client.model_name(), save = ?decision.save, "Memory classifier verdict");
                if decision.should_save() {
                    GateDecision::approve()
                } else {
                    GateDecision::reject()
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Memory classifier fell back to not storing");
                GateDecision::fallback(e.to_string())
            }
        }
    }

    fn name(&self) -> &'static str {
        "classifier"
    }
}
