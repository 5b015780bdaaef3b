//! LLM Client abstractions and provider management
//!
//! This module provides a unified interface for the completion services the
//! chat server talks to:
//! - **OpenAI-compatible**: OpenAI, Groq, OpenRouter and friends (chat + streaming + JSON schema)
//! - **Gemini**: Google Generative Language API (chat + streaming + JSON schema)

use crate::types::{AppError, ChatMessage, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// A single decoded piece of a streamed completion.
///
/// Provider payloads are decoded into this type exactly once, at the client
/// boundary. Chunks that do not carry text (role headers, usage frames,
/// keep-alives, anything malformed) become [`CompletionChunk::Empty`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionChunk {
    /// A text delta
    Text(String),
    /// Nothing to show for this chunk
    Empty,
}

impl CompletionChunk {
    /// Build a chunk from an optional delta, treating `""` as empty.
    pub fn from_delta(delta: Option<String>) -> Self {
        match delta {
            Some(text) if !text.is_empty() => CompletionChunk::Text(text),
            _ => CompletionChunk::Empty,
        }
    }
}

/// Boxed stream of completion chunks.
pub type CompletionStream =
    Box<dyn futures::Stream<Item = Result<CompletionChunk>> + Send + Unpin>;

/// Sampling options for a single completion call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A JSON-schema constraint on the model output.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredOutput {
    /// Schema name (required by OpenAI-style `json_schema` response formats)
    pub name: String,
    /// A plain JSON Schema document
    pub schema: serde_json::Value,
}

/// Generic LLM client trait for provider abstraction
///
/// All completion providers implement this trait, allowing the turn engine
/// and the classifier gate to stay provider agnostic.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Blocking completion over a full message list
    async fn generate(&self, messages: &[ChatMessage], options: &GenerationOptions)
        -> Result<String>;

    /// Incremental completion over a full message list
    async fn stream(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<CompletionStream>;

    /// Single-shot completion constrained to a JSON schema.
    ///
    /// Returns the raw text of the reply; validating it is the caller's job.
    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        options: &GenerationOptions,
        output: &StructuredOutput,
    ) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// Any OpenAI-compatible chat completions endpoint
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::OpenAI {
    ///     api_key: "gsk_...".to_string(),
    ///     api_base: "https://api.groq.com/openai/v1".to_string(),
    ///     model: "moonshotai/kimi-k2-instruct".to_string(),
    /// };
    /// ```
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Google Generative Language API
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Gemini {
    ///     api_key: "AIza...".to_string(),
    ///     api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
    ///     model: "gemma-3-27b".to_string(),
    /// };
    /// ```
    Gemini {
        api_key: String,
        api_base: String,
        model: String,
    },
}

impl Provider {
    /// Create a client instance for this provider
    ///
    /// Clients are meant to be created once per process and shared.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot be built.
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => {
                require_key(self.name(), api_key)?;
                Ok(Arc::new(super::openai::OpenAIClient::new(
                    api_key.clone(),
                    api_base.clone(),
                    model.clone(),
                )))
            }
            Provider::Gemini {
                api_key,
                api_base,
                model,
            } => {
                require_key(self.name(), api_key)?;
                Ok(Arc::new(super::gemini::GeminiClient::new(
                    api_key.clone(),
                    api_base.clone(),
                    model.clone(),
                )?))
            }
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Gemini { .. } => "Gemini",
        }
    }

    /// The model this provider will be asked for
    pub fn model(&self) -> &str {
        match self {
            Provider::OpenAI { model, .. } | Provider::Gemini { model, .. } => model,
        }
    }
}

fn require_key(provider: &str, api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(AppError::Config(format!(
            "{} provider requires a non-empty API key",
            provider
        )));
    }
    Ok(())
}

/// Shared builder for the provider HTTP clients.
pub(crate) fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("memchat/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Read a non-success response into an `AppError::LLM`.
pub(crate) async fn status_error(provider: &str, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    AppError::LLM(format!("{} API error ({}): {}", provider, status, body))
}
