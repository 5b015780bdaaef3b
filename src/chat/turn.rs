use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use super::prompt::build_system_prompt;
use super::session::ChatSession;
use crate::llm::{CompletionChunk, GenerationOptions, LLMClient};
use crate::memory::MemoryStore;
use crate::types::{AppError, ChatMessage, Result};

/// Per-turn knobs, re-read from configuration on every request.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSettings {
    /// User id used when the session has none
    pub default_user_id: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Prefer incremental completion even without a delta sink
    pub stream: bool,
    /// Add "Current user identity" to the memory prompt
    pub include_identity: bool,
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self {
            default_user_id: None,
            temperature: Some(0.7),
            max_tokens: None,
            stream: false,
            include_identity: false,
        }
    }
}

impl TurnSettings {
    fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// A turn that produced a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedTurn {
    pub turn_id: Uuid,
    pub user_id: String,
    pub reply: String,
    /// Facts injected into the prompt; `None` in persona mode
    pub memories_used: Option<String>,
    /// The user message was written to long-term memory
    pub stored: bool,
    /// Non-fatal problems (gate fallback, failed memory write)
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Blank input; nothing happened
    Ignored,
    Completed(CompletedTurn),
}

/// Runs one user turn: retrieve, prompt, complete, record, remember.
#[derive(Clone)]
pub struct TurnEngine {
    llm: Arc<dyn LLMClient>,
    memory: MemoryStore,
    settings: TurnSettings,
}

impl TurnEngine {
    pub fn new(llm: Arc<dyn LLMClient>, memory: MemoryStore) -> Self {
        Self {
            llm,
            memory,
            settings: TurnSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: TurnSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    /// User id the next turn would run as.
    pub fn resolve_user(&self, session: &ChatSession) -> Option<String> {
        session
            .user_id()
            .map(str::to_string)
            .or_else(|| self.settings.default_user_id.clone())
    }

    /// Run one turn against `session`.
    ///
    /// When `deltas` is given (or streaming is configured) the completion is
    /// consumed incrementally and every text delta is forwarded as it arrives.
    /// Retrieval and completion errors abort the turn with the session left
    /// untouched. A failed memory write does not: the reply is kept and the
    /// failure is reported in [`CompletedTurn::warnings`].
    pub async fn run_turn(
        &self,
        session: &mut ChatSession,
        input: &str,
        deltas: Option<&UnboundedSender<String>>,
    ) -> Result<TurnOutcome> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(TurnOutcome::Ignored);
        }

        let user_id = self
            .resolve_user(session)
            .ok_or_else(|| AppError::Session("Connect with a name first".to_string()))?;
        let turn_id = Uuid::new_v4();

        let (messages, memories_used) = match session.persona_prompt() {
            Some(persona) => {
                let mut messages = Vec::with_capacity(session.history().len() + 1);
                messages.push(ChatMessage::system(build_system_prompt("", Some(persona), None)));
                messages.extend(session.history()[1..].iter().cloned());
                messages.push(ChatMessage::user(input));
                (messages, None)
            }
            None => {
                let facts = self.memory.retrieve(input, &user_id).await?;
                let identity = self
                    .settings
                    .include_identity
                    .then_some(user_id.as_str());
                let mut messages = Vec::with_capacity(session.history().len() + 2);
                messages.push(ChatMessage::system(build_system_prompt(
                    &facts, None, identity,
                )));
                messages.extend(session.history().iter().cloned());
                messages.push(ChatMessage::user(input));
                (messages, Some(facts))
            }
        };

        tracing::debug!(
            %turn_id,
            user_id = %user_id,
            messages = messages.len(),
            persona = session.persona().unwrap_or("-"),
            "Calling completion service"
        );

        let reply = if deltas.is_some() || self.settings.stream {
            self.complete_streaming(&messages, deltas).await?
        } else {
            self.llm
                .generate(&messages, &self.settings.generation_options())
                .await?
        };

        session.push_exchange(input, &reply);

        let mut warnings = Vec::new();
        let stored = match self.memory.store(input, &user_id).await {
            Ok(outcome) => {
                warnings.extend(outcome.warning);
                outcome.stored
            }
            Err(e) => {
                tracing::warn!(%turn_id, user_id = %user_id, error = %e, "Memory write failed");
                warnings.push(format!("Could not save to memory: {}", e));
                false
            }
        };

        tracing::info!(
            %turn_id,
            user_id = %user_id,
            model = self.llm.model_name(),
            reply_chars = reply.len(),
            stored,
            "Turn completed"
        );

        Ok(TurnOutcome::Completed(CompletedTurn {
            turn_id,
            user_id,
            reply,
            memories_used,
            stored,
            warnings,
        }))
    }

    async fn complete_streaming(
        &self,
        messages: &[ChatMessage],
        deltas: Option<&UnboundedSender<String>>,
    ) -> Result<String> {
        let mut stream = self
            .llm
            .stream(messages, &self.settings.generation_options())
            .await?;

        let mut reply = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk? {
                CompletionChunk::Text(text) => {
                    if let Some(sink) = deltas {
                        // Receiver gone means the client hung up; keep the reply anyway
                        let _ = sink.send(text.clone());
                    }
                    reply.push_str(&text);
                }
                CompletionChunk::Empty => {}
            }
        }
        Ok(reply)
    }
}
