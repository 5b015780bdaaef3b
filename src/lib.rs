//! # memchat - memory-augmented chat server
//!
//! A chat server in Rust that puts a long-term memory layer in front of a
//! hosted LLM. Every turn recalls the most relevant facts about the user from
//! a memory service (Mem0), folds them into the system prompt, calls the
//! completion service and then decides whether the user's message is worth
//! remembering.
//!
//! ## Overview
//!
//! memchat can be used in two ways:
//!
//! 1. **As a standalone server** - Run the `memchat-server` binary (HTTP API
//!    plus an interactive terminal chat)
//! 2. **As a library** - Embed the gate, the memory adapter or the turn
//!    engine in your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use memchat::chat::{ChatSession, TurnEngine, TurnOutcome};
//! use memchat::memory::mem0::{DEFAULT_MEM0_API_BASE, DEFAULT_MEM0_VERSION};
//! use memchat::memory::{KeywordGate, Mem0Client, MemoryStore};
//! use memchat::Provider;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> memchat::Result<()> {
//!     let llm = Provider::OpenAI {
//!         api_key: std::env::var("GROQ_API_KEY").unwrap(),
//!         api_base: "https://api.groq.com/openai/v1".to_string(),
//!         model: "moonshotai/kimi-k2-instruct".to_string(),
//!     }
//!     .create_client()?;
//!
//!     let memory = MemoryStore::new(
//!         Arc::new(Mem0Client::new(
//!             std::env::var("MEM0_API_KEY").unwrap(),
//!             DEFAULT_MEM0_API_BASE.to_string(),
//!             DEFAULT_MEM0_VERSION.to_string(),
//!         )?),
//!         Arc::new(KeywordGate::new()),
//!     );
//!
//!     let engine = TurnEngine::new(llm, memory);
//!     let mut session = ChatSession::new();
//!     session.connect("Alex")?;
//!
//!     if let TurnOutcome::Completed(turn) =
//!         engine.run_turn(&mut session, "My name is Alex and I live in Lahore.", None).await?
//!     {
//!         println!("{}", turn.reply);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Memory gates
//!
//! | Gate | Description |
//! |------|-------------|
//! | `keyword` | Word-boundary match against first-person trigger phrases |
//! | `classifier` | A small model answers `{"save": "yes"}` or `{"save": "no"}`; any failure means "no" |
//!
//! ## Modules
//!
//! - [`chat`] - Session state, personas, prompt assembly and the turn engine
//! - [`memory`] - Write gates, memory service clients and the store adapter
//! - [`llm`] - Completion clients (OpenAI-compatible, Gemini)
//! - [`api`] - HTTP handlers and routes
//! - [`cli`] - Command-line interface
//! - [`types`] - Request/response types and errors
//! - [`utils`] - TOML configuration with hot reload

/// HTTP API handlers and routes.
pub mod api;
/// Conversation state and the per-turn pipeline.
pub mod chat;
/// Command-line interface and terminal chat.
pub mod cli;
/// LLM provider clients and abstractions.
pub mod llm;
/// Long-term memory: gates, services, store adapter.
pub mod memory;
/// Core types (requests, responses, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use chat::{ChatSession, PersonaRegistry, SessionLocks, TurnEngine, TurnOutcome};
pub use llm::{LLMClient, Provider};
pub use memory::{MemoryGate, MemoryService, MemoryStore};
pub use types::{AppError, Result};
pub use utils::toml_config::{ConfigManager, MemchatConfig};

use memory::{ClassifierGate, GatePolicy, LocalMemoryService, Mem0Client, MemoryBackend};
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// TOML configuration with hot-reload support
    pub config_manager: Arc<ConfigManager>,
    /// Completion client answering chat turns
    pub llm: Arc<dyn LLMClient>,
    /// Gate-checked memory adapter
    pub memory: MemoryStore,
    /// One lock per browser session, held across load, turn and save
    pub session_locks: SessionLocks,
}

impl AppState {
    pub fn new(
        config_manager: Arc<ConfigManager>,
        llm: Arc<dyn LLMClient>,
        memory: MemoryStore,
    ) -> Self {
        Self {
            config_manager,
            llm,
            memory,
            session_locks: SessionLocks::new(),
        }
    }

    /// Build every client the configuration asks for. Clients live for the
    /// whole process and are shared by all sessions.
    pub fn from_config(config_manager: Arc<ConfigManager>) -> Result<Self> {
        let config = config_manager.config();
        let llm = config.chat_provider()?.create_client()?;
        let memory = build_memory_store(&config)?;

        tracing::info!(
            model = llm.model_name(),
            gate = memory.gate_name(),
            backend = %config.memory.backend,
            "Services initialised"
        );

        Ok(Self::new(config_manager, llm, memory))
    }

    /// A turn engine carrying the current per-turn settings.
    pub fn engine(&self) -> TurnEngine {
        TurnEngine::new(self.llm.clone(), self.memory.clone())
            .with_settings(self.config_manager.config().turn_settings())
    }

    /// Personas as currently configured.
    pub fn personas(&self) -> PersonaRegistry {
        PersonaRegistry::from_config(&self.config_manager.config().personas)
    }
}

/// Wire the configured memory service and write gate together.
pub fn build_memory_store(config: &MemchatConfig) -> Result<MemoryStore> {
    let service: Arc<dyn MemoryService> = match config.memory.backend {
        MemoryBackend::Mem0 => Arc::new(Mem0Client::new(
            config.mem0_api_key()?,
            config.memory.api_base.clone(),
            config.memory.version.clone(),
        )?),
        MemoryBackend::Local => Arc::new(LocalMemoryService::new()),
    };

    let classifier = match config.memory.gate {
        GatePolicy::Classifier => Some(
            ClassifierGate::new(config.classifier_provider()?.create_client()?)
                .with_options(config.classifier_options()),
        ),
        GatePolicy::Keyword => None,
    };
    let gate = config.memory.gate.build(classifier)?;

    Ok(MemoryStore::new(service, gate).with_search_limit(config.memory.search_limit))
}
