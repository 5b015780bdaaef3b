//! Long-term user memory.
//!
//! This module provides:
//! - Write gates deciding whether a message is worth remembering
//!   ([`KeywordGate`], [`ClassifierGate`])
//! - Memory service clients ([`Mem0Client`], [`LocalMemoryService`])
//! - The [`MemoryStore`] adapter tying the two together: gate-checked
//!   writes and prompt-ready reads
//!
//! Facts are owned by the memory service and partitioned by user id. This
//! crate never reads back identifiers for what it stores.

/// LLM-classifier gate and its fixed instruction.
pub mod classifier;
/// Gate trait, keyword gate and gate policy selection.
pub mod gate;
/// In-process memory service.
pub mod local;
/// Mem0 platform client.
pub mod mem0;
/// Memory service trait.
pub mod service;
/// Gate-checked store/retrieve adapter.
pub mod store;

pub use classifier::{
    parse_memory_decision, ClassifierError, ClassifierGate, MemoryDecision, SaveVerdict,
    MEMORY_CLASSIFIER_SYSTEM_PROMPT,
};
pub use gate::{GateDecision, GatePolicy, KeywordGate, MemoryGate, IMPORTANT_TRIGGERS};
pub use local::LocalMemoryService;
pub use mem0::Mem0Client;
pub use service::{MemoryBackend, MemoryService};
pub use store::{format_facts, MemoryStore, StoreOutcome, DEFAULT_SEARCH_LIMIT, NO_MEMORIES};
