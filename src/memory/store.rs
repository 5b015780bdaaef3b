use std::sync::Arc;

use super::gate::MemoryGate;
use super::service::MemoryService;
use crate::types::{MemoryFact, Result};

/// Default number of facts recalled per turn.
pub const DEFAULT_SEARCH_LIMIT: usize = 5;

/// Sentinel rendered when nothing relevant is remembered.
pub const NO_MEMORIES: &str = "None.";

/// Query used for the "everything we know about you" listing.
pub const GENERAL_MEMORY_QUERY: &str = "general knowledge about user";

/// What happened to a message handed to [`MemoryStore::store`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreOutcome {
    /// The message reached the memory service
    pub stored: bool,
    /// Gate warning, if the gate had to fall back
    pub warning: Option<String>,
}

/// Gate-checked writes and formatted reads against a [`MemoryService`].
#[derive(Clone)]
pub struct MemoryStore {
    service: Arc<dyn MemoryService>,
    gate: Arc<dyn MemoryGate>,
    search_limit: usize,
}

/// Render facts as `- fact` lines in service order, or [`NO_MEMORIES`].
pub fn format_facts(facts: &[MemoryFact]) -> String {
    if facts.is_empty() {
        return NO_MEMORIES.to_string();
    }
    facts
        .iter()
        .map(|f| format!("- {}", f.memory))
        .collect::<Vec<_>>()
        .join("\n")
}

impl MemoryStore {
    pub fn new(service: Arc<dyn MemoryService>, gate: Arc<dyn MemoryGate>) -> Self {
        Self {
            service,
            gate,
            search_limit: DEFAULT_SEARCH_LIMIT,
        }
    }

    pub fn with_search_limit(mut self, limit: usize) -> Self {
        self.search_limit = limit;
        self
    }

    pub fn search_limit(&self) -> usize {
        self.search_limit
    }

    pub fn gate_name(&self) -> &'static str {
        self.gate.name()
    }

    /// Gate `text` and, on approval, add it to the memory service.
    ///
    /// Empty text is a no-op. Errors from the service's `add` are returned;
    /// gate problems are not errors but come back as a warning.
    pub async fn store(&self, text: &str, user_id: &str) -> Result<StoreOutcome> {
        if text.is_empty() {
            return Ok(StoreOutcome::default());
        }

        let decision = self.gate.should_store(text).await;
        if !decision.save {
            return Ok(StoreOutcome {
                stored: false,
                warning: decision.warning,
            });
        }

        self.service.add(text, user_id).await?;
        tracing::info!(
            user_id,
            gate = self.gate.name(),
            backend = self.service.name(),
            "Stored user fact"
        );

        Ok(StoreOutcome {
            stored: true,
            warning: decision.warning,
        })
    }

    /// Facts relevant to `query`, formatted for the system prompt.
    pub async fn retrieve(&self, query: &str, user_id: &str) -> Result<String> {
        let facts = self
            .service
            .search(query, user_id, self.search_limit)
            .await?;
        tracing::debug!(user_id, count = facts.len(), "Retrieved memories");
        Ok(format_facts(&facts))
    }

    /// Everything broadly known about the user, one string per fact.
    pub async fn list_facts(&self, user_id: &str) -> Result<Vec<String>> {
        let facts = self
            .service
            .search(GENERAL_MEMORY_QUERY, user_id, self.search_limit)
            .await?;
        Ok(facts.into_iter().map(|f| f.memory).collect())
    }
}
