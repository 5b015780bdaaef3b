//! In-process memory service for offline runs and tests.
//!
//! Relevance is plain word overlap: a fact scores one point per distinct
//! query word it contains. Like a vector search, every fact is a candidate;
//! zero-score facts trail the matching ones in insertion order.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

use super::service::MemoryService;
use crate::types::{MemoryFact, Result};

#[derive(Default)]
pub struct LocalMemoryService {
    facts: RwLock<HashMap<String, Vec<String>>>,
}

fn words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl LocalMemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything stored for `user_id`, oldest first.
    pub fn all(&self, user_id: &str) -> Vec<String> {
        self.facts.read().get(user_id).cloned().unwrap_or_default()
    }

    pub fn len(&self, user_id: &str) -> usize {
        self.facts.read().get(user_id).map_or(0, Vec::len)
    }

    pub fn is_empty(&self, user_id: &str) -> bool {
        self.len(user_id) == 0
    }
}

#[async_trait]
impl MemoryService for LocalMemoryService {
    async fn add(&self, text: &str, user_id: &str) -> Result<()> {
        self.facts
            .write()
            .entry(user_id.to_string())
            .or_default()
            .push(text.to_string());
        Ok(())
    }

    async fn search(&self, query: &str, user_id: &str, limit: usize) -> Result<Vec<MemoryFact>> {
        let query_words = words(query);
        let guard = self.facts.read();
        let Some(stored) = guard.get(user_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(usize, &String)> = stored
            .iter()
            .map(|fact| (words(fact).intersection(&query_words).count(), fact))
            .collect();
        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, fact)| MemoryFact::new(fact.clone()))
            .collect())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
