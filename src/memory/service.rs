use crate::types::{MemoryFact, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// External store of short user facts, partitioned by user id.
///
/// Writes are fire-and-forget: nothing identifying the stored fact is read back.
#[async_trait]
pub trait MemoryService: Send + Sync {
    /// Persist `text` under `user_id`
    async fn add(&self, text: &str, user_id: &str) -> Result<()>;

    /// Up to `limit` facts relevant to `query`, most relevant first
    async fn search(&self, query: &str, user_id: &str, limit: usize) -> Result<Vec<MemoryFact>>;

    /// Short identifier used in logs
    fn name(&self) -> &'static str;
}

/// Which memory service to talk to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MemoryBackend {
    /// Hosted Mem0 platform
    #[default]
    Mem0,
    /// In-process store, forgotten on restart
    Local,
}

impl std::fmt::Display for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MemoryBackend::Mem0 => write!(f, "mem0"),
            MemoryBackend::Local => write!(f, "local"),
        }
    }
}
