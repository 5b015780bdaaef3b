//! Mem0 platform client.
//!
//! Speaks the hosted REST API directly: `POST /v1/memories/` to add and
//! `POST /v2/memories/search/` to search, with `Authorization: Token <key>`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::service::MemoryService;
use crate::types::{AppError, MemoryFact, Result};

pub const DEFAULT_MEM0_API_BASE: &str = "https://api.mem0.ai";
pub const DEFAULT_MEM0_VERSION: &str = "v2";

pub struct Mem0Client {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct AddRequest<'a> {
    messages: [AddMessage<'a>; 1],
    user_id: &'a str,
    version: &'a str,
}

#[derive(Debug, Serialize)]
struct AddMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    filters: serde_json::Value,
    version: &'a str,
    limit: usize,
}

/// Search replies come either wrapped in `{"results": [...]}` or as a bare list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Wrapped {
        #[serde(default)]
        results: Option<Vec<MemoryFact>>,
    },
    Bare(Vec<MemoryFact>),
}

impl SearchResponse {
    fn into_facts(self) -> Vec<MemoryFact> {
        match self {
            SearchResponse::Wrapped { results } => results.unwrap_or_default(),
            SearchResponse::Bare(facts) => facts,
        }
    }
}

/// Decode a search body; `null` or an empty body means no results.
pub fn decode_search_body(body: &str) -> Result<Vec<MemoryFact>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let parsed: Option<SearchResponse> = serde_json::from_str(body)
        .map_err(|e| AppError::Memory(format!("Invalid Mem0 search response: {}", e)))?;
    Ok(parsed.map(SearchResponse::into_facts).unwrap_or_default())
}

impl Mem0Client {
    pub fn new(api_key: String, api_base: String, version: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Config("Mem0 client requires a non-empty API key".to_string()));
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("memchat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            version,
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<String> {
        let response = self
            .http
            .post(format!("{}{}", self.api_base, path))
            .header("Authorization", format!("Token {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::Memory(format!("Mem0 request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Memory(format!("Mem0 response unreadable: {}", e)))?;

        if !status.is_success() {
            return Err(AppError::Memory(format!("Mem0 API error ({}): {}", status, text)));
        }
        Ok(text)
    }
}

#[async_trait]
impl MemoryService for Mem0Client {
    async fn add(&self, text: &str, user_id: &str) -> Result<()> {
        let request = AddRequest {
            messages: [AddMessage {
                role: "user",
                content: text,
            }],
            user_id,
            version: &self.version,
        };
        self.post("/v1/memories/", &request).await?;
        Ok(())
    }

    async fn search(&self, query: &str, user_id: &str, limit: usize) -> Result<Vec<MemoryFact>> {
        let request = SearchRequest {
            query,
            filters: serde_json::json!({ "AND": [{ "user_id": user_id }] }),
            version: &self.version,
            limit,
        };
        let body = self.post("/v2/memories/search/", &request).await?;
        decode_search_body(&body)
    }

    fn name(&self) -> &'static str {
        "mem0"
    }
}
