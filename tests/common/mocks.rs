//! Mock implementations for testing.
//!
//! This module provides mock completion clients and memory services that can
//! be used across different test files without duplication.

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use memchat::llm::{CompletionChunk, CompletionStream, GenerationOptions, LLMClient, StructuredOutput};
use memchat::memory::MemoryService;
use memchat::types::{AppError, ChatMessage, MemoryFact, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Mock LLM client for testing with configurable responses.
///
/// Every message list it is called with is recorded, so tests can inspect the
/// assembled prompt. Streams split the response into 5-character chunks with
/// an empty chunk in between, the way provider keep-alives look after decoding.
///
/// # Examples
///
/// ```ignore
/// let client = MockLLMClient::new("Hello, world!");
/// let classifier = MockLLMClient::new("").with_structured(r#"{"save": "yes"}"#);
/// let broken = MockLLMClient::failing();
/// let cut_off = MockLLMClient::new("Hello, world!").failing_mid_stream(1);
/// ```
#[derive(Clone)]
pub struct MockLLMClient {
    response: String,
    structured: String,
    should_fail: bool,
    stream_fail_after: Option<usize>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    structured_calls: Arc<Mutex<Vec<String>>>,
}

impl MockLLMClient {
    /// Create a new mock client that returns the given response.
    pub fn new(response: &str) -> Self {
        Self {
            response: response.to_string(),
            structured: r#"{"save": "no"}"#.to_string(),
            should_fail: false,
            stream_fail_after: None,
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
            structured_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Raw text returned by `generate_structured`.
    pub fn with_structured(mut self, raw: &str) -> Self {
        self.structured = raw.to_string();
        self
    }

    /// Streams break with an error after `chunks` text chunks.
    pub fn failing_mid_stream(mut self, chunks: usize) -> Self {
        self.stream_fail_after = Some(chunks);
        self
    }

    /// Wait this long before answering `generate`/`stream`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::new("")
        }
    }

    /// Message lists passed to `generate`/`stream`, oldest first.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().clone()
    }

    /// Prompts passed to `generate_structured`.
    pub fn structured_calls(&self) -> Vec<String> {
        self.structured_calls.lock().clone()
    }

    async fn record(&self, messages: &[ChatMessage]) -> Result<()> {
        self.calls.lock().push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<String> {
        self.record(messages).await?;
        Ok(self.response.clone())
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        _options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        self.record(messages).await?;

        let mut chunks = Vec::new();
        for (i, piece) in self.response.chars().collect::<Vec<_>>().chunks(5).enumerate() {
            if self.stream_fail_after == Some(i) {
                chunks.push(Err(AppError::LLM("Mock stream interrupted".to_string())));
                break;
            }
            chunks.push(Ok(CompletionChunk::Text(piece.iter().collect())));
            chunks.push(Ok(CompletionChunk::Empty));
        }

        Ok(Box::new(stream::iter(chunks).boxed()))
    }

    async fn generate_structured(
        &self,
        _system: &str,
        prompt: &str,
        _options: &GenerationOptions,
        _output: &StructuredOutput,
    ) -> Result<String> {
        self.structured_calls.lock().push(prompt.to_string());
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        Ok(self.structured.clone())
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Memory service whose search echoes every stored fact sharing a word with
/// the query, and which can be told to fail.
#[derive(Default)]
pub struct EchoMemoryService {
    facts: Mutex<Vec<(String, String)>>,
    fail_add: bool,
    fail_search: bool,
}

impl EchoMemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_add() -> Self {
        Self {
            fail_add: true,
            ..Self::default()
        }
    }

    pub fn failing_search() -> Self {
        Self {
            fail_search: true,
            ..Self::default()
        }
    }

    pub fn seed(&self, text: &str, user_id: &str) {
        self.facts
            .lock()
            .push((user_id.to_string(), text.to_string()));
    }

    pub fn stored(&self, user_id: &str) -> Vec<String> {
        self.facts
            .lock()
            .iter()
            .filter(|(user, _)| user == user_id)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

#[async_trait]
impl MemoryService for EchoMemoryService {
    async fn add(&self, text: &str, user_id: &str) -> Result<()> {
        if self.fail_add {
            return Err(AppError::Memory("Mock add failure".to_string()));
        }
        self.seed(text, user_id);
        Ok(())
    }

    async fn search(&self, query: &str, user_id: &str, limit: usize) -> Result<Vec<MemoryFact>> {
        if self.fail_search {
            return Err(AppError::Memory("Mock search failure".to_string()));
        }
        let words: Vec<String> = query
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
            .collect();

        Ok(self
            .stored(user_id)
            .into_iter()
            .filter(|fact| {
                let fact = fact.to_lowercase();
                words.iter().any(|w| fact.contains(w.as_str()))
            })
            .take(limit)
            .map(MemoryFact::new)
            .collect())
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

mockall::mock! {
    /// Call-counting memory service.
    pub Memory {}

    #[async_trait]
    impl MemoryService for Memory {
        async fn add(&self, text: &str, user_id: &str) -> Result<()>;
        async fn search(&self, query: &str, user_id: &str, limit: usize) -> Result<Vec<MemoryFact>>;
        fn name(&self) -> &'static str;
    }
}
