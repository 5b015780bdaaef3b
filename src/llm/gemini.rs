use crate::llm::client::{
    http_client, status_error, CompletionChunk, CompletionStream, GenerationOptions, LLMClient,
    StructuredOutput,
};
use crate::types::{AppError, ChatMessage, MessageRole, Result};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use serde::{Deserialize, Serialize};

/// Client for the Google Generative Language `generateContent` API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: String,
    model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_json_schema: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text)
    }
}

/// Decode one `data:` payload of a streamed `streamGenerateContent` call.
pub fn decode_stream_chunk(data: &str) -> CompletionChunk {
    match serde_json::from_str::<GenerateContentResponse>(data) {
        Ok(response) => CompletionChunk::from_delta(response.text()),
        Err(_) => CompletionChunk::Empty,
    }
}

impl GeminiClient {
    pub fn new(api_key: String, api_base: String, model: String) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
        })
    }

    async fn send(&self, url: String, request: &GenerateContentRequest) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| AppError::LLM(format!("Gemini API error: {}", e)))?;

        if !response.status().is_success() {
            return Err(status_error("Gemini", response).await);
        }
        Ok(response)
    }

    async fn complete(&self, request: &GenerateContentRequest) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let response = self.send(url, request).await?;
        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Parse(format!("Invalid Gemini response: {}", e)))?;

        body.text()
            .ok_or_else(|| AppError::LLM("No response from Gemini".to_string()))
    }
}

fn text_content(role: Option<&str>, text: &str) -> Content {
    Content {
        role: role.map(str::to_string),
        parts: vec![Part {
            text: Some(text.to_string()),
        }],
    }
}

/// Split a chat history into Gemini's system instruction and contents.
/// System entries are merged; assistant turns use the `model` role.
fn to_request(messages: &[ChatMessage], options: &GenerationOptions) -> GenerateContentRequest {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == MessageRole::System)
        .map(|m| m.content.as_str())
        .collect();

    let contents = messages
        .iter()
        .filter(|m| m.role != MessageRole::System)
        .map(|m| {
            let role = match m.role {
                MessageRole::Assistant => "model",
                _ => "user",
            };
            text_content(Some(role), &m.content)
        })
        .collect();

    GenerateContentRequest {
        system_instruction: (!system.is_empty()).then(|| text_content(None, &system.join("\n\n"))),
        contents,
        generation_config: GenerationConfig {
            temperature: options.temperature,
            max_output_tokens: options.max_tokens,
            ..Default::default()
        },
    }
}

#[async_trait]
impl LLMClient for GeminiClient {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String> {
        self.complete(&to_request(messages, options)).await
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_base, self.model
        );
        let response = self.send(url, &to_request(messages, options)).await?;
        let stream = response.bytes_stream().eventsource().map(|event| match event {
            Ok(event) => Ok(decode_stream_chunk(&event.data)),
            Err(e) => Err(AppError::LLM(format!("Gemini stream error: {}", e))),
        });

        Ok(Box::new(Box::pin(stream)))
    }

    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        options: &GenerationOptions,
        output: &StructuredOutput,
    ) -> Result<String> {
        let request = GenerateContentRequest {
            system_instruction: Some(text_content(None, system)),
            contents: vec![text_content(Some("user"), prompt)],
            generation_config: GenerationConfig {
                temperature: options.temperature,
                max_output_tokens: options.max_tokens,
                response_mime_type: Some("application/json".to_string()),
                response_json_schema: Some(output.schema.clone()),
            },
        };
        self.complete(&request).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
