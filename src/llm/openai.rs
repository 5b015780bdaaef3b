use crate::llm::client::{
    CompletionChunk, CompletionStream, GenerationOptions, LLMClient, StructuredOutput,
};
use crate::types::{AppError, ChatMessage, MessageRole, Result};
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    CreateChatCompletionStreamResponse, ResponseFormat, ResponseFormatJsonSchema,
};
use async_openai::Client;
use async_trait::async_trait;
use futures::StreamExt;

/// Client for OpenAI-compatible chat completion endpoints (OpenAI, Groq, ...).
pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIClient {
    pub fn new(api_key: String, api_base: String, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(api_base.trim_end_matches('/'));

        Self {
            client: Client::with_config(config),
            model,
        }
    }

    fn build_request(
        &self,
        messages: Vec<ChatCompletionRequestMessage>,
        options: &GenerationOptions,
    ) -> CreateChatCompletionRequest {
        CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: options.temperature,
            max_completion_tokens: options.max_tokens,
            ..Default::default()
        }
    }

    async fn complete(&self, request: CreateChatCompletionRequest) -> Result<String> {
        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| AppError::LLM("No response from OpenAI".to_string()))
    }
}

fn system_message(content: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
        content: ChatCompletionRequestSystemMessageContent::Text(content.to_string()),
        name: None,
    })
}

fn user_message(content: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
        content: ChatCompletionRequestUserMessageContent::Text(content.to_string()),
        name: None,
    })
}

#[allow(deprecated)]
fn assistant_message(content: &str) -> ChatCompletionRequestMessage {
    ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
        content: Some(ChatCompletionRequestAssistantMessageContent::Text(
            content.to_string(),
        )),
        refusal: None,
        name: None,
        audio: None,
        tool_calls: None,
        function_call: None,
    })
}

fn to_openai_messages(messages: &[ChatMessage]) -> Vec<ChatCompletionRequestMessage> {
    messages
        .iter()
        .map(|m| match m.role {
            MessageRole::System => system_message(&m.content),
            MessageRole::User => user_message(&m.content),
            MessageRole::Assistant => assistant_message(&m.content),
        })
        .collect()
}

/// Reduce one streamed chunk to its text delta (first choice only).
fn chunk_delta(chunk: CreateChatCompletionStreamResponse) -> CompletionChunk {
    CompletionChunk::from_delta(
        chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content),
    )
}

fn map_openai_error(err: OpenAIError) -> AppError {
    match err {
        OpenAIError::ApiError(api_err) => {
            let kind = api_err
                .code
                .clone()
                .or_else(|| api_err.r#type.clone())
                .unwrap_or_else(|| "unknown".to_string());
            AppError::LLM(format!("OpenAI API error ({}): {}", kind, api_err.message))
        }
        OpenAIError::JSONDeserialize(e, _) => {
            AppError::Parse(format!("Invalid OpenAI response: {}", e))
        }
        other => AppError::LLM(format!("OpenAI API error: {}", other)),
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<String> {
        let request = self.build_request(to_openai_messages(messages), options);
        self.complete(request).await
    }

    async fn stream(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let mut request = self.build_request(to_openai_messages(messages), options);
        request.stream = Some(true);

        let stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(map_openai_error)?;

        let chunks = stream.map(|item| item.map(chunk_delta).map_err(map_openai_error));
        Ok(Box::new(chunks))
    }

    async fn generate_structured(
        &self,
        system: &str,
        prompt: &str,
        options: &GenerationOptions,
        output: &StructuredOutput,
    ) -> Result<String> {
        let mut request =
            self.build_request(vec![system_message(system), user_message(prompt)], options);
        request.response_format = Some(ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: None,
                name: output.name.clone(),
                schema: Some(output.schema.clone()),
                strict: Some(true),
            },
        });
        self.complete(request).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
