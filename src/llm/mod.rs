//! LLM Provider Clients and Abstractions
//!
//! This module provides a unified interface for the completion services the
//! chat server depends on. Provider-specific wire formats are hidden behind
//! the [`LLMClient`] trait.
//!
//! # Architecture
//!
//! - [`LLMClient`] - The core trait that all providers implement
//! - [`Provider`] - Runtime provider selection; builds shared clients
//! - [`CompletionChunk`] - Streamed deltas, decoded once at the client boundary
//!
//! # Supported Providers
//!
//! - `openai` - OpenAI-compatible chat completions (OpenAI, Groq, OpenRouter)
//! - `gemini` - Google Generative Language API
//!
//! # Example
//!
//! ```ignore
//! use memchat::llm::{GenerationOptions, Provider};
//! use memchat::types::ChatMessage;
//!
//! let client = provider.create_client()?;
//! let reply = client
//!     .generate(&[ChatMessage::user("What is 2+2?")], &GenerationOptions::new(0.3))
//!     .await?;
//! ```

/// Core LLM client trait and streaming chunk types.
pub mod client;
/// Google Gemini client.
pub mod gemini;
/// OpenAI-compatible chat completions client, built on `async-openai`.
pub mod openai;

pub use client::{
    CompletionChunk, CompletionStream, GenerationOptions, LLMClient, Provider, StructuredOutput,
};
