//! Wire types and errors for the OpenAI-compatible HTTP client.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while interacting with the OpenAI-compatible endpoint.
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Endpoint responded with an unexpected status code.
    #[error("Unexpected provider response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the provider.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Response parsed but carried no usable payload.
    #[error("Provider response was empty: {0}")]
    EmptyResponse(String),
}

/// Request body for the `/embeddings` endpoint.
#[derive(Debug, Serialize)]
pub struct EmbeddingsRequest<'a> {
    /// Text to embed.
    pub input: &'a str,
    /// Embedding model identifier.
    pub model: &'a str,
}

/// Response body for the `/embeddings` endpoint.
#[derive(Debug, Deserialize)]
pub struct EmbeddingsResponse {
    /// One entry per input (we always send one).
    pub data: Vec<EmbeddingData>,
}

/// Single embedding payload within an [`EmbeddingsResponse`].
#[derive(Debug, Deserialize)]
pub struct EmbeddingData {
    /// The embedding vector.
    pub embedding: Vec<f32>,
}

/// One message within a chat-completion request.
#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    /// Message role (`system` or `user`).
    pub role: &'a str,
    /// Message content.
    pub content: &'a str,
}

/// Request body for the `/chat/completions` endpoint.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    /// Chat model identifier.
    pub model: &'a str,
    /// Conversation messages.
    pub messages: Vec<ChatMessage<'a>>,
    /// Optional completion-length cap.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Response body for the `/chat/completions` endpoint.
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Completion choices; the first one carries the answer.
    pub choices: Vec<ChatChoice>,
}

/// Single choice within a [`ChatResponse`].
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    /// The completion message.
    pub message: ChatResponseMessage,
}

/// Message payload within a [`ChatChoice`].
#[derive(Debug, Deserialize)]
pub struct ChatResponseMessage {
    /// Completion text.
    pub content: String,
}
