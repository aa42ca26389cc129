//! OpenAI-compatible provider boundary.
//!
//! The retrieval core never talks HTTP directly; it depends on two narrow
//! capabilities: [`EmbeddingClient`] (text in, fixed-length vector out) and
//! [`ChatClient`] (prompts in, answer text out). [`OpenAiClient`] implements
//! both against the `/embeddings` and `/chat/completions` endpoints, and tests
//! substitute deterministic stubs.

pub mod client;
pub mod types;

pub use client::OpenAiClient;
pub use types::OpenAiError;

use async_trait::async_trait;

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for the supplied text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, OpenAiError>;
}

/// Interface implemented by chat-completion backends.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Generate a completion for the supplied system/user prompt pair.
    ///
    /// `max_tokens` caps the completion length when set; `None` leaves the
    /// model default in place.
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: Option<u32>,
    ) -> Result<String, OpenAiError>;
}
