//! HTTP client wrapper for the OpenAI-compatible API.

use crate::config::get_config;
use crate::openai::types::{
    ChatMessage, ChatRequest, ChatResponse, EmbeddingsRequest, EmbeddingsResponse, OpenAiError,
};
use crate::openai::{ChatClient, EmbeddingClient};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lightweight HTTP client for embedding and chat-completion calls.
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
}

impl OpenAiClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, OpenAiError> {
        let config = get_config();
        Self::with_endpoint(
            &config.openai_base_url,
            &config.openai_api_key,
            &config.embedding_model,
            &config.chat_model,
        )
    }

    /// Construct a client against an explicit endpoint (used by tests).
    pub fn with_endpoint(
        base_url: &str,
        api_key: &str,
        embedding_model: &str,
        chat_model: &str,
    ) -> Result<Self, OpenAiError> {
        let client = Client::builder()
            .user_agent("examrag/0.2")
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        tracing::debug!(url = %base_url, embedding_model, chat_model, "Initialized OpenAI HTTP client");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            embedding_model: embedding_model.to_string(),
            chat_model: chat_model.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, OpenAiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = OpenAiError::UnexpectedStatus { status, body };
        tracing::error!(error = %error, "Provider request failed");
        Err(error)
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, OpenAiError> {
        let body = EmbeddingsRequest {
            input: text,
            model: &self.embedding_model,
        };
        let response = self
            .client
            .post(self.endpoint("embeddings"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let payload: EmbeddingsResponse = Self::ensure_success(response).await?.json().await?;
        payload
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| OpenAiError::EmptyResponse("no embedding in response".to_string()))
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_tokens: Option<u32>,
    ) -> Result<String, OpenAiError> {
        let body = ChatRequest {
            model: &self.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens,
        };
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let payload: ChatResponse = Self::ensure_success(response).await?.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| OpenAiError::EmptyResponse("no completion choices".to_string()))
    }
}
