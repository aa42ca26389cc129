use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the examrag assistant.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// API key passed to the OpenAI-compatible endpoint.
    pub openai_api_key: String,
    /// Base URL of the OpenAI-compatible endpoint (override for tests/proxies).
    pub openai_base_url: String,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Chat model used for answer synthesis and question generation.
    pub chat_model: String,
    /// Directory scanned for source PDF documents.
    pub data_dir: PathBuf,
    /// Directory holding the persisted dense index and corpus file.
    pub index_dir: PathBuf,
    /// Token budget per chunk produced during ingestion.
    pub chunk_max_tokens: usize,
    /// Word overlap hint between adjacent chunks (the chunker seeds with half).
    pub chunk_overlap: usize,
    /// Cosine similarity floor applied to dense retrieval candidates.
    ///
    /// The dense index stores unit vectors, so inner-product scores are cosine
    /// similarities in `[-1, 1]`; candidates scoring below this floor are
    /// discarded before lexical re-ranking.
    pub search_score_threshold: f32,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            openai_api_key: load_env("OPENAI_API_KEY")?,
            openai_base_url: load_env_optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| "text-embedding-3-small".to_string()),
            embedding_dimension: parse_env_or("EMBEDDING_DIMENSION", 1536)?,
            chat_model: load_env_optional("CHAT_MODEL").unwrap_or_else(|| "gpt-4o".to_string()),
            data_dir: load_env_optional("DATA_DIR")
                .map_or_else(|| PathBuf::from("data"), PathBuf::from),
            index_dir: load_env_optional("INDEX_DIR")
                .map_or_else(|| PathBuf::from("embeddings"), PathBuf::from),
            chunk_max_tokens: parse_env_or("CHUNK_MAX_TOKENS", 300)?,
            chunk_overlap: parse_env_or("CHUNK_OVERLAP", 50)?,
            search_score_threshold: parse_env_or("SEARCH_SCORE_THRESHOLD", 0.3)?,
        })
    }
}

fn load_env(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingVariable(key.to_string()))
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|parsed| parsed.unwrap_or(default))
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() {
    dotenvy::dotenv().ok();
    let config = Config::from_env().expect("Failed to load config from environment");
    tracing::debug!(
        base_url = %config.openai_base_url,
        embedding_model = %config.embedding_model,
        chat_model = %config.chat_model,
        data_dir = %config.data_dir.display(),
        index_dir = %config.index_dir.display(),
        "Loaded configuration"
    );
    CONFIG.set(config).expect("Failed to set config");
}
