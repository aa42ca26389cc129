//! Core data types and error definitions for the text pipeline.

use anyhow::Error as TokenizerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One extracted question together with its answer line.
///
/// The answer is empty when no matching answer line appeared before the next
/// question or the page boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaItem {
    /// Question text, always non-empty.
    pub question: String,
    /// Answer line, possibly empty.
    pub answer: String,
}

/// What a single PDF page contributed during parsing.
///
/// A page yields either question/answer items or one general passage, never
/// both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    /// Question/answer pairs detected on the page.
    Qa(Vec<QaItem>),
    /// The page's full stripped text, used when no QA pattern was found.
    Passage(String),
}

/// One chunk derived from a question's text, sharing that question's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QaChunkPair {
    /// Chunked question text.
    pub question: String,
    /// Answer inherited from the source question (possibly empty).
    pub answer: String,
}

/// Output of chunking an ingestion run: QA chunks plus general passage chunks.
#[derive(Debug, Clone, Default)]
pub struct ChunkedCorpus {
    /// Chunks derived from question texts, each paired with its answer.
    pub qa_pairs: Vec<QaChunkPair>,
    /// Chunks derived from general page passages.
    pub general_chunks: Vec<String>,
}

/// Errors produced while turning raw text into token-bounded chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Tokenizer resources were unavailable for the configured model.
    #[error("failed to initialize tokenizer for model '{model}': {source}")]
    Tokenizer {
        /// Embedding model we attempted to load.
        model: String,
        /// Underlying error raised by the tokenizer library.
        #[source]
        source: TokenizerError,
    },
}
