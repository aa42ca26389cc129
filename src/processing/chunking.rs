//! Token-aware chunking of normalized corpus text.
//!
//! Chunks are built by greedily accumulating whitespace-delimited words under a
//! token budget. When the next word would overflow the budget, the running
//! chunk is closed and the next one is seeded with the tail of the previous
//! chunk (half the configured overlap, in words) plus the triggering word, so
//! spans around boundaries stay visible to retrieval. Chunks at or below
//! [`MIN_CHUNK_TOKENS`] tokens are dropped rather than indexed.
//!
//! Token counting uses `tiktoken-rs`: the embedding model is resolved to its
//! encoding when known, with `cl100k_base` as the fallback.

use std::sync::Arc;
use tiktoken_rs::{
    CoreBPE, cl100k_base, get_bpe_from_model, o200k_base, p50k_base, p50k_edit, r50k_base,
};

use super::normalize::clean_text;
use super::types::{ChunkedCorpus, ChunkingError, QaChunkPair, QaItem};
use anyhow::Error as TokenizerError;

/// Shared token-counting closure used across the pipeline.
pub type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Minimum token count a chunk must exceed to be kept.
pub const MIN_CHUNK_TOKENS: usize = 10;

/// Build a tiktoken-backed token counter for the given embedding model.
pub fn build_token_counter(model: &str) -> Result<TokenCounter, ChunkingError> {
    let normalized = model.trim();
    let target = if normalized.is_empty() {
        "cl100k_base"
    } else {
        normalized
    };
    let encoding = resolve_encoding(target).map_err(|source| ChunkingError::Tokenizer {
        model: target.to_string(),
        source,
    })?;
    let encoding = Arc::new(encoding);

    Ok(Arc::new(move |segment: &str| {
        encoding.encode_ordinary(segment).len()
    }))
}

fn resolve_encoding(model: &str) -> Result<CoreBPE, TokenizerError> {
    match get_bpe_from_model(model) {
        Ok(encoding) => Ok(encoding),
        Err(model_err) => {
            tracing::debug!(
                model,
                error = %model_err,
                "Tokenizer model lookup failed; trying encoding name"
            );
            if let Some(candidate) = encoding_from_name(model) {
                candidate
            } else {
                tracing::warn!(
                    model,
                    "Falling back to 'cl100k_base' encoding for token counting"
                );
                cl100k_base()
            }
        }
    }
}

fn encoding_from_name(name: &str) -> Option<Result<CoreBPE, TokenizerError>> {
    match name {
        "cl100k_base" => Some(cl100k_base()),
        "o200k_base" => Some(o200k_base()),
        "p50k_base" => Some(p50k_base()),
        "p50k_edit" => Some(p50k_edit()),
        "r50k_base" | "gpt2" => Some(r50k_base()),
        _ => None,
    }
}

/// Split normalized text into token-bounded chunks with word overlap.
///
/// Words accumulate while the running token count stays within `max_tokens`.
/// On overflow the current chunk is emitted (if it exceeds the
/// [`MIN_CHUNK_TOKENS`] floor) and the next chunk is seeded with the last
/// `overlap / 2` words plus the triggering word; the running count restarts
/// from that seed. The final chunk is emitted under the same floor.
///
/// Empty input yields no chunks. A single word over the budget still becomes
/// its own chunk; no hard truncation happens here.
pub fn chunk_text(
    text: &str,
    max_tokens: usize,
    overlap: usize,
    counter: &TokenCounter,
) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut current_tokens = 0usize;

    for word in text.split_whitespace() {
        let word_tokens = counter(word);
        if current_tokens + word_tokens > max_tokens {
            close_chunk(&current, counter, &mut chunks);
            let seed_start = current.len().saturating_sub(overlap / 2);
            let mut seeded = current[seed_start..].to_vec();
            seeded.push(word);
            current_tokens = seeded.iter().map(|w| counter(w)).sum();
            current = seeded;
        } else {
            current.push(word);
            current_tokens += word_tokens;
        }
    }

    close_chunk(&current, counter, &mut chunks);
    chunks
}

fn close_chunk(words: &[&str], counter: &TokenCounter, chunks: &mut Vec<String>) {
    if words.is_empty() {
        return;
    }
    let joined = words.join(" ");
    if counter(&joined) > MIN_CHUNK_TOKENS {
        chunks.push(joined);
    }
}

/// Normalize and chunk an ingestion run into QA chunk pairs and passage chunks.
///
/// Every chunk of a question's text inherits that question's answer. Questions
/// that normalize to the empty string are skipped.
pub fn chunk_corpus(
    items: &[QaItem],
    general_texts: &[String],
    max_tokens: usize,
    overlap: usize,
    counter: &TokenCounter,
) -> ChunkedCorpus {
    let mut corpus = ChunkedCorpus::default();

    for item in items {
        let question = clean_text(&item.question);
        if question.is_empty() {
            continue;
        }
        for chunk in chunk_text(&question, max_tokens, overlap, counter) {
            corpus.qa_pairs.push(QaChunkPair {
                question: chunk,
                answer: item.answer.clone(),
            });
        }
    }

    for text in general_texts {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            continue;
        }
        corpus
            .general_chunks
            .extend(chunk_text(&cleaned, max_tokens, overlap, counter));
    }

    corpus
}

/// Truncate text to at most `max_tokens` tokens under the model's encoding.
///
/// Used to bound retrieved passages before they enter the answer prompt. If a
/// cut lands inside a multi-byte sequence, the boundary backs off until the
/// decode succeeds.
pub fn truncate_to_tokens(
    text: &str,
    max_tokens: usize,
    model: &str,
) -> Result<String, ChunkingError> {
    let encoding = resolve_encoding(model).map_err(|source| ChunkingError::Tokenizer {
        model: model.to_string(),
        source,
    })?;
    let tokens = encoding.encode_ordinary(text);
    if tokens.len() <= max_tokens {
        return Ok(text.to_string());
    }

    let mut end = max_tokens;
    while end > 0 {
        match encoding.decode(tokens[..end].to_vec()) {
            Ok(decoded) => return Ok(decoded),
            Err(_) => end -= 1,
        }
    }
    Ok(String::new())
}
