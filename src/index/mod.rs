//! Dual-index corpus: dense similarity + lexical BM25 over one entry sequence.
//!
//! [`CorpusIndex`] is the single owned aggregate holding the corpus entries,
//! the dense vector index, and the BM25 index. Row *i* of the dense index is
//! always the embedding of `entries[i].text`, and the BM25 index is always
//! derived from the same sequence: the alignment invariant is enforced by
//! construction, never by convention across separately built collections.

pub mod dense;
pub mod lexical;
pub mod persist;

pub use dense::DenseIndex;
pub use lexical::Bm25Index;

use crate::openai::{EmbeddingClient, OpenAiError};
use crate::processing::ChunkedCorpus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text indexed when the ingestion run produced no usable chunks, so the
/// indexes are never zero-sized.
pub const PLACEHOLDER_TEXT: &str = "기본 더미 데이터";

/// Errors raised while building, persisting, or loading the corpus index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Embedding provider failed to produce a vector for an entry.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] OpenAiError),
    /// A vector's dimensionality did not match the index.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimensionality the index was built with.
        expected: usize,
        /// Dimensionality of the offending vector.
        actual: usize,
    },
    /// Filesystem interaction failed during persistence.
    #[error("Index IO failed: {0}")]
    Io(#[from] std::io::Error),
    /// Corpus JSON could not be serialized or parsed.
    #[error("Corpus serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    /// Persisted artifacts were present but inconsistent.
    #[error("Persisted index is corrupt: {0}")]
    Corrupt(String),
}

/// One indexed text unit, positionally aligned with a dense-index row.
///
/// Question-derived entries carry the source question's answer (`Some("")`
/// when no answer line was found); general passage chunks carry `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusEntry {
    /// The indexed text (a question chunk or a passage chunk).
    pub text: String,
    /// Answer inherited from the source question; `None` for passages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

impl CorpusEntry {
    /// Build a question-derived entry.
    pub fn question(text: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            answer: Some(answer.into()),
        }
    }

    /// Build a general passage entry.
    pub fn passage(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            answer: None,
        }
    }

    /// Whether this entry came from a question's text.
    pub fn is_question(&self) -> bool {
        self.answer.is_some()
    }
}

/// The aligned aggregate of corpus entries, dense vectors, and BM25 stats.
#[derive(Debug)]
pub struct CorpusIndex {
    entries: Vec<CorpusEntry>,
    dense: DenseIndex,
    lexical: Bm25Index,
}

impl CorpusIndex {
    /// Embed and index a chunked corpus: QA chunk entries first, then passage
    /// chunks, in that fixed order. An empty corpus is replaced by a single
    /// placeholder entry. Every provider vector must have exactly `dimension`
    /// components; a shorter or longer vector is an error.
    pub async fn build(
        chunked: &ChunkedCorpus,
        embedder: &dyn EmbeddingClient,
        dimension: usize,
    ) -> Result<Self, IndexError> {
        let mut entries: Vec<CorpusEntry> = chunked
            .qa_pairs
            .iter()
            .map(|pair| CorpusEntry::question(&pair.question, &pair.answer))
            .collect();
        entries.extend(
            chunked
                .general_chunks
                .iter()
                .map(|chunk| CorpusEntry::passage(chunk)),
        );

        if entries.is_empty() {
            tracing::warn!("No corpus data to index; building a placeholder index");
            entries.push(CorpusEntry::passage(PLACEHOLDER_TEXT));
        }

        tracing::info!(entries = entries.len(), "Embedding corpus entries");

        let mut dense = DenseIndex::new(dimension);
        for entry in &entries {
            let vector = embedder.embed(&entry.text).await?;
            dense.push(vector)?;
        }

        let lexical = Bm25Index::build(&texts(&entries));
        tracing::info!(
            rows = dense.len(),
            dim = dense.dim(),
            "Dense and BM25 indexes built"
        );

        Ok(Self {
            entries,
            dense,
            lexical,
        })
    }

    /// Reassemble the aggregate from persisted parts, rebuilding the lexical
    /// index and validating the alignment invariant.
    pub(crate) fn from_parts(
        entries: Vec<CorpusEntry>,
        dense: DenseIndex,
    ) -> Result<Self, IndexError> {
        if entries.len() != dense.len() {
            return Err(IndexError::Corrupt(format!(
                "corpus has {} entries but the dense index has {} rows",
                entries.len(),
                dense.len()
            )));
        }
        let lexical = Bm25Index::build(&texts(&entries));
        Ok(Self {
            entries,
            dense,
            lexical,
        })
    }

    /// The ordered entry sequence.
    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    /// The dense similarity index.
    pub fn dense(&self) -> &DenseIndex {
        &self.dense
    }

    /// The lexical BM25 index.
    pub fn lexical(&self) -> &Bm25Index {
        &self.lexical
    }

    /// Number of aligned entries (equal across both indexes).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries (never true for a built index).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn texts(entries: &[CorpusEntry]) -> Vec<&str> {
    entries.iter().map(|entry| entry.text.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::EmbeddingClient;
    use crate::processing::QaChunkPair;
    use async_trait::async_trait;

    /// Deterministic embedding stub: hashes bytes into vector slots.
    pub(crate) struct StubEmbedder {
        pub dim: usize,
    }

    #[async_trait]
    impl EmbeddingClient for StubEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, OpenAiError> {
            let mut vector = vec![0.0_f32; self.dim];
            for (idx, byte) in text.bytes().enumerate() {
                vector[idx % self.dim] += f32::from(byte) / 255.0;
            }
            Ok(vector)
        }
    }

    fn sample_corpus() -> ChunkedCorpus {
        ChunkedCorpus {
            qa_pairs: vec![
                QaChunkPair {
                    question: "1. 유동비율 계산: 100 50".to_string(),
                    answer: "정답 200%".to_string(),
                },
                QaChunkPair {
                    question: "2. 스포츠 마케팅의 정의는 무엇인가".to_string(),
                    answer: String::new(),
                },
            ],
            general_chunks: vec!["스포츠 산업은 빠르게 성장하고 있다".to_string()],
        }
    }

    #[tokio::test]
    async fn build_keeps_qa_entries_before_passages() {
        let index = CorpusIndex::build(&sample_corpus(), &StubEmbedder { dim: 8 }, 8)
            .await
            .expect("build");
        assert_eq!(index.len(), 3);
        assert!(index.entries()[0].is_question());
        assert!(index.entries()[1].is_question());
        assert!(!index.entries()[2].is_question());
    }

    #[tokio::test]
    async fn build_aligns_all_three_structures() {
        let embedder = StubEmbedder { dim: 8 };
        let index = CorpusIndex::build(&sample_corpus(), &embedder, 8)
            .await
            .expect("build");
        assert_eq!(index.dense().len(), index.len());
        assert_eq!(index.lexical().len(), index.len());

        // Row i must be the (normalized) embedding of entries[i].
        for (i, entry) in index.entries().iter().enumerate() {
            let expected = dense::l2_normalize(embedder.embed(&entry.text).await.expect("embed"));
            let row = index.dense().vector(i);
            for (a, b) in row.iter().zip(expected.iter()) {
                assert!((a - b).abs() < 1e-6);
            }
        }
    }

    #[tokio::test]
    async fn empty_corpus_builds_placeholder_index_of_size_one() {
        let index = CorpusIndex::build(&ChunkedCorpus::default(), &StubEmbedder { dim: 8 }, 8)
            .await
            .expect("build");
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries()[0].text, PLACEHOLDER_TEXT);
        assert!(!index.entries()[0].is_question());
        assert_eq!(index.dense().len(), 1);
    }

    #[tokio::test]
    async fn build_rejects_vectors_of_the_wrong_dimension() {
        let error = CorpusIndex::build(&sample_corpus(), &StubEmbedder { dim: 8 }, 1536)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            IndexError::DimensionMismatch {
                expected: 1536,
                actual: 8
            }
        ));
    }

    #[test]
    fn from_parts_rejects_misaligned_lengths() {
        let entries = vec![CorpusEntry::passage("하나"), CorpusEntry::passage("둘")];
        let mut dense = DenseIndex::new(2);
        dense.push(vec![1.0, 0.0]).expect("push");
        let error = CorpusIndex::from_parts(entries, dense).unwrap_err();
        assert!(matches!(error, IndexError::Corrupt(_)));
    }
}
