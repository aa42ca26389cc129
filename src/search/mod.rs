//! Hybrid retrieval: dense candidate generation, cosine thresholding, and
//! BM25 re-ranking over the aligned corpus.
//!
//! The retriever over-fetches `4 × top_k` dense neighbors, drops candidates
//! below the cosine floor, re-sorts the survivors by BM25 score against the
//! raw whitespace-tokenized query (stable, so ties keep their dense order),
//! and returns the top `top_k` wrapped per the source entry's variant.
//! Candidates are `(corpus row, cosine)` tuples end to end; duplicate texts at
//! different rows stay distinct and no score is ever looked up by text value.

use crate::index::{CorpusIndex, IndexError};
use crate::openai::{EmbeddingClient, OpenAiError};
use thiserror::Error;

/// Dense over-fetch factor applied before lexical re-ranking.
const CANDIDATE_MULTIPLIER: usize = 4;

/// Errors emitted while orchestrating a hybrid search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Embedding provider failed to return a vector for the query text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] OpenAiError),
    /// Dense index rejected the query vector.
    #[error("Dense search failed: {0}")]
    Index(#[from] IndexError),
}

/// One retrieval hit, tagged by the source entry's kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchResult {
    /// Hit on a question-derived entry, carrying its answer.
    Qa {
        /// The matched question chunk.
        question: String,
        /// The answer inherited from the source question (possibly empty).
        answer: String,
    },
    /// Hit on a general passage chunk.
    Text {
        /// The matched passage chunk.
        text: String,
    },
}

impl SearchResult {
    /// The matched text regardless of variant.
    pub fn text(&self) -> &str {
        match self {
            Self::Qa { question, .. } => question,
            Self::Text { text } => text,
        }
    }
}

/// Run a hybrid query against the corpus index.
///
/// `index` is `None` before any index has been built or loaded; that case is
/// recoverable and yields an empty result set rather than an error.
/// `threshold` is the cosine floor applied to dense candidates.
pub async fn hybrid_search(
    index: Option<&CorpusIndex>,
    embedder: &dyn EmbeddingClient,
    query: &str,
    top_k: usize,
    threshold: f32,
) -> Result<Vec<SearchResult>, SearchError> {
    let Some(index) = index else {
        tracing::warn!("Search invoked before any index was built or loaded");
        return Ok(Vec::new());
    };

    let query_vector = embedder.embed(query).await?;
    let raw_k = top_k.saturating_mul(CANDIDATE_MULTIPLIER);
    let neighbors = index.dense().search(query_vector, raw_k)?;

    // (corpus row, cosine) candidates surviving the similarity floor.
    let mut candidates: Vec<(usize, f32)> = neighbors
        .into_iter()
        .filter(|&(row, similarity)| row < index.len() && similarity >= threshold)
        .collect();

    if !index.lexical().is_empty() {
        let query_tokens: Vec<&str> = query.split_whitespace().collect();
        let scores = index.lexical().scores(&query_tokens);
        // Stable sort: equal lexical scores keep their dense-rank order.
        candidates.sort_by(|a, b| scores[b.0].total_cmp(&scores[a.0]));
    }

    candidates.truncate(top_k);
    tracing::debug!(query, hits = candidates.len(), "Hybrid search complete");

    Ok(candidates
        .into_iter()
        .map(|(row, _)| to_result(&index.entries()[row]))
        .collect())
}

fn to_result(entry: &crate::index::CorpusEntry) -> SearchResult {
    match &entry.answer {
        Some(answer) => SearchResult::Qa {
            question: entry.text.clone(),
            answer: answer.clone(),
        },
        None => SearchResult::Text {
            text: entry.text.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{CorpusEntry, DenseIndex};
    use async_trait::async_trait;

    /// Embedder stub returning one fixed vector for every query.
    struct FixedEmbedder(Vec<f32>);

    #[async_trait]
    impl EmbeddingClient for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, OpenAiError> {
            Ok(self.0.clone())
        }
    }

    fn index_of(rows: Vec<(CorpusEntry, Vec<f32>)>) -> CorpusIndex {
        let dim = rows[0].1.len();
        let mut dense = DenseIndex::new(dim);
        let mut entries = Vec::new();
        for (entry, vector) in rows {
            dense.push(vector).expect("push");
            entries.push(entry);
        }
        test_index(entries, dense)
    }

    fn test_index(entries: Vec<CorpusEntry>, dense: DenseIndex) -> CorpusIndex {
        // from_parts is crate-visible; alignment is validated there.
        CorpusIndex::from_parts(entries, dense).expect("aligned")
    }

    #[tokio::test]
    async fn missing_index_yields_empty_results_not_an_error() {
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        let results = hybrid_search(None, &embedder, "유동비율", 3, 0.3)
            .await
            .expect("recoverable");
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn candidates_below_the_cosine_floor_are_discarded() {
        let index = index_of(vec![
            (CorpusEntry::passage("관련 있는 내용"), vec![1.0, 0.0]),
            (CorpusEntry::passage("전혀 다른 내용"), vec![0.0, 1.0]),
        ]);
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        let results = hybrid_search(Some(&index), &embedder, "질문", 5, 0.3)
            .await
            .expect("search");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text(), "관련 있는 내용");
    }

    #[tokio::test]
    async fn lexical_scores_rerank_dense_candidates() {
        // Dense order favors row 0; the query term only occurs in row 1.
        let index = index_of(vec![
            (CorpusEntry::passage("스포츠 경기장 운영"), vec![1.0, 0.0]),
            (CorpusEntry::passage("유동비율 계산 방법"), vec![0.9, 0.1]),
            (CorpusEntry::passage("구단 수익 구조"), vec![0.8, 0.2]),
        ]);
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        let results = hybrid_search(Some(&index), &embedder, "유동비율", 3, 0.3)
            .await
            .expect("search");
        assert_eq!(results[0].text(), "유동비율 계산 방법");
        assert_eq!(results[1].text(), "스포츠 경기장 운영");
    }

    #[tokio::test]
    async fn equal_lexical_scores_keep_dense_order() {
        let index = index_of(vec![
            (CorpusEntry::passage("첫번째 후보 문서"), vec![0.8, 0.2]),
            (CorpusEntry::passage("두번째 후보 문서"), vec![1.0, 0.0]),
            (CorpusEntry::passage("세번째 후보 문서"), vec![0.9, 0.1]),
        ]);
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        // No query token appears in any document, so all BM25 scores are 0.
        let results = hybrid_search(Some(&index), &embedder, "없는 단어", 3, 0.3)
            .await
            .expect("search");
        assert_eq!(results[0].text(), "두번째 후보 문서");
        assert_eq!(results[1].text(), "세번째 후보 문서");
        assert_eq!(results[2].text(), "첫번째 후보 문서");
    }

    #[tokio::test]
    async fn question_entries_surface_as_qa_results() {
        let index = index_of(vec![(
            CorpusEntry::question("1. 유동비율 계산: 100 50", "정답 200%"),
            vec![1.0, 0.0],
        )]);
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        let results = hybrid_search(Some(&index), &embedder, "유동비율", 1, 0.3)
            .await
            .expect("search");
        assert_eq!(
            results[0],
            SearchResult::Qa {
                question: "1. 유동비율 계산: 100 50".to_string(),
                answer: "정답 200%".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn top_k_bounds_the_result_count() {
        let rows: Vec<(CorpusEntry, Vec<f32>)> = (0..10)
            .map(|i| {
                (
                    CorpusEntry::passage(format!("문서 번호 {i}")),
                    vec![1.0, i as f32 * 0.01],
                )
            })
            .collect();
        let index = index_of(rows);
        let embedder = FixedEmbedder(vec![1.0, 0.0]);
        let results = hybrid_search(Some(&index), &embedder, "문서", 3, 0.3)
            .await
            .expect("search");
        assert_eq!(results.len(), 3);
    }
}
