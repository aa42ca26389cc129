//! Okapi BM25 term-frequency index over the corpus entries.
//!
//! Always derived from the in-memory entry sequence (never persisted), with the
//! usual Okapi parameterization: `k1 = 1.5`, `b = 0.75`, and negative IDF
//! values floored at `epsilon * average_idf` so very common terms still
//! contribute a small positive weight.

use std::collections::HashMap;

const K1: f64 = 1.5;
const B: f64 = 0.75;
const EPSILON: f64 = 0.25;

/// In-memory BM25 index, positionally aligned with the corpus entries.
#[derive(Debug, Clone)]
pub struct Bm25Index {
    term_freqs: Vec<HashMap<String, usize>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f64,
    idf: HashMap<String, f64>,
}

impl Bm25Index {
    /// Build the index over whitespace-tokenized documents.
    pub fn build<S: AsRef<str>>(documents: &[S]) -> Self {
        let mut term_freqs = Vec::with_capacity(documents.len());
        let mut doc_lens = Vec::with_capacity(documents.len());
        let mut doc_freqs: HashMap<String, usize> = HashMap::new();

        for document in documents {
            let mut freqs: HashMap<String, usize> = HashMap::new();
            let mut len = 0usize;
            for token in document.as_ref().split_whitespace() {
                *freqs.entry(token.to_string()).or_insert(0) += 1;
                len += 1;
            }
            for term in freqs.keys() {
                *doc_freqs.entry(term.clone()).or_insert(0) += 1;
            }
            term_freqs.push(freqs);
            doc_lens.push(len);
        }

        let doc_count = documents.len();
        let avg_doc_len = if doc_count == 0 {
            0.0
        } else {
            doc_lens.iter().sum::<usize>() as f64 / doc_count as f64
        };

        let idf = compute_idf(&doc_freqs, doc_count);

        Self {
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
        }
    }

    /// Number of indexed documents.
    pub fn len(&self) -> usize {
        self.term_freqs.len()
    }

    /// Whether the index holds no documents.
    pub fn is_empty(&self) -> bool {
        self.term_freqs.is_empty()
    }

    /// BM25 score of every document against the query tokens, by position.
    pub fn scores(&self, query_tokens: &[&str]) -> Vec<f64> {
        let mut scores = vec![0.0; self.len()];
        for token in query_tokens {
            let Some(&idf) = self.idf.get(*token) else {
                continue;
            };
            for (doc, freqs) in self.term_freqs.iter().enumerate() {
                let Some(&freq) = freqs.get(*token) else {
                    continue;
                };
                let freq = freq as f64;
                let len_norm = 1.0 - B + B * self.doc_lens[doc] as f64 / self.avg_doc_len;
                scores[doc] += idf * freq * (K1 + 1.0) / (freq + K1 * len_norm);
            }
        }
        scores
    }
}

/// Okapi IDF with a floor for terms appearing in most documents.
fn compute_idf(doc_freqs: &HashMap<String, usize>, doc_count: usize) -> HashMap<String, f64> {
    let mut idf = HashMap::with_capacity(doc_freqs.len());
    let mut idf_sum = 0.0;
    let mut negative_terms = Vec::new();

    for (term, &df) in doc_freqs {
        let value = ((doc_count as f64 - df as f64 + 0.5) / (df as f64 + 0.5)).ln();
        idf_sum += value;
        if value < 0.0 {
            negative_terms.push(term.clone());
        }
        idf.insert(term.clone(), value);
    }

    if !doc_freqs.is_empty() {
        let average_idf = idf_sum / doc_freqs.len() as f64;
        let floor = EPSILON * average_idf;
        for term in negative_terms {
            idf.insert(term, floor);
        }
    }

    idf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_align_with_document_positions() {
        let docs = ["유동비율 계산 문제", "스포츠 마케팅 전략", "유동비율 정의"];
        let index = Bm25Index::build(&docs);
        let scores = index.scores(&["유동비율"]);
        assert_eq!(scores.len(), 3);
        assert!(scores[0] > 0.0);
        assert!(scores[2] > 0.0);
        assert_eq!(scores[1], 0.0);
    }

    #[test]
    fn rarer_terms_score_higher() {
        let docs = ["공통 희귀", "공통 하나", "공통 둘", "공통 셋"];
        let index = Bm25Index::build(&docs);
        let rare = index.scores(&["희귀"]);
        let common = index.scores(&["공통"]);
        assert!(rare[0] > common[0]);
    }

    #[test]
    fn unknown_query_terms_are_ignored() {
        let index = Bm25Index::build(&["하나 둘 셋"]);
        let scores = index.scores(&["없는단어"]);
        assert_eq!(scores, vec![0.0]);
    }

    #[test]
    fn ubiquitous_terms_keep_a_small_positive_weight() {
        // One term in every document, the rest rare, so the average IDF is
        // positive and the floor applies.
        let docs = [
            "공통 경기장 관중", "공통 구단 수익", "공통 중계 권리",
            "공통 선수 계약", "공통 시설 운영", "공통 후원 유치",
        ];
        let index = Bm25Index::build(&docs);
        let scores = index.scores(&["공통"]);
        assert!(scores.iter().all(|&s| s > 0.0), "negative IDF must be floored");
    }

    #[test]
    fn empty_corpus_yields_no_scores() {
        let index = Bm25Index::build::<&str>(&[]);
        assert!(index.is_empty());
        assert!(index.scores(&["x"]).is_empty());
    }
}
