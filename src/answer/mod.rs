//! Answer composition over retrieved passages.
//!
//! The composer tries a deterministic numeric shortcut first (known financial
//! ratios computed straight from retrieved QA text), then falls back to
//! assembling a bounded context and asking the chat collaborator. Problem
//! solving (text / image / PDF) and multiple-choice generation reuse the same
//! retrieval context.

use crate::index::CorpusIndex;
use crate::ingest::{ExtractError, PageExtractor, TesseractOcr};
use crate::openai::{ChatClient, EmbeddingClient, OpenAiError};
use crate::processing::{ChunkingError, truncate_to_tokens};
use crate::search::{SearchError, SearchResult, hybrid_search};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

/// Token budget applied to each retrieved passage before prompting.
const MAX_TEXT_TOKENS: usize = 2000;
/// Character budget for the combined context block.
const MAX_CONTEXT_CHARS: usize = 8000;
/// Encoding used for context trimming.
const TRIM_ENCODING: &str = "cl100k_base";
/// Ratio keyword recognized by the calculation shortcut.
const LIQUIDITY_RATIO_KEYWORD: &str = "유동비율";

/// Message returned when retrieval produced no usable context.
pub const NO_CONTEXT_MESSAGE: &str =
    "관련된 정보를 찾을 수 없습니다. 질문을 더 구체적으로 입력해 주세요.";
/// Message returned when OCR recognized nothing in an image.
pub const IMAGE_NOT_RECOGNIZED: &str = "이미지에서 문제를 인식하지 못했습니다.";
/// Message returned when a PDF contained no extractable text.
pub const PDF_NOT_RECOGNIZED: &str = "PDF에서 문제를 인식하지 못했습니다.";

const ANSWER_SYSTEM_PROMPT: &str =
    "당신은 스포츠경영관리사 전문가이며, 검색된 정보를 최우선으로 활용하여 답변해야 합니다.";
const SOLVER_SYSTEM_PROMPT: &str = "당신은 스포츠경영관리사 시험 문제를 푸는 전문가입니다.";
const MCQ_SYSTEM_PROMPT: &str = "당신은 스포츠경영관리사 시험 문제 출제 전문가입니다.";

/// Errors raised while composing an answer.
#[derive(Debug, Error)]
pub enum AnswerError {
    /// Context trimming failed to initialize its tokenizer.
    #[error("Failed to trim context: {0}")]
    Chunking(#[from] ChunkingError),
    /// Chat collaborator failed to produce a completion.
    #[error("Generation failed: {0}")]
    Provider(#[from] OpenAiError),
    /// Retrieval failed before composition could start.
    #[error("Search failed: {0}")]
    Search(#[from] SearchError),
    /// Extraction collaborator failed on user-supplied input.
    #[error("Extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

/// Shared retrieval/generation context handed to the composer operations.
///
/// Holds the read-only corpus index and the provider handles so the CLI and
/// tests can run every operation against one explicit object instead of
/// process-wide globals.
pub struct AnswerContext<'a> {
    /// Corpus index; `None` before any index was built or loaded.
    pub index: Option<&'a CorpusIndex>,
    /// Embedding provider used for query vectors.
    pub embedder: &'a dyn EmbeddingClient,
    /// Chat provider used for answer synthesis.
    pub chat: &'a dyn ChatClient,
    /// Cosine floor forwarded to retrieval.
    pub threshold: f32,
}

fn number_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+\.?\d*").expect("static regex"))
}

/// Pull every number out of a piece of QA text.
fn extract_numbers(text: &str) -> Vec<f64> {
    number_pattern()
        .find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Deterministic numeric shortcut over retrieved QA results.
///
/// A QA hit whose question names the liquidity ratio and carries at least two
/// numbers yields the computed ratio directly, skipping generation entirely.
pub fn execute_calculation(results: &[SearchResult]) -> Option<String> {
    for result in results {
        let SearchResult::Qa { question, .. } = result else {
            continue;
        };
        if !question.contains(LIQUIDITY_RATIO_KEYWORD) {
            continue;
        }
        let numbers = extract_numbers(question);
        if numbers.len() >= 2 && numbers[1] != 0.0 {
            let ratio = numbers[0] / numbers[1] * 100.0;
            return Some(format!("유동비율은 {ratio:.2}%입니다."));
        }
    }
    None
}

/// Compose the final answer for a query from its retrieval results.
///
/// Order of attempts: calculation shortcut, then context assembly plus a chat
/// completion, then the no-context fallback (which never calls the chat
/// collaborator).
pub async fn compose_answer(
    query: &str,
    results: &[SearchResult],
    chat: &dyn ChatClient,
) -> Result<String, AnswerError> {
    if let Some(calculated) = execute_calculation(results) {
        tracing::debug!(query, "Calculation shortcut answered the query");
        return Ok(calculated);
    }

    let mut qa_lines = Vec::new();
    let mut general_lines = Vec::new();
    for result in results {
        match result {
            SearchResult::Qa { question, answer } if !answer.is_empty() => {
                qa_lines.push(format!("문제: {question}\n정답: {answer}"));
            }
            SearchResult::Qa { .. } => {}
            SearchResult::Text { text } => {
                general_lines.push(truncate_to_tokens(text, MAX_TEXT_TOKENS, TRIM_ENCODING)?);
            }
        }
    }

    if qa_lines.is_empty() && general_lines.is_empty() {
        return Ok(NO_CONTEXT_MESSAGE.to_string());
    }

    qa_lines.extend(general_lines);
    let context: String = qa_lines.join("\n\n").chars().take(MAX_CONTEXT_CHARS).collect();

    let prompt = format!(
        "당신은 스포츠경영관리사 시험을 돕는 AI입니다.\n\
         사용자의 질문: \"{query}\"\n\n\
         역할: 스포츠경영관리사 시험 합격을 목표로 하는 수험생을 지원합니다. \
         신뢰할 수 있는 정보를 제공하며, 정확하고 논리적인 답변을 작성해야 합니다.\n\n\
         응답 가이드:\n\
         - 반드시 검색된 정보를 기반으로 답변하세요.\n\
         - 개념이 필요한 경우 설명을 보충하세요.\n\
         - 문장은 명확하고 실용적으로 작성해야 합니다.\n\
         - 답변할 수 없는 정보가 입력된다면 사실대로 답변할 수 없다고 대답해야 합니다.\n\n\
         참고 정보:\n{context}\n\n\
         답변:"
    );

    Ok(chat
        .generate(ANSWER_SYSTEM_PROMPT, &prompt, Some(500))
        .await?)
}

impl AnswerContext<'_> {
    /// Solve a problem supplied as free text: retrieve supporting passages and
    /// ask the chat collaborator for a worked solution.
    pub async fn solve_text_problem(&self, problem: &str) -> Result<String, AnswerError> {
        let results =
            hybrid_search(self.index, self.embedder, problem, 3, self.threshold).await?;
        let context = results
            .iter()
            .map(SearchResult::text)
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            "당신은 스포츠경영관리사 문제를 푸는 AI입니다.\n\n\
             문제: {problem}\n\n\
             참고 정보:\n{context}\n\n\
             풀이 및 정답:"
        );
        Ok(self.chat.generate(SOLVER_SYSTEM_PROMPT, &prompt, None).await?)
    }

    /// Solve a problem photographed in an image: OCR first, then solve.
    pub async fn solve_image_problem(
        &self,
        path: &Path,
        ocr: &TesseractOcr,
    ) -> Result<String, AnswerError> {
        let recognized = ocr.extract_text(path)?;
        if recognized.is_empty() {
            return Ok(IMAGE_NOT_RECOGNIZED.to_string());
        }
        tracing::info!(path = %path.display(), "OCR recognized a problem");
        self.solve_text_problem(&recognized).await
    }

    /// Solve problems contained in a user-supplied PDF.
    pub async fn solve_pdf_problem(
        &self,
        path: &Path,
        extractor: &dyn PageExtractor,
    ) -> Result<String, AnswerError> {
        let text = extractor.extract_text(path)?;
        if text.trim().is_empty() {
            return Ok(PDF_NOT_RECOGNIZED.to_string());
        }
        self.solve_text_problem(text.trim()).await
    }

    /// Collect similar indexed questions for a keyword.
    pub async fn find_similar_questions(&self, query: &str) -> Result<Vec<String>, AnswerError> {
        let results = hybrid_search(self.index, self.embedder, query, 5, self.threshold).await?;
        let questions: Vec<String> = results
            .into_iter()
            .filter_map(|result| match result {
                SearchResult::Qa { question, .. } => Some(question),
                SearchResult::Text { .. } => None,
            })
            .collect();
        if questions.is_empty() {
            Ok(vec!["유사한 문제가 없습니다.".to_string()])
        } else {
            Ok(questions)
        }
    }

    /// Generate one multiple-choice question for a keyword, grounded in the
    /// best retrieval hit and phrased to avoid repeating indexed questions.
    pub async fn generate_mcq(&self, keyword: &str) -> Result<String, AnswerError> {
        let reference = hybrid_search(self.index, self.embedder, keyword, 1, self.threshold)
            .await?
            .first()
            .map(|result| result.text().to_string())
            .unwrap_or_else(|| "관련된 정보를 찾을 수 없습니다.".to_string());
        let similar = self.find_similar_questions(keyword).await?.join("\n");

        let prompt = format!(
            "다음 참고 정보를 바탕으로 중급 이상 난이도의 객관식 문제를 1문항 생성하세요.\n\n\
             조건:\n\
             - 보기는 실제 시험에 나올 법한 헷갈리는 선지로 구성하세요.\n\
             - 기존 문제와 똑같은 문장을 반복하지 마세요.\n\
             - 선택지는 내용상 유사하게 보이지만, 정확히 알지 않으면 오답이 되도록 구성하세요.\n\n\
             참고 정보:\n{reference}\n\n\
             기존 유사 문제 (그대로 출제하지 마세요):\n{similar}\n\n\
             출력 형식 (고정):\n\
             질문: [문제 내용]\n\
             보기:\n1) ...\n2) ...\n3) ...\n4) ...\n\
             정답: [정답 번호]\n\
             해설: [정답에 대한 설명]"
        );
        Ok(self.chat.generate(MCQ_SYSTEM_PROMPT, &prompt, None).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Chat stub that records the prompt and echoes a canned reply.
    struct EchoChat;

    #[async_trait]
    impl ChatClient for EchoChat {
        async fn generate(
            &self,
            _system_prompt: &str,
            user_prompt: &str,
            _max_tokens: Option<u32>,
        ) -> Result<String, OpenAiError> {
            Ok(format!("echo:{}", user_prompt.len()))
        }
    }

    /// Chat stub that captures the user prompt it receives.
    struct RecordingChat {
        prompt: std::sync::Mutex<Option<String>>,
    }

    #[async_trait]
    impl ChatClient for RecordingChat {
        async fn generate(
            &self,
            _system_prompt: &str,
            user_prompt: &str,
            _max_tokens: Option<u32>,
        ) -> Result<String, OpenAiError> {
            *self.prompt.lock().unwrap() = Some(user_prompt.to_string());
            Ok("ok".to_string())
        }
    }

    /// Chat stub that fails the test if it is ever called.
    struct UnreachableChat;

    #[async_trait]
    impl ChatClient for UnreachableChat {
        async fn generate(
            &self,
            _system_prompt: &str,
            _user_prompt: &str,
            _max_tokens: Option<u32>,
        ) -> Result<String, OpenAiError> {
            panic!("generation collaborator must not be called");
        }
    }

    #[test]
    fn extract_numbers_reads_integers_and_decimals() {
        assert_eq!(
            extract_numbers("유동비율 계산: 100 50.5"),
            vec![100.0, 50.5]
        );
        assert!(extract_numbers("숫자가 없다").is_empty());
    }

    #[test]
    fn calculation_shortcut_computes_the_ratio() {
        let results = vec![SearchResult::Qa {
            question: "유동비율 계산: 150 50".to_string(),
            answer: "정답 300%".to_string(),
        }];
        assert_eq!(
            execute_calculation(&results),
            Some("유동비율은 300.00%입니다.".to_string())
        );
    }

    #[test]
    fn calculation_skips_results_without_the_keyword() {
        let results = vec![SearchResult::Qa {
            question: "1. 자기자본비율: 100 50".to_string(),
            answer: String::new(),
        }];
        assert_eq!(execute_calculation(&results), None);
    }

    #[test]
    fn calculation_skips_text_results_and_zero_denominators() {
        let results = vec![
            SearchResult::Text {
                text: "유동비율 100 50".to_string(),
            },
            SearchResult::Qa {
                question: "유동비율 100 0".to_string(),
                answer: String::new(),
            },
        ];
        assert_eq!(execute_calculation(&results), None);
    }

    #[tokio::test]
    async fn shortcut_answers_without_calling_the_chat_collaborator() {
        let results = vec![SearchResult::Qa {
            question: "유동비율 계산: 100 50".to_string(),
            answer: String::new(),
        }];
        let answer = compose_answer("유동비율을 계산해줘", &results, &UnreachableChat)
            .await
            .expect("shortcut");
        assert_eq!(answer, "유동비율은 200.00%입니다.");
    }

    #[tokio::test]
    async fn empty_results_return_the_fallback_without_generation() {
        let answer = compose_answer("아무거나", &[], &UnreachableChat)
            .await
            .expect("fallback");
        assert_eq!(answer, NO_CONTEXT_MESSAGE);
    }

    #[tokio::test]
    async fn answerless_qa_results_alone_still_fall_back() {
        let results = vec![SearchResult::Qa {
            question: "1. 정답이 수집되지 않은 문제".to_string(),
            answer: String::new(),
        }];
        let answer = compose_answer("질문", &results, &UnreachableChat)
            .await
            .expect("fallback");
        assert_eq!(answer, NO_CONTEXT_MESSAGE);
    }

    #[tokio::test]
    async fn combined_context_is_capped_at_the_character_budget() {
        // Four 3,000-char passages join to 12,006 context chars; only the
        // first MAX_CONTEXT_CHARS survive (7,996 'a's plus two separators).
        let results: Vec<SearchResult> = (0..4)
            .map(|_| SearchResult::Text {
                text: "a".repeat(3000),
            })
            .collect();
        let chat = RecordingChat {
            prompt: std::sync::Mutex::new(None),
        };
        compose_answer("아주 긴 질문", &results, &chat)
            .await
            .expect("composed");

        let prompt = chat.prompt.lock().unwrap().clone().expect("prompt captured");
        let kept = prompt.chars().filter(|&c| c == 'a').count();
        assert_eq!(kept, MAX_CONTEXT_CHARS - 4);
    }

    #[tokio::test]
    async fn usable_context_reaches_the_chat_collaborator() {
        let results = vec![
            SearchResult::Qa {
                question: "1. 스포츠 마케팅의 정의는".to_string(),
                answer: "정답 2".to_string(),
            },
            SearchResult::Text {
                text: "스포츠 마케팅은 관람과 참여를 촉진한다".to_string(),
            },
        ];
        let answer = compose_answer("스포츠 마케팅이란?", &results, &EchoChat)
            .await
            .expect("composed");
        assert!(answer.starts_with("echo:"));
    }
}
