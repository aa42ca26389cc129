//! Per-page question/answer parsing.
//!
//! Exam PDFs interleave numbered questions with answer lines. A question line
//! starts with an optional "문제" marker and a number (`1.` / `1)`); an answer
//! line starts with "정답", "답", or a bare "A". Everything else continues the
//! open question. A page where at least one question/answer pair closed
//! contributes QA items; any other page contributes its whole stripped text as
//! one general passage, never both.

use crate::processing::{PageContent, QaItem};
use regex::Regex;
use std::sync::OnceLock;

fn answer_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(정답|답|A)\b").expect("static regex"))
}

fn question_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(문제\s*)?\d+[.)]\s+").expect("static regex"))
}

/// Parse one page of extracted text into QA items or a general passage.
pub fn parse_page(text: &str) -> PageContent {
    let mut items: Vec<QaItem> = Vec::new();
    let mut current_question = String::new();
    let mut page_has_qa = false;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if answer_line().is_match(line) {
            if !current_question.is_empty() {
                items.push(QaItem {
                    question: std::mem::take(&mut current_question),
                    answer: line.to_string(),
                });
                page_has_qa = true;
            }
        } else if question_line().is_match(line) {
            if !current_question.is_empty() {
                // Previous question never saw an answer line.
                items.push(QaItem {
                    question: std::mem::take(&mut current_question),
                    answer: String::new(),
                });
            }
            current_question = line.to_string();
        } else if !current_question.is_empty() {
            current_question.push(' ');
            current_question.push_str(line);
        }
    }

    if page_has_qa {
        if !current_question.is_empty() {
            items.push(QaItem {
                question: current_question,
                answer: String::new(),
            });
        }
        PageContent::Qa(items)
    } else {
        PageContent::Passage(text.trim().to_string())
    }
}
