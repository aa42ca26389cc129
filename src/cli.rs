//! Interactive command loop.
//!
//! The loop accepts `exit`, `solve` (text / image path / PDF path sub-modes),
//! `generate` (keyword to multiple-choice item), and treats anything else as a
//! free-text query answered by hybrid search plus generation. Errors inside a
//! single query are caught here, logged with their latency, and surfaced as a
//! user-visible message; the loop always continues.

use crate::answer::{AnswerContext, compose_answer};
use crate::index::CorpusIndex;
use crate::ingest::{PdftotextExtractor, TesseractOcr};
use crate::interaction::{INTERACTION_LOG, log_interaction};
use crate::openai::{ChatClient, EmbeddingClient};
use crate::search::{SearchResult, hybrid_search};
use clap::Parser;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Command-line flags accepted at startup.
#[derive(Debug, Parser)]
#[command(name = "examrag", about = "Retrieval-augmented exam study assistant")]
pub struct Cli {
    /// Override the directory scanned for source PDFs.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Override the directory holding the persisted index.
    #[arg(long)]
    pub index_dir: Option<PathBuf>,
    /// Rebuild the index even when persisted artifacts exist.
    #[arg(long)]
    pub rebuild: bool,
}

/// Number of passages retrieved for a free-text query.
const QUERY_TOP_K: usize = 3;

/// Run the interactive loop until `exit` or end of input.
pub async fn run_loop(
    index: Option<&CorpusIndex>,
    embedder: &dyn EmbeddingClient,
    chat: &dyn ChatClient,
    threshold: f32,
) -> std::io::Result<()> {
    let context = AnswerContext {
        index,
        embedder,
        chat,
        threshold,
    };
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        println!();
        println!("검색할 질문을 입력하거나, 'solve'로 문제를 풀고 'generate'로 객관식 문제를 생성합니다. (종료: 'exit')");
        let Some(input) = prompt_line(&mut lines, "입력: ")? else {
            break;
        };

        match input.to_lowercase().as_str() {
            "" => continue,
            "exit" => {
                println!("프로그램을 종료합니다.");
                break;
            }
            "solve" => run_solve(&context, &mut lines).await?,
            "generate" => run_generate(&context, &mut lines).await?,
            _ => run_query(&context, &input).await,
        }
    }

    Ok(())
}

fn prompt_line(
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
    prompt: &str,
) -> std::io::Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?.trim().to_string())),
        None => Ok(None),
    }
}

async fn run_solve(
    context: &AnswerContext<'_>,
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
) -> std::io::Result<()> {
    println!();
    println!("문제 풀이 방식을 선택하세요:");
    println!("1. 텍스트 입력");
    println!("2. 이미지 파일 업로드");
    println!("3. PDF 파일 업로드");
    let Some(choice) = prompt_line(lines, "선택 (1, 2, 3): ")? else {
        return Ok(());
    };

    let outcome = match choice.as_str() {
        "1" => {
            let Some(problem) = prompt_line(lines, "문제를 입력하세요: ")? else {
                return Ok(());
            };
            context.solve_text_problem(&problem).await
        }
        "2" => {
            let Some(path) = prompt_line(lines, "이미지 파일 경로를 입력하세요: ")? else {
                return Ok(());
            };
            if !Path::new(&path).exists() {
                println!("파일을 찾을 수 없습니다.");
                return Ok(());
            }
            context.solve_image_problem(Path::new(&path), &TesseractOcr).await
        }
        "3" => {
            let Some(path) = prompt_line(lines, "PDF 파일 경로를 입력하세요: ")? else {
                return Ok(());
            };
            if !Path::new(&path).exists() {
                println!("파일을 찾을 수 없습니다.");
                return Ok(());
            }
            context
                .solve_pdf_problem(Path::new(&path), &PdftotextExtractor)
                .await
        }
        _ => {
            println!("올바른 선택이 아닙니다.");
            return Ok(());
        }
    };

    match outcome {
        Ok(solution) => {
            println!();
            println!("RAG 답변:");
            println!("{solution}");
        }
        Err(error) => {
            tracing::error!(error = %error, "Problem solving failed");
            println!("문제 풀이 중 오류가 발생했습니다: {error}");
        }
    }
    Ok(())
}

async fn run_generate(
    context: &AnswerContext<'_>,
    lines: &mut impl Iterator<Item = std::io::Result<String>>,
) -> std::io::Result<()> {
    println!();
    println!("객관식 문제 생성 모드입니다.");
    let Some(keyword) = prompt_line(lines, "생성할 문제의 키워드를 입력하세요: ")? else {
        return Ok(());
    };

    let mcq = match context.generate_mcq(&keyword).await {
        Ok(mcq) => mcq,
        Err(error) => {
            tracing::error!(error = %error, "MCQ generation failed");
            println!("문제 생성 중 오류가 발생했습니다: {error}");
            return Ok(());
        }
    };

    // Show the question and choices first; hold back answer and explanation.
    let all_lines: Vec<&str> = mcq.lines().collect();
    let split_at = all_lines.len().min(6);
    println!();
    println!("생성된 객관식 문제:");
    println!("{}", all_lines[..split_at].join("\n"));

    let _ = prompt_line(lines, "\n정답을 입력하세요 (1~4): ")?;

    println!();
    println!("정답 및 해설:");
    println!("{}", all_lines[split_at..].join("\n"));
    Ok(())
}

async fn run_query(context: &AnswerContext<'_>, query: &str) {
    let started = Instant::now();
    tracing::info!(query, "Running hybrid search");

    let results = match hybrid_search(
        context.index,
        context.embedder,
        query,
        QUERY_TOP_K,
        context.threshold,
    )
    .await
    {
        Ok(results) => results,
        Err(error) => {
            let elapsed = started.elapsed();
            tracing::error!(error = %error, elapsed_ms = elapsed.as_millis() as u64, "Search failed");
            println!("오류 발생: {error}");
            log_interaction(
                Path::new(INTERACTION_LOG),
                query,
                0,
                "오류 발생",
                elapsed,
                Some(&error.to_string()),
            );
            return;
        }
    };

    println!();
    println!("검색된 결과:");
    for result in &results {
        match result {
            SearchResult::Qa { question, answer } => {
                println!("문제: {question}");
                println!("정답: {answer}");
                println!();
            }
            SearchResult::Text { text } => {
                println!("일반 텍스트: {text}");
                println!();
            }
        }
    }

    let response = if results.is_empty() {
        Ok("관련된 정보를 찾을 수 없습니다.".to_string())
    } else {
        compose_answer(query, &results, context.chat).await
    };

    let elapsed = started.elapsed();
    match response {
        Ok(answer) => {
            println!("RAG 답변:");
            println!("{answer}");
            log_interaction(
                Path::new(INTERACTION_LOG),
                query,
                results.len(),
                &answer,
                elapsed,
                None,
            );
        }
        Err(error) => {
            tracing::error!(error = %error, elapsed_ms = elapsed.as_millis() as u64, "Answer composition failed");
            println!("오류 발생: {error}");
            log_interaction(
                Path::new(INTERACTION_LOG),
                query,
                results.len(),
                "오류 발생",
                elapsed,
                Some(&error.to_string()),
            );
        }
    }
}
