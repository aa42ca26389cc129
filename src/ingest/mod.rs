//! Corpus ingestion: scan the data directory, extract PDF pages, and parse
//! them into questions, answers, and general texts.

pub mod extract;
pub mod parse;

pub use extract::{ExtractError, PageExtractor, PdftotextExtractor, TesseractOcr};
pub use parse::parse_page;

use crate::processing::{PageContent, QaItem};
use std::path::Path;
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised during the one-time ingestion pass.
#[derive(Debug, Error)]
pub enum IngestError {
    /// An extraction collaborator failed on a source PDF.
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),
    /// Filesystem interaction failed while scanning or dumping artifacts.
    #[error("ingestion IO failed: {0}")]
    Io(#[from] std::io::Error),
    /// Parsed questions/answers could not be serialized.
    #[error("failed to serialize ingestion artifacts: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything an ingestion run extracted from the source documents.
#[derive(Debug, Default)]
pub struct IngestOutput {
    /// Question/answer items, in document-then-page order.
    pub items: Vec<QaItem>,
    /// General page texts from pages without a QA pattern.
    pub general_texts: Vec<String>,
}

/// Extract and parse every PDF under `data_dir`.
///
/// An empty or missing directory is not an error: the pipeline degrades to a
/// placeholder index downstream. Files are visited in sorted order so corpus
/// positions are reproducible across runs.
pub fn ingest_directory(
    data_dir: &Path,
    extractor: &dyn PageExtractor,
) -> Result<IngestOutput, IngestError> {
    let mut pdf_paths: Vec<_> = WalkDir::new(data_dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdf_paths.sort();

    if pdf_paths.is_empty() {
        tracing::warn!(dir = %data_dir.display(), "No PDF files found");
        return Ok(IngestOutput::default());
    }

    let mut output = IngestOutput::default();
    for path in &pdf_paths {
        tracing::info!(file = %path.display(), "Reading PDF");
        let pages = extractor.extract_pages(path)?;
        for page in &pages {
            match parse_page(page) {
                PageContent::Qa(items) => output.items.extend(items),
                PageContent::Passage(text) => output.general_texts.push(text),
            }
        }
    }

    tracing::info!(
        files = pdf_paths.len(),
        questions = output.items.len(),
        general_texts = output.general_texts.len(),
        "Ingestion complete"
    );
    Ok(output)
}

/// Dump the parsed questions and answers as inspectable JSON under `out_dir`.
pub fn dump_artifacts(output: &IngestOutput, out_dir: &Path) -> Result<(), IngestError> {
    std::fs::create_dir_all(out_dir)?;
    let questions: Vec<&str> = output
        .items
        .iter()
        .map(|item| item.question.as_str())
        .collect();
    let answers: Vec<&str> = output
        .items
        .iter()
        .map(|item| item.answer.as_str())
        .collect();
    std::fs::write(
        out_dir.join("questions.json"),
        serde_json::to_vec_pretty(&questions)?,
    )?;
    std::fs::write(
        out_dir.join("answers.json"),
        serde_json::to_vec_pretty(&answers)?,
    )?;
    Ok(())
}
