//! External text-extraction collaborators.
//!
//! PDF text comes from the `pdftotext` system binary (poppler) and image OCR
//! from the `tesseract` binary. Both are treated as opaque capabilities: raw
//! file in, recognized text out, with an empty string meaning "nothing
//! recognized". Pages arrive as the form-feed-separated segments `pdftotext`
//! emits.

use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Errors raised while invoking an extraction collaborator.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The extraction binary could not be spawned.
    #[error("failed to run {tool}: {source} (is it installed?)")]
    Spawn {
        /// Binary we attempted to execute.
        tool: &'static str,
        /// Underlying process error.
        #[source]
        source: std::io::Error,
    },
    /// The extraction binary exited with a failure status.
    #[error("{tool} failed: {detail}")]
    Failed {
        /// Binary that reported the failure.
        tool: &'static str,
        /// Stderr captured from the failing run.
        detail: String,
    },
}

/// Capability boundary for per-page PDF text extraction.
pub trait PageExtractor: Send + Sync {
    /// Extract one string per page of the PDF at `path`.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractError>;

    /// Extract the PDF's full text as a single string.
    fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        Ok(self.extract_pages(path)?.join("\n"))
    }
}

/// PDF extraction backed by the `pdftotext` system binary.
pub struct PdftotextExtractor;

impl PageExtractor for PdftotextExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>, ExtractError> {
        let output = Command::new("pdftotext")
            .arg(path)
            .arg("-")
            .output()
            .map_err(|source| ExtractError::Spawn {
                tool: "pdftotext",
                source,
            })?;

        if !output.status.success() {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(path = %path.display(), detail, "pdftotext failed");
            return Err(ExtractError::Failed {
                tool: "pdftotext",
                detail,
            });
        }

        let text = String::from_utf8_lossy(&output.stdout).into_owned();
        // pdftotext separates pages with form feeds; a trailing one is normal.
        let pages: Vec<String> = text
            .split('\u{c}')
            .map(str::to_string)
            .filter(|page| !page.trim().is_empty())
            .collect();
        tracing::debug!(path = %path.display(), pages = pages.len(), "Extracted PDF pages");
        Ok(pages)
    }
}

/// OCR extraction backed by the `tesseract` system binary.
pub struct TesseractOcr;

impl TesseractOcr {
    /// Recognize text in the image at `path`.
    ///
    /// An empty string means nothing was recognized.
    pub fn extract_text(&self, path: &Path) -> Result<String, ExtractError> {
        let output = Command::new("tesseract")
            .arg(path)
            .arg("stdout")
            .args(["-l", "kor+eng"])
            .output()
            .map_err(|source| ExtractError::Spawn {
                tool: "tesseract",
                source,
            })?;

        if !output.status.success() {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::warn!(path = %path.display(), detail, "tesseract failed");
            return Err(ExtractError::Failed {
                tool: "tesseract",
                detail,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
