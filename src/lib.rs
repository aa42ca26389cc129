#![deny(missing_docs)]

//! Core library for the examrag study assistant.

/// Answer composition, problem solving, and MCQ generation.
pub mod answer;
/// Interactive command loop and startup flags.
pub mod cli;
/// Environment-driven configuration management.
pub mod config;
/// Dual corpus index: dense vectors, BM25, and persistence.
pub mod index;
/// PDF/OCR extraction collaborators and page parsing.
pub mod ingest;
/// JSONL interaction log.
pub mod interaction;
/// Structured logging and tracing setup.
pub mod logging;
/// OpenAI-compatible embedding and chat clients.
pub mod openai;
/// Text normalization and token-aware chunking.
pub mod processing;
/// Hybrid dense + lexical retrieval.
pub mod search;
