//! Text pipeline: normalization, token-aware chunking, and ingestion types.

pub mod chunking;
pub mod normalize;
pub mod types;

pub use chunking::{build_token_counter, chunk_corpus, chunk_text, truncate_to_tokens};
pub use normalize::clean_text;
pub use types::{ChunkedCorpus, ChunkingError, PageContent, QaChunkPair, QaItem};
