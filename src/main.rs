use clap::Parser;
use examrag::{
    cli, config,
    index::{CorpusIndex, persist},
    ingest::{self, PdftotextExtractor},
    logging,
    openai::OpenAiClient,
    processing,
};
use std::path::Path;

#[tokio::main]
async fn main() {
    let args = cli::Cli::parse();
    config::init_config();
    logging::init_tracing();

    let config = config::get_config();
    let data_dir = args.data_dir.as_deref().unwrap_or(&config.data_dir);
    let index_dir = args.index_dir.as_deref().unwrap_or(&config.index_dir);

    let client = OpenAiClient::new().expect("Failed to initialize OpenAI client");
    let corpus_index = prepare_index(&client, data_dir, index_dir, args.rebuild)
        .await
        .expect("Failed to build or load the corpus index");

    tracing::info!(entries = corpus_index.len(), "Index ready; awaiting input");
    cli::run_loop(
        Some(&corpus_index),
        &client,
        &client,
        config.search_score_threshold,
    )
    .await
    .expect("Interactive loop failed");
}

/// Load the persisted index when present, otherwise run the full pipeline:
/// ingest PDFs, chunk, embed, index, and persist.
async fn prepare_index(
    client: &OpenAiClient,
    data_dir: &Path,
    index_dir: &Path,
    rebuild: bool,
) -> anyhow::Result<CorpusIndex> {
    if !rebuild {
        if let Some(index) = persist::load(index_dir)? {
            println!("기존 인덱스를 재사용합니다. ({}개 항목)", index.len());
            return Ok(index);
        }
    }

    let config = config::get_config();

    println!("[1] PDF에서 문제, 정답, 일반 텍스트 추출 중...");
    let extracted = ingest::ingest_directory(data_dir, &PdftotextExtractor)?;
    ingest::dump_artifacts(&extracted, Path::new("output"))?;
    println!(
        "[1] 완료! (문제: {}개, 일반 텍스트: {}개)",
        extracted.items.len(),
        extracted.general_texts.len()
    );

    println!("[2] 청크 분할 중...");
    let counter = processing::build_token_counter(&config.embedding_model)?;
    let chunked = processing::chunk_corpus(
        &extracted.items,
        &extracted.general_texts,
        config.chunk_max_tokens,
        config.chunk_overlap,
        &counter,
    );
    println!(
        "[2] 완료! (문제 청크: {}개, 일반 텍스트 청크: {}개)",
        chunked.qa_pairs.len(),
        chunked.general_chunks.len()
    );

    println!("[3] 인덱스 생성 중...");
    let index = CorpusIndex::build(&chunked, client, config.embedding_dimension).await?;
    persist::save(&index, index_dir)?;
    println!("[3] 완료!");

    Ok(index)
}
