//! Ask a Question About an Article
//!
//! Fetches a Wikipedia page, indexes it in memory, and answers a question
//! with an OpenAI-compatible server (LM Studio by default) for both
//! embeddings and generation.
//!
//! ```bash
//! cargo run --example ask_article --features http -- \
//!     "https://en.wikipedia.org/wiki/Rust_(programming_language)" \
//!     "Who designed Rust?"
//! ```
//!
//! Settings come from the environment or a `.env` file (`LMSTUDIO_BASE_URL`,
//! `LMSTUDIO_MODEL`, `EMBEDDING_MODEL`, `CHUNK_SIZE`, `LOG_LEVEL`, ...).

use tracing_subscriber::EnvFilter;
use wikirag::{
    load_dotenv, DocumentProcessor, HttpEmbedder, LanguageModel, MemoryIndex, OpenAiCompatClient, RagService, Settings,
    WikipediaClient,
};

// all-MiniLM-L6-v2
const EMBEDDING_DIMENSIONS: usize = 384;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();
    let settings = Settings::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level)))
        .init();
    settings.log_summary();

    let mut args = std::env::args().skip(1);
    let page = args
        .next()
        .unwrap_or_else(|| "https://en.wikipedia.org/wiki/Rust_(programming_language)".to_string());
    let question = args.next().unwrap_or_else(|| "Who designed Rust?".to_string());

    let source = WikipediaClient::new(&settings.wikipedia_language, &settings.user_agent, settings.request_timeout)?;
    let embedder = HttpEmbedder::new(
        &settings.llm_base_url,
        settings.embedding_model.clone(),
        EMBEDDING_DIMENSIONS,
        settings.request_timeout,
    )?;
    let llm = OpenAiCompatClient::new(&settings.llm_base_url, &settings.llm_model, settings.request_timeout)?;

    if !llm.is_available() {
        tracing::warn!(url = %settings.llm_base_url, "LLM server not reachable; is it running with a model loaded?");
    }

    let service = RagService::new(
        source,
        embedder,
        MemoryIndex::new(),
        llm,
        DocumentProcessor::new(settings.chunking()?),
        settings.rag_options(),
    );

    let report = service.load_page(&page)?;
    println!(
        "Loaded {} ({} sections, {} chunks, avg {} chars)",
        report.title, report.section_count, report.chunk_count, report.stats.avg_chunk_size
    );

    let result = service.query(&question)?;
    println!("\nQ: {}\n\n{}", result.question, result.answer);
    for hit in &result.hits {
        println!("  {:.3}  {}", hit.score, hit.chunk);
    }

    Ok(())
}
