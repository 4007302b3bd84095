//! End-to-end tests for the question-answering service, with in-memory
//! collaborators.

mod common;

use common::{sample_page, FakeLlm, FakeSource, FlakyIndex, HashingEmbedder};
use wikirag::{
    collection_name, ChunkingConfig, DocumentProcessor, Embedder, Error, LanguageModel, MemoryIndex, PageSource,
    RagOptions, RagService, Role, Strategy, VectorIndex, NO_CONTEXT_ANSWER,
};

type Service = RagService<FakeSource, HashingEmbedder, MemoryIndex, FakeLlm>;

fn service_with(llm: FakeLlm) -> Service {
    RagService::new(
        FakeSource::with([sample_page()]),
        HashingEmbedder::new(64),
        MemoryIndex::new(),
        llm,
        DocumentProcessor::new(ChunkingConfig::default()),
        RagOptions::default(),
    )
}

fn service() -> Service {
    service_with(FakeLlm::default())
}

#[test]
fn load_reports_what_was_stored() {
    let service = service();
    let report = service.load_document(&sample_page()).unwrap();

    // Summary, History, Version 3, Design philosophy; "See also" is too short.
    assert_eq!(report.chunk_count, 4);
    assert_eq!(report.section_count, 4);
    assert_eq!(report.collection, "wiki_python_programming_language");
    assert_eq!(report.collection_info.count, 4);
    assert_eq!(report.collection_info.dimensions, Some(64));
    assert_eq!(report.stats.total_chunks, 4);
    assert!(report.word_count > 0);
    assert_eq!(service.current_page().as_deref(), Some("Python (programming language)"));
}

#[test]
fn reloading_replaces_the_collection() {
    let service = service();
    service.load_document(&sample_page()).unwrap();

    // A shorter copy of the same page must not leave stale chunks behind.
    let mut shorter = sample_page();
    shorter.sections.truncate(1);
    let report = service.load_document(&shorter).unwrap();

    assert_eq!(report.chunk_count, 3);
    assert_eq!(report.collection_info.count, 3);
}

#[test]
fn load_page_by_url() {
    let service = service();
    let report = service
        .load_page("https://en.wikipedia.org/wiki/Python_(programming_language)")
        .unwrap();
    assert_eq!(report.title, "Python (programming language)");

    assert!(matches!(service.load_page("Nonexistent page"), Err(Error::PageNotFound(_))));
    assert!(matches!(service.load_page("https://example.org/x"), Err(Error::InvalidIdentifier(_))));
    // A failed load keeps the previous page current.
    assert_eq!(service.current_page().as_deref(), Some("Python (programming language)"));
}

#[test]
fn query_requires_a_page() {
    let service = service();
    assert!(matches!(service.query("When?"), Err(Error::NoPageLoaded)));
    assert_eq!(service.llm().calls(), 0);
}

#[test]
fn query_answers_with_context_and_sources() {
    let service = service();
    service.load_document(&sample_page()).unwrap();

    let result = service.query("When was the first release of the language?").unwrap();

    assert_eq!(result.hits.len(), 4);
    assert!(result.hits.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(result.context.starts_with("[1] Section: "));
    assert!(result.context.contains("[4] Section: "));
    assert!(result.answer.starts_with("Python first appeared in 1991."));
    assert!(result.answer.contains("\n\n**Sources:**\n- "));
    assert!(result
        .answer
        .contains("(https://en.wikipedia.org/wiki/Python_(programming_language))"));

    // Sources are listed once per section.
    assert_eq!(result.answer.matches("- History (").count(), 1);

    // System prompt is sent separately; folding is the backend's job.
    let messages = service.llm().last_messages();
    assert_eq!(messages[0].role, Role::System);
    assert!(messages[1].content.contains(&result.context));
    assert!(messages[1].content.ends_with("Question: When was the first release of the language?\n\nAnswer:"));
}

#[test]
fn query_respects_k() {
    let service = service();
    service.load_document(&sample_page()).unwrap();

    let result = service.query_with("indentation readability", 2, 0.0).unwrap();
    assert_eq!(result.hits.len(), 2);
    assert_eq!(result.context.matches("Section: ").count(), 2);
}

#[test]
fn query_below_floor_skips_the_model() {
    let service = service();
    service.load_document(&sample_page()).unwrap();

    // Scores never exceed 1.
    let result = service.query_with("anything", 5, 1.5).unwrap();
    assert_eq!(result.answer, NO_CONTEXT_ANSWER);
    assert!(result.hits.is_empty());
    assert!(result.context.is_empty());
    assert_eq!(service.llm().calls(), 0);
}

#[test]
fn model_errors_propagate() {
    let service = service_with(FakeLlm::failing());
    service.load_document(&sample_page()).unwrap();

    assert!(matches!(service.query("When?"), Err(Error::LlmUnavailable(_))));
    assert_eq!(service.llm().calls(), 1);
}

#[test]
fn clear_current_page_drops_the_collection() {
    let service = service();
    service.load_document(&sample_page()).unwrap();
    let collection = collection_name("Python (programming language)");
    assert!(service.index().collection_exists(&collection).unwrap());

    service.clear_current_page().unwrap();

    assert_eq!(service.current_page(), None);
    assert!(!service.index().collection_exists(&collection).unwrap());
    assert!(matches!(service.query("When?"), Err(Error::NoPageLoaded)));

    // Clearing twice is harmless.
    service.clear_current_page().unwrap();
}

#[test]
fn fixed_window_pages_cite_the_introduction() {
    let service = RagService::new(
        FakeSource::default(),
        HashingEmbedder::new(32),
        MemoryIndex::new(),
        FakeLlm::default(),
        DocumentProcessor::new(ChunkingConfig::new(800, 150, Strategy::FixedWindow).unwrap()),
        RagOptions::default(),
    );
    service.load_document(&sample_page()).unwrap();

    let result = service.query("Python").unwrap();
    assert!(result.context.starts_with("[1] Section: Introduction\n"));
    assert!(result.answer.ends_with("- Introduction (https://en.wikipedia.org/wiki/Python_(programming_language))"));
}

#[test]
fn failed_reload_forgets_the_page() {
    let service = RagService::new(
        FakeSource::default(),
        HashingEmbedder::new(32),
        FlakyIndex::default(),
        FakeLlm::default(),
        DocumentProcessor::new(ChunkingConfig::default()),
        RagOptions::default(),
    );
    service.load_document(&sample_page()).unwrap();

    service.index().fail_upserts(true);
    assert!(matches!(service.load_document(&sample_page()), Err(Error::Storage(_))));

    // The old chunks were dropped before the write failed.
    assert_eq!(service.current_page(), None);
    assert!(matches!(service.query("When?"), Err(Error::NoPageLoaded)));

    service.index().fail_upserts(false);
    service.load_document(&sample_page()).unwrap();
    assert_eq!(service.query("When?").unwrap().hits.len(), 4);
}

#[test]
fn failed_load_of_another_page_keeps_the_current_one() {
    let service = RagService::new(
        FakeSource::default(),
        HashingEmbedder::new(32),
        FlakyIndex::default(),
        FakeLlm::default(),
        DocumentProcessor::new(ChunkingConfig::default()),
        RagOptions::default(),
    );
    service.load_document(&sample_page()).unwrap();

    let mut other = sample_page();
    other.title = "Ruby (programming language)".into();
    service.index().fail_upserts(true);
    assert!(service.load_document(&other).is_err());

    assert_eq!(service.current_page().as_deref(), Some("Python (programming language)"));
}

#[test]
fn boxed_collaborators() {
    let service = RagService::new(
        Box::new(FakeSource::with([sample_page()])) as Box<dyn PageSource>,
        Box::new(HashingEmbedder::new(32)) as Box<dyn Embedder>,
        Box::new(MemoryIndex::new()) as Box<dyn VectorIndex>,
        Box::new(FakeLlm::default()) as Box<dyn LanguageModel>,
        DocumentProcessor::new(ChunkingConfig::default()),
        RagOptions::default(),
    );

    let report = service.load_page("Python (programming language)").unwrap();
    assert_eq!(report.chunk_count, 4);
    assert_eq!(service.llm().model_name(), "fake");

    let result = service.query("When was the first release?").unwrap();
    assert!(result.answer.starts_with("Python first appeared in 1991."));
}
