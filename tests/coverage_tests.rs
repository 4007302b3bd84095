//! Scenario tests for the chunking pipeline.
//!
//! These pin down concrete behavior: the introduction path, the fragment
//! filter, collection naming, statistics and configuration failures.

use std::thread;

use wikirag::{
    chunk_stats, collection_name, parse_extract, process_document, split, ChunkStats, ChunkingConfig, Document,
    DocumentProcessor, Error, RecursiveSplitter, Section, Settings, Strategy,
};

// =============================================================================
// Introduction and fragments
// =============================================================================

#[test]
fn short_summary_is_one_introduction_chunk() {
    let doc = Document::new("T", "u", "Intro sentence one. Intro sentence two.", "Intro sentence one.").unwrap();
    let chunks = DocumentProcessor::new(ChunkingConfig::default()).process(&doc);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].position(), 0);
    assert_eq!(chunks[0].section(), Some("Introduction"));
    assert_eq!(chunks[0].content(), "Intro sentence one. Intro sentence two.");
}

#[test]
fn too_short_section_emits_nothing() {
    let doc = Document::new("T", "u", "", "raw")
        .unwrap()
        .with_sections(vec![Section::new("Stub", 1, "Too short.").unwrap()]);
    let chunks = DocumentProcessor::new(ChunkingConfig::default()).process(&doc);
    assert!(chunks.is_empty());
}

#[test]
fn markup_is_cleaned_before_chunking() {
    let doc = Document::new(
        "T",
        "u",
        "The [[Python (language)|language]] was released{{citation needed}}.[12]",
        "raw",
    )
    .unwrap();
    let chunks = DocumentProcessor::new(ChunkingConfig::default()).process(&doc);
    assert_eq!(chunks[0].content(), "The language was released.");
}

#[test]
fn empty_document_parts_are_skipped() {
    let doc = Document::new("T", "u", "   ", "raw")
        .unwrap()
        .with_sections(vec![Section::new("Empty", 1, "").unwrap()]);

    for strategy in [Strategy::SectionAware, Strategy::Hybrid] {
        let config = ChunkingConfig::new(800, 150, strategy).unwrap();
        assert!(DocumentProcessor::new(config).process(&doc).is_empty());
    }
}

#[test]
fn long_section_splits_with_overlap() {
    let sentence = "Sentence about the history of the subject, with some detail. ";
    let doc = Document::new("T", "u", "", "raw")
        .unwrap()
        .with_sections(vec![Section::new("History", 1, sentence.repeat(40)).unwrap()]);

    let config = ChunkingConfig::new(100, 25, Strategy::SectionAware).unwrap();
    let chunks = DocumentProcessor::new(config).process(&doc);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.len() <= 400);
        assert_eq!(chunk.section(), Some("History"));
    }
    // Consecutive chunks share a trailing sentence.
    let tail = chunks[0].content().rsplit(". ").next().unwrap();
    assert!(chunks[1].content().contains(tail));
}

// =============================================================================
// Parsed pages
// =============================================================================

#[test]
fn parsed_extract_chunks_in_reading_order() {
    let body = |topic: &str| format!("{topic} is covered here in enough words to pass the fragment filter.");
    let extract = format!(
        "Lead paragraph of the page.\n\n== History ==\n{}\n\n=== Origins ===\n{}\n\n== Design ==\n{}\n\n== See also ==\nX",
        body("History"),
        body("Origins"),
        body("Design"),
    );
    let doc = parse_extract("Page", "https://en.wikipedia.org/wiki/Page", "en", &extract).unwrap();
    let chunks = process_document(&doc, 800, 150).unwrap();

    let labels: Vec<&str> = chunks.iter().map(|c| c.section_label()).collect();
    assert_eq!(labels, ["Introduction", "History", "Origins", "Design"]);
}

// =============================================================================
// Naming and statistics
// =============================================================================

#[test]
fn collection_name_example() {
    assert_eq!(
        collection_name("Python (programming language)"),
        "wiki_python_programming_language"
    );
}

#[test]
fn stats_over_nothing() {
    assert_eq!(
        chunk_stats(&[]),
        ChunkStats {
            total_chunks: 0,
            avg_chunk_size: 0,
            min_chunk_size: 0,
            max_chunk_size: 0,
            total_tokens: 0,
            avg_tokens_per_chunk: 0,
        }
    );
}

#[test]
fn stats_serialize_with_stable_keys() {
    let json = serde_json::to_value(ChunkStats::default()).unwrap();
    for key in [
        "total_chunks",
        "avg_chunk_size",
        "min_chunk_size",
        "max_chunk_size",
        "total_tokens",
        "avg_tokens_per_chunk",
    ] {
        assert_eq!(json[key], 0, "{key}");
    }
}

// =============================================================================
// Configuration failures
// =============================================================================

#[test]
#[should_panic(expected = "overlap_chars")]
fn splitter_rejects_overlap_at_budget() {
    let _ = split("anything", 10, 10);
}

#[test]
#[should_panic(expected = "overlap_chars")]
fn splitter_rejects_overlap_over_budget() {
    let _ = RecursiveSplitter::new(10, 50);
}

#[test]
fn config_rejects_overlap_at_size() {
    assert!(matches!(
        process_document(&Document::new("T", "u", "s", "r").unwrap(), 400, 400),
        Err(Error::OverlapExceedsSize { size: 400, overlap: 400 })
    ));
}

#[test]
fn settings_reject_bad_values() {
    let bad = |key: &'static str, value: &'static str| {
        Settings::from_lookup(move |k| (k == key).then(|| value.to_string()))
    };

    assert!(matches!(bad("CHUNK_SIZE", "lots"), Err(Error::Config(_))));
    assert!(matches!(bad("CHUNK_OVERLAP", "900"), Err(Error::InvalidOverlap(900))));
    assert!(matches!(bad("CHUNKING_STRATEGY", "magic"), Err(Error::UnknownStrategy(_))));
    assert!(matches!(bad("TOP_K_RESULTS", "0"), Err(Error::Config(_))));
    assert!(bad("CHUNK_SIZE", "").is_ok());
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn processor_is_shareable_across_threads() {
    let processor = DocumentProcessor::new(ChunkingConfig::new(100, 20, Strategy::SectionAware).unwrap());
    let docs: Vec<Document> = (0..4)
        .map(|i| {
            Document::new(format!("Page {i}"), "u", "Lead sentence for the page.", "raw")
                .unwrap()
                .with_sections(vec![Section::new(
                    "Body",
                    1,
                    "A body paragraph with enough words to be kept after filtering. ".repeat(20),
                )
                .unwrap()])
        })
        .collect();

    let expected: Vec<_> = docs.iter().map(|d| processor.process(d)).collect();

    let processor = &processor;
    let results: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = docs.iter().map(|d| s.spawn(move || processor.process(d))).collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(results, expected);
}
