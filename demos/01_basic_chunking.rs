//! Basic Article Chunking
//!
//! The minimal example: parse a page extract and chunk it for embedding.
//!
//! ```bash
//! cargo run --example 01_basic_chunking
//! ```

use wikirag::{chunk_stats, parse_extract, ChunkingConfig, DocumentProcessor, Strategy};

const EXTRACT: &str = "\
Machine learning is a field of study concerned with algorithms that learn from data.[1]

== History ==
The term was coined in 1959 by Arthur Samuel, an IBM employee and pioneer in computer gaming. \
Early work focused on pattern recognition and [[Perceptron|perceptrons]].

=== Neural networks ===
Deep learning extends neural networks with multiple hidden layers. \
Each layer learns increasingly abstract representations of its input.

== See also ==
Statistics.";

fn main() -> Result<(), wikirag::Error> {
    let doc = parse_extract(
        "Machine learning",
        "https://en.wikipedia.org/wiki/Machine_learning",
        "en",
        EXTRACT,
    )?;

    println!("Document: {} ({} sections, {} words)", doc.title, doc.section_count(), doc.word_count());

    for strategy in [Strategy::SectionAware, Strategy::FixedWindow] {
        let config = ChunkingConfig::new(100, 20, strategy)?;
        let chunks = DocumentProcessor::new(config).process(&doc);
        let stats = chunk_stats(&chunks);

        println!("\n{strategy}: {} chunks, avg {} chars", stats.total_chunks, stats.avg_chunk_size);
        for chunk in &chunks {
            println!("  [{}] {:<20} {:>4} chars  {}", chunk.id(), chunk.section_label(), chunk.len(), preview(chunk.content()));
        }
    }

    // "See also" is a stub: too short to index, so it never becomes a chunk.
    Ok(())
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(48).collect();
    if head.len() < text.len() {
        format!("{head}...")
    } else {
        head
    }
}
