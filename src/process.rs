//! Strategy selection: from a [`Document`] to an ordered chunk sequence.
//!
//! | Strategy | Input | Section labels |
//! |----------|-------|----------------|
//! | section-aware | summary + section tree | per section |
//! | fixed-window | full raw text | none ("Introduction" in metadata) |
//! | hybrid | same as section-aware | per section |
//!
//! Positions are assigned after the strategy has produced its passages, so
//! they always run `0..n` without gaps whatever was filtered on the way.

use serde::Serialize;

use crate::{assemble, clean, walk, Chunk, ChunkingConfig, Document, RecursiveSplitter, Result, Splitter, Strategy};

/// Turns documents into chunks according to a [`ChunkingConfig`].
///
/// Holds no per-document state; share one processor across threads.
///
/// ```rust
/// use wikirag::{ChunkingConfig, Document, DocumentProcessor};
///
/// let processor = DocumentProcessor::new(ChunkingConfig::default());
/// let doc = Document::new("T", "u", "Intro sentence one. Intro sentence two.", "raw text")?;
///
/// let chunks = processor.process(&doc);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].position(), 0);
/// assert_eq!(chunks[0].section(), Some("Introduction"));
/// # Ok::<(), wikirag::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct DocumentProcessor {
    config: ChunkingConfig,
    splitter: RecursiveSplitter,
}

impl DocumentProcessor {
    /// Create a processor. The config is already validated.
    #[must_use]
    pub fn new(config: ChunkingConfig) -> Self {
        let splitter = RecursiveSplitter::new(config.max_chars(), config.overlap_chars());

        tracing::info!(
            chunk_size = config.chunk_size(),
            chunk_overlap = config.chunk_overlap(),
            strategy = %config.strategy(),
            "initialized document processor"
        );

        Self { config, splitter }
    }

    /// The config this processor was built with.
    #[must_use]
    pub fn config(&self) -> &ChunkingConfig {
        &self.config
    }

    /// Cut `document` into chunks, positions `0..n`.
    pub fn process(&self, document: &Document) -> Vec<Chunk> {
        let chunks = match self.config.strategy() {
            // Hybrid has no logic of its own yet.
            Strategy::SectionAware | Strategy::Hybrid => self.chunk_by_sections(document),
            Strategy::FixedWindow => self.chunk_fixed(document),
        };

        let stats = chunk_stats(&chunks);
        tracing::info!(
            title = %document.title,
            strategy = %self.config.strategy(),
            chunks = stats.total_chunks,
            avg_chars = stats.avg_chunk_size,
            "processed document"
        );

        chunks
    }

    fn chunk_by_sections(&self, document: &Document) -> Vec<Chunk> {
        walk(document, &self.splitter)
            .into_iter()
            .enumerate()
            .map(|(position, passage)| assemble(&passage.text, document, passage.section.as_deref(), position))
            .collect()
    }

    fn chunk_fixed(&self, document: &Document) -> Vec<Chunk> {
        let text = clean(&document.raw_content);

        self.splitter
            .split(&text)
            .into_iter()
            .enumerate()
            .map(|(position, segment)| assemble(&segment, document, None, position))
            .collect()
    }
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new(ChunkingConfig::default())
    }
}

/// Process `document` with the section-aware strategy.
///
/// # Errors
///
/// Returns the [`ChunkingConfig::new`] errors for invalid sizes.
pub fn process_document(document: &Document, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<Chunk>> {
    let config = ChunkingConfig::new(chunk_size, chunk_overlap, Strategy::SectionAware)?;
    Ok(DocumentProcessor::new(config).process(document))
}

/// Summary statistics over a chunk sequence. Sizes are in chars.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChunkStats {
    /// Number of chunks.
    pub total_chunks: usize,
    /// Mean chunk length, rounded down.
    pub avg_chunk_size: usize,
    /// Shortest chunk length.
    pub min_chunk_size: usize,
    /// Longest chunk length.
    pub max_chunk_size: usize,
    /// Sum of token estimates.
    pub total_tokens: usize,
    /// Mean token estimate, rounded down.
    pub avg_tokens_per_chunk: usize,
}

/// Compute [`ChunkStats`]; an empty slice gives all zeros.
#[must_use]
pub fn chunk_stats(chunks: &[Chunk]) -> ChunkStats {
    if chunks.is_empty() {
        return ChunkStats::default();
    }

    let sizes: Vec<usize> = chunks.iter().map(Chunk::len).collect();
    let total_chars: usize = sizes.iter().sum();
    let total_tokens: usize = chunks.iter().map(Chunk::token_count).sum();

    ChunkStats {
        total_chunks: chunks.len(),
        avg_chunk_size: total_chars / chunks.len(),
        min_chunk_size: sizes.iter().copied().min().unwrap_or(0),
        max_chunk_size: sizes.iter().copied().max().unwrap_or(0),
        total_tokens,
        avg_tokens_per_chunk: total_tokens / chunks.len(),
    }
}
