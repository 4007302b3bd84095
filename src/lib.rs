//! # wikirag
//!
//! Wikipedia article chunking for retrieval-augmented generation (RAG).
//!
//! ## The Problem
//!
//! A Wikipedia article is too long to hand to a language model whole, and
//! too structured to cut blindly. The lead paragraph answers "what is X?",
//! "History" answers "when?", a two-word "See also" heading answers nothing.
//! Good chunks follow that structure, carry their section label, and can be
//! re-created with the same ids the next time the page is indexed.
//!
//! ## Pipeline
//!
//! ```text
//! Document ──> walk ──────────────> passages ──> assemble ──> Chunk[0..n]
//!   summary      clean + split        (text,        id, tokens,
//!   sections     (pre-order,           section)     metadata
//!     subsections  50-char filter)
//! ```
//!
//! 1. [`clean`] strips wiki markup: templates, links, citation markers.
//! 2. [`RecursiveSplitter`] cuts text on the coarsest separator that fits:
//!    paragraphs, then lines, sentences, words, graphemes.
//! 3. [`walk`] visits the summary and then every section in reading order.
//! 4. [`assemble`] turns each passage into a [`Chunk`] with a stable id.
//!
//! [`DocumentProcessor`] runs the whole thing for a [`ChunkingConfig`].
//!
//! ## Strategies
//!
//! | Strategy | What gets split | Section labels |
//! |----------|-----------------|----------------|
//! | `section-aware` (default) | summary, then each section | yes |
//! | `fixed-window` | the full raw text | no |
//! | `hybrid` | same as `section-aware` | yes |
//!
//! ## Quick Start
//!
//! ```rust
//! use wikirag::{chunk_stats, ChunkingConfig, Document, DocumentProcessor, Section, Strategy};
//!
//! let doc = Document::new(
//!     "Rust (programming language)",
//!     "https://en.wikipedia.org/wiki/Rust_(programming_language)",
//!     "Rust is a general-purpose programming language.",
//!     "Rust is a general-purpose programming language.",
//! )?
//! .with_sections(vec![Section::new(
//!     "History",
//!     1,
//!     "Rust began as a personal project in 2006 and was later sponsored by Mozilla.",
//! )?]);
//!
//! let config = ChunkingConfig::new(800, 150, Strategy::SectionAware)?;
//! let chunks = DocumentProcessor::new(config).process(&doc);
//!
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[1].section(), Some("History"));
//! assert_eq!(chunk_stats(&chunks).total_chunks, 2);
//! # Ok::<(), wikirag::Error>(())
//! ```
//!
//! ## Question Answering
//!
//! The chunks feed a [`RagService`], which is generic over four seams:
//!
//! | Trait | Built-in implementation |
//! |-------|-------------------------|
//! | [`PageSource`] | `WikipediaClient` (`http` feature) |
//! | [`Embedder`] | `HttpEmbedder` (`http`), `FastEmbedder` (`fastembed`) |
//! | [`VectorIndex`] | [`MemoryIndex`] |
//! | [`LanguageModel`] | `OpenAiCompatClient` (`http`) |
//!
//! Collaborators are blocking and bounded by a request timeout; the chunking
//! core does no I/O at all.

mod chunk;
mod clean;
mod config;
mod document;
mod embed;
mod error;
mod index;
mod llm;
mod process;
mod rag;
mod split;
mod walk;
mod wiki;

pub use chunk::{assemble, chunk_id, estimate_tokens, Chunk, INTRODUCTION};
pub use clean::clean;
pub use config::{load_dotenv, ChunkingConfig, Settings, Strategy, CHARS_PER_TOKEN};
pub use document::{Document, Section, MAX_SECTION_LEVEL};
pub use embed::{embed_chunks, Embedder};
pub use error::{Error, Result};
pub use index::{collection_name, CollectionInfo, MemoryIndex, SearchHit, VectorIndex};
pub use llm::{fold_system_messages, rag_prompt, GenerationOptions, LanguageModel, Message, Role, DEFAULT_SYSTEM_PROMPT};
pub use process::{chunk_stats, process_document, ChunkStats, DocumentProcessor};
pub use rag::{LoadReport, QueryResult, RagOptions, RagService, NO_CONTEXT_ANSWER};
pub use split::{split, RecursiveSplitter, DEFAULT_SEPARATORS};
pub use walk::{walk, Passage, MIN_SECTION_SEGMENT_CHARS};
pub use wiki::{parse_extract, title_from_identifier, PageSource};

#[cfg(feature = "http")]
pub use embed::HttpEmbedder;
#[cfg(feature = "fastembed")]
pub use embed::FastEmbedder;
#[cfg(feature = "http")]
pub use llm::OpenAiCompatClient;
#[cfg(feature = "http")]
pub use wiki::WikipediaClient;

/// A text splitting strategy.
///
/// The section walker is written against this trait, so any splitter can
/// stand in for [`RecursiveSplitter`]:
///
/// ```rust
/// use wikirag::{Splitter, RecursiveSplitter};
///
/// fn count(splitter: &dyn Splitter, text: &str) -> usize {
///     splitter.split(text).len()
/// }
///
/// let splitter = RecursiveSplitter::new(100, 20);
/// assert_eq!(count(&splitter, "Hello world. This is a test."), 1);
/// ```
pub trait Splitter: Send + Sync {
    /// Split text into trimmed, non-empty segments, in order.
    fn split(&self, text: &str) -> Vec<String>;

    /// Estimate the number of segments for a given text length.
    ///
    /// Useful for pre-allocation. May be approximate.
    fn estimate_segments(&self, text_len: usize) -> usize {
        // Conservative default
        (text_len / 500).max(1)
    }
}
