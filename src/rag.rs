//! Question answering over one loaded page.
//!
//! ## Loading
//!
//! ```text
//! identifier ─fetch─> Document ─process─> Chunk[] ─embed─> vectors
//!                                                            │
//!                      collection "wiki_<title>" <─upsert────┘
//! ```
//!
//! Loading a page replaces any earlier copy of the same page, so ids never
//! collide with stale chunks. Only one page is current at a time.
//!
//! ## Answering
//!
//! The question is embedded and matched against the current collection. Hits
//! below the similarity floor are discarded. The survivors are laid out as
//! numbered, labelled passages:
//!
//! ```text
//! [1] Section: History
//! Rust began as a personal project...
//!
//! [2] Section: Introduction
//! Rust is a general-purpose programming language...
//! ```
//!
//! and the model's answer is followed by a list of the sections it drew on.

use parking_lot::RwLock;
use serde::Serialize;

use crate::{
    chunk_stats, collection_name, embed_chunks, Chunk, ChunkStats, CollectionInfo, Document, DocumentProcessor,
    Embedder, Error, GenerationOptions, LanguageModel, PageSource, Result, SearchHit, VectorIndex,
};

/// Answer returned when no stored chunk clears the similarity floor.
pub const NO_CONTEXT_ANSWER: &str = "No relevant context found.";

/// Retrieval and generation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RagOptions {
    /// Chunks retrieved per question.
    pub top_k: usize,
    /// Hits scoring below this are discarded.
    pub min_similarity: f32,
    /// Sampling options for the answer.
    pub generation: GenerationOptions,
}

impl Default for RagOptions {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_similarity: 0.0,
            generation: GenerationOptions::default(),
        }
    }
}

/// What [`RagService::load_document`] did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    /// Page title.
    pub title: String,
    /// Page URL.
    pub url: String,
    /// Words in the page.
    pub word_count: usize,
    /// Sections at every depth.
    pub section_count: usize,
    /// Chunks stored.
    pub chunk_count: usize,
    /// Collection the chunks went to.
    pub collection: String,
    /// Chunk statistics.
    pub stats: ChunkStats,
    /// The collection after loading.
    pub collection_info: CollectionInfo,
}

/// An answered question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    /// The question as asked.
    pub question: String,
    /// The answer, with a sources list when any context was used.
    pub answer: String,
    /// The context handed to the model; empty when nothing was retrieved.
    pub context: String,
    /// The retrieved chunks, best first.
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Clone)]
struct CurrentPage {
    title: String,
    collection: String,
}

/// Loads pages and answers questions about the current one.
///
/// Generic over its collaborators, so tests can run with in-memory fakes.
/// Boxed trait objects work too: every collaborator trait is implemented
/// for `Box<T>`.
pub struct RagService<S, E, I, L> {
    source: S,
    embedder: E,
    index: I,
    llm: L,
    processor: DocumentProcessor,
    options: RagOptions,
    current: RwLock<Option<CurrentPage>>,
}

impl<S, E, I, L> RagService<S, E, I, L>
where
    S: PageSource,
    E: Embedder,
    I: VectorIndex,
    L: LanguageModel,
{
    /// Wire up a service. No page is loaded yet.
    pub fn new(source: S, embedder: E, index: I, llm: L, processor: DocumentProcessor, options: RagOptions) -> Self {
        tracing::info!(
            top_k = options.top_k,
            min_similarity = options.min_similarity,
            strategy = %processor.config().strategy(),
            model = llm.model_name(),
            "initialized RAG service"
        );

        Self {
            source,
            embedder,
            index,
            llm,
            processor,
            options,
            current: RwLock::new(None),
        }
    }

    /// Retrieval options in use.
    pub fn options(&self) -> &RagOptions {
        &self.options
    }

    /// The vector index.
    pub fn index(&self) -> &I {
        &self.index
    }

    /// The language model.
    pub fn llm(&self) -> &L {
        &self.llm
    }

    /// Fetch a page and load it.
    ///
    /// # Errors
    ///
    /// Any [`PageSource::fetch`] error, then as [`RagService::load_document`].
    pub fn load_page(&self, identifier: &str) -> Result<LoadReport> {
        tracing::info!(identifier, "loading page");
        let document = self.source.fetch(identifier)?;
        self.load_document(&document)
    }

    /// Chunk, embed and store `document`, replacing any earlier copy, and
    /// make it the current page.
    ///
    /// The current page is only switched once everything is stored. If
    /// storing fails while reloading the current page, its old chunks may
    /// already be gone, so no page is current afterwards.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidDocument`] if the document yields no chunks
    /// - embedding and index errors from the collaborators
    pub fn load_document(&self, document: &Document) -> Result<LoadReport> {
        let chunks = self.processor.process(document);
        if chunks.is_empty() {
            return Err(Error::InvalidDocument(format!("{:?} produced no chunks", document.title)));
        }

        let embeddings = embed_chunks(&self.embedder, &chunks)?;
        let collection = collection_name(&document.title);

        if let Err(e) = self.replace_collection(&collection, &chunks, &embeddings) {
            let mut current = self.current.write();
            if current.as_ref().is_some_and(|page| page.collection == collection) {
                tracing::warn!(collection = %collection, error = %e, "reload failed, forgetting current page");
                *current = None;
            }
            return Err(e);
        }

        let report = LoadReport {
            title: document.title.clone(),
            url: document.url.clone(),
            word_count: document.word_count(),
            section_count: document.section_count(),
            chunk_count: chunks.len(),
            stats: chunk_stats(&chunks),
            collection_info: self.index.collection_info(&collection)?,
            collection: collection.clone(),
        };

        *self.current.write() = Some(CurrentPage {
            title: document.title.clone(),
            collection,
        });

        tracing::info!(
            title = %report.title,
            chunks = report.chunk_count,
            collection = %report.collection,
            "page loaded"
        );
        Ok(report)
    }

    fn replace_collection(&self, collection: &str, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if self.index.collection_exists(collection)? {
            tracing::info!(collection, "replacing existing collection");
            self.index.delete_collection(collection)?;
        }
        self.index.create_collection(collection)?;
        self.index.upsert(collection, chunks, embeddings)
    }

    /// Answer `question` with the configured `top_k` and similarity floor.
    ///
    /// # Errors
    ///
    /// As [`RagService::query_with`].
    pub fn query(&self, question: &str) -> Result<QueryResult> {
        self.query_with(question, self.options.top_k, self.options.min_similarity)
    }

    /// Answer `question` from the `k` best chunks scoring at least
    /// `min_similarity`.
    ///
    /// When nothing qualifies the answer is [`NO_CONTEXT_ANSWER`] and the
    /// language model is not called.
    ///
    /// # Errors
    ///
    /// - [`Error::NoPageLoaded`] if no page is current
    /// - embedding, index and language model errors from the collaborators
    pub fn query_with(&self, question: &str, k: usize, min_similarity: f32) -> Result<QueryResult> {
        let collection = self
            .current
            .read()
            .as_ref()
            .map(|page| page.collection.clone())
            .ok_or(Error::NoPageLoaded)?;

        tracing::info!(question, k, "answering question");

        let query = self.embedder.embed_one(question)?;
        let mut hits = self.index.search(&collection, &query, k)?;
        let retrieved = hits.len();
        hits.retain(|hit| hit.score >= min_similarity);

        tracing::debug!(retrieved, kept = hits.len(), min_similarity, "filtered hits");

        if hits.is_empty() {
            tracing::warn!(min_similarity, "no chunks above the similarity floor");
            return Ok(QueryResult {
                question: question.to_string(),
                answer: NO_CONTEXT_ANSWER.to_string(),
                context: String::new(),
                hits,
            });
        }

        let context = assemble_context(&hits);
        let answer = self
            .llm
            .generate_with_context(question, &context, &self.options.generation)?;

        Ok(QueryResult {
            question: question.to_string(),
            answer: format!("{answer}{}", citations(&hits)),
            context,
            hits,
        })
    }

    /// Title of the current page, if any.
    pub fn current_page(&self) -> Option<String> {
        self.current.read().as_ref().map(|page| page.title.clone())
    }

    /// Delete the current page's collection and forget it.
    ///
    /// # Errors
    ///
    /// Index errors from deleting the collection. The page is forgotten
    /// either way.
    pub fn clear_current_page(&self) -> Result<()> {
        let Some(page) = self.current.write().take() else {
            return Ok(());
        };

        tracing::info!(collection = %page.collection, "clearing current page");
        match self.index.delete_collection(&page.collection) {
            Ok(()) | Err(Error::CollectionNotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl<S, E, I, L> std::fmt::Debug for RagService<S, E, I, L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RagService")
            .field("processor", &self.processor)
            .field("options", &self.options)
            .field("current", &self.current.read().as_ref().map(|page| page.title.clone()))
            .finish_non_exhaustive()
    }
}

fn assemble_context(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("[{}] Section: {}\n{}\n", i + 1, hit.chunk.section_label(), hit.chunk.content()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn citations(hits: &[SearchHit]) -> String {
    let mut seen: Vec<&str> = Vec::new();
    let mut lines = Vec::new();

    for hit in hits {
        let section = hit.chunk.section_label();
        if !seen.contains(&section) {
            seen.push(section);
            lines.push(format!("- {section} ({})", hit.chunk.source_url()));
        }
    }

    if lines.is_empty() {
        String::new()
    } else {
        format!("\n\n**Sources:**\n{}", lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn hit(section: &str, content: &str, score: f32) -> SearchHit {
        let mut metadata = BTreeMap::new();
        metadata.insert("section".to_string(), section.to_string());
        metadata.insert("page_url".to_string(), "https://en.wikipedia.org/wiki/T".to_string());
        SearchHit {
            chunk: Chunk::from_stored("id", content, metadata),
            score,
        }
    }

    #[test]
    fn test_context_layout() {
        let hits = [hit("History", "Old times.", 0.9), hit("Introduction", "Lead.", 0.8)];
        assert_eq!(
            assemble_context(&hits),
            "[1] Section: History\nOld times.\n\n[2] Section: Introduction\nLead.\n"
        );
    }

    #[test]
    fn test_citations_distinct_in_order() {
        let hits = [hit("History", "a", 0.9), hit("Design", "b", 0.8), hit("History", "c", 0.7)];
        assert_eq!(
            citations(&hits),
            "\n\n**Sources:**\n- History (https://en.wikipedia.org/wiki/T)\n- Design (https://en.wikipedia.org/wiki/T)"
        );
        assert_eq!(citations(&[]), "");
    }
}
