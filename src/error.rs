//! Error types for wikirag.
//!
//! Chunking itself only fails on configuration; the remaining variants belong
//! to the collaborators (page source, embedder, index, language model) so a
//! caller can tell an unreachable LLM from a missing page.

/// Errors that can occur while chunking, indexing or answering.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Chunk size outside the supported range.
    #[error("invalid chunk size: {0} (must be within 100..=2000)")]
    InvalidChunkSize(usize),

    /// Overlap outside the supported range.
    #[error("invalid chunk overlap: {0} (must be within 0..=500)")]
    InvalidOverlap(usize),

    /// Overlap is not smaller than the chunk size.
    #[error("overlap {overlap} must be less than chunk size {size}")]
    OverlapExceedsSize {
        /// The chunk size.
        size: usize,
        /// The overlap that reached or exceeded the size.
        overlap: usize,
    },

    /// Strategy name that no strategy answers to.
    #[error("unknown chunking strategy: {0:?}")]
    UnknownStrategy(String),

    /// Document failed validation.
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    /// Section failed validation.
    #[error("invalid section: {0}")]
    InvalidSection(String),

    /// Page identifier is neither a title nor a wiki URL.
    #[error("invalid page identifier: {0}")]
    InvalidIdentifier(String),

    /// The requested page does not exist.
    #[error("page not found: {0}")]
    PageNotFound(String),

    /// Fetching the page failed in transit.
    #[error("network error: {0}")]
    Network(String),

    /// Embedding model error.
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Embedder returned a different number of vectors than texts.
    #[error("embedder returned {embeddings} vectors for {texts} texts")]
    EmbeddingCountMismatch {
        /// Number of texts sent.
        texts: usize,
        /// Number of vectors received.
        embeddings: usize,
    },

    /// Vector dimension does not match the collection.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the collection.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },

    /// Collection does not exist in the index.
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    /// Index rejected a write or could not be reached.
    #[error("storage error: {0}")]
    Storage(String),

    /// Language model server cannot be reached.
    #[error("language model unavailable: {0}")]
    LlmUnavailable(String),

    /// Language model server does not serve the requested model.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Language model failed to produce an answer.
    #[error("generation failed: {0}")]
    Generation(String),

    /// A question was asked before any page was loaded.
    #[error("no page loaded; load a page before querying")]
    NoPageLoaded,

    /// Settings could not be read.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for wikirag operations.
pub type Result<T> = std::result::Result<T, Error>;
