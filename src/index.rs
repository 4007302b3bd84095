//! Vector index collaborator.
//!
//! The index stores `(id, content, embedding, metadata)` per chunk and answers
//! nearest-neighbor queries. Each page gets its own collection, named from
//! its title, so loading the same page twice lands in the same place:
//!
//! ```text
//! "Python (programming language)" -> "wiki_python_programming_language"
//! ```
//!
//! [`MemoryIndex`] keeps everything in process. It ranks by Euclidean
//! distance and reports `1 / (1 + distance)` as the similarity, so scores
//! fall in `(0, 1]` with 1 meaning identical vectors. Other backends are free
//! to translate their own metric differently.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use serde::Serialize;

use crate::{Chunk, Error, Result};

/// Collection name for a page title.
///
/// Lower-cased, spaces become `_`, everything that is not alphanumeric or
/// `_` is dropped, and the result is prefixed with `wiki_`.
///
/// ```rust
/// assert_eq!(
///     wikirag::collection_name("Python (programming language)"),
///     "wiki_python_programming_language"
/// );
/// ```
#[must_use]
pub fn collection_name(title: &str) -> String {
    let sanitized: String = title
        .to_lowercase()
        .replace(' ', "_")
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    format!("wiki_{sanitized}")
}

/// A stored chunk returned by a query, with its similarity score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// The chunk as the index stored it.
    pub chunk: Chunk,
    /// Similarity to the query; higher is closer.
    pub score: f32,
}

/// Summary of a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionInfo {
    /// Collection name.
    pub name: String,
    /// Number of stored chunks.
    pub count: usize,
    /// Vector dimension, once the first vector is stored.
    pub dimensions: Option<usize>,
    /// Free-form collection metadata.
    pub metadata: BTreeMap<String, String>,
}

/// Storage and nearest-neighbor search over chunk embeddings.
///
/// Methods take `&self`; implementations synchronize internally so one index
/// can serve several callers.
pub trait VectorIndex: Send + Sync {
    /// Create an empty collection. Creating an existing one is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend refuses.
    fn create_collection(&self, name: &str) -> Result<()>;

    /// Delete a collection and everything in it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionNotFound`] if there is no such collection.
    fn delete_collection(&self, name: &str) -> Result<()>;

    /// Whether a collection exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] if the backend cannot be asked.
    fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Store chunks with their embeddings, replacing entries with the same id.
    /// Creates the collection if needed.
    ///
    /// # Errors
    ///
    /// - [`Error::EmbeddingCountMismatch`] if the slices differ in length
    /// - [`Error::DimensionMismatch`] if a vector does not fit the collection
    fn upsert(&self, name: &str, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()>;

    /// The `k` stored chunks closest to `query`, best first.
    ///
    /// # Errors
    ///
    /// - [`Error::CollectionNotFound`] if there is no such collection
    /// - [`Error::DimensionMismatch`] if `query` does not fit the collection
    fn search(&self, name: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Describe a collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionNotFound`] if there is no such collection.
    fn collection_info(&self, name: &str) -> Result<CollectionInfo>;

    /// Remove every entry but keep the collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CollectionNotFound`] if there is no such collection.
    fn clear_collection(&self, name: &str) -> Result<()>;
}

impl<T: VectorIndex + ?Sized> VectorIndex for Box<T> {
    fn create_collection(&self, name: &str) -> Result<()> {
        (**self).create_collection(name)
    }

    fn delete_collection(&self, name: &str) -> Result<()> {
        (**self).delete_collection(name)
    }

    fn collection_exists(&self, name: &str) -> Result<bool> {
        (**self).collection_exists(name)
    }

    fn upsert(&self, name: &str, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        (**self).upsert(name, chunks, embeddings)
    }

    fn search(&self, name: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        (**self).search(name, query, k)
    }

    fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        (**self).collection_info(name)
    }

    fn clear_collection(&self, name: &str) -> Result<()> {
        (**self).clear_collection(name)
    }
}

#[derive(Debug, Default)]
struct Collection {
    dimensions: Option<usize>,
    entries: Vec<Entry>,
    positions: HashMap<String, usize>,
    metadata: BTreeMap<String, String>,
}

#[derive(Debug)]
struct Entry {
    chunk: Chunk,
    embedding: Vec<f32>,
}

impl Collection {
    fn new() -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("created_by".to_string(), env!("CARGO_PKG_NAME").to_string());
        Self {
            metadata,
            ..Self::default()
        }
    }

    fn check_dimensions(&self, actual: usize) -> Result<()> {
        match self.dimensions {
            Some(expected) if expected != actual => Err(Error::DimensionMismatch { expected, actual }),
            _ => Ok(()),
        }
    }
}

/// In-process [`VectorIndex`] with exact L2 search.
///
/// ```rust
/// use wikirag::{assemble, Document, MemoryIndex, VectorIndex};
///
/// let doc = Document::new("Page", "https://example.org/Page", "", "text")?;
/// let chunks = vec![
///     assemble("about cats", &doc, None, 0),
///     assemble("about dogs", &doc, None, 1),
/// ];
///
/// let index = MemoryIndex::new();
/// index.upsert("wiki_page", &chunks, &[vec![1.0, 0.0], vec![0.0, 1.0]])?;
///
/// let hits = index.search("wiki_page", &[0.9, 0.1], 1)?;
/// assert_eq!(hits[0].chunk.content(), "about cats");
/// # Ok::<(), wikirag::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct MemoryIndex {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for MemoryIndex {
    fn create_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write();
        if collections.contains_key(name) {
            tracing::warn!(collection = name, "collection already exists");
        } else {
            collections.insert(name.to_string(), Collection::new());
            tracing::info!(collection = name, "created collection");
        }
        Ok(())
    }

    fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections
            .write()
            .remove(name)
            .map(|_| tracing::info!(collection = name, "deleted collection"))
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))
    }

    fn collection_exists(&self, name: &str) -> Result<bool> {
        Ok(self.collections.read().contains_key(name))
    }

    fn upsert(&self, name: &str, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != embeddings.len() {
            return Err(Error::EmbeddingCountMismatch {
                texts: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        if chunks.is_empty() {
            tracing::warn!(collection = name, "no chunks to store");
            return Ok(());
        }

        let mut collections = self.collections.write();
        let collection = collections.entry(name.to_string()).or_insert_with(Collection::new);

        // Validate everything before touching the collection.
        let dimensions = collection.dimensions.unwrap_or(embeddings[0].len());
        for embedding in embeddings {
            if embedding.len() != dimensions {
                return Err(Error::DimensionMismatch {
                    expected: dimensions,
                    actual: embedding.len(),
                });
            }
        }
        collection.dimensions = Some(dimensions);

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            let entry = Entry {
                chunk: chunk.clone(),
                embedding: embedding.clone(),
            };
            match collection.positions.get(chunk.id()) {
                Some(&slot) => collection.entries[slot] = entry,
                None => {
                    collection.positions.insert(chunk.id().to_string(), collection.entries.len());
                    collection.entries.push(entry);
                }
            }
        }

        tracing::info!(collection = name, stored = chunks.len(), total = collection.entries.len(), "stored chunks");
        Ok(())
    }

    fn search(&self, name: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let collections = self.collections.read();
        let collection = collections
            .get(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;
        collection.check_dimensions(query.len())?;

        let mut scored: Vec<(f32, &Entry)> = collection
            .entries
            .iter()
            .map(|entry| (l2_distance(query, &entry.embedding), entry))
            .collect();
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));

        let hits: Vec<SearchHit> = scored
            .into_iter()
            .take(k)
            .map(|(distance, entry)| SearchHit {
                chunk: entry.chunk.clone(),
                score: 1.0 / (1.0 + distance),
            })
            .collect();

        tracing::debug!(collection = name, k, found = hits.len(), "searched collection");
        Ok(hits)
    }

    fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        let collections = self.collections.read();
        let collection = collections
            .get(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;

        Ok(CollectionInfo {
            name: name.to_string(),
            count: collection.entries.len(),
            dimensions: collection.dimensions,
            metadata: collection.metadata.clone(),
        })
    }

    fn clear_collection(&self, name: &str) -> Result<()> {
        let mut collections = self.collections.write();
        let collection = collections
            .get_mut(name)
            .ok_or_else(|| Error::CollectionNotFound(name.to_string()))?;

        collection.entries.clear();
        collection.positions.clear();
        collection.dimensions = None;
        tracing::info!(collection = name, "cleared collection");
        Ok(())
    }
}

fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}
