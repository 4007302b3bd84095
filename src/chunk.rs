//! The Chunk type and its assembly.
//!
//! A chunk is the unit the vector index stores and retrieves. It carries its
//! source by value (title and URL, not a reference to the [`Document`]) so
//! chunks can outlive the document they were cut from.
//!
//! ## Stable Ids
//!
//! Re-indexing the same page must overwrite, not duplicate. Ids are derived
//! from the page title and the chunk position only:
//!
//! ```text
//! hex(sha256(title))[..8]  = "hhhhhhhh"
//! position 7               = "0007"
//! id                       = "hhhhhhhh_0007"
//! ```
//!
//! ## Metadata
//!
//! Vector stores typically accept flat string maps. Every chunk carries:
//!
//! | key | value |
//! |-----|-------|
//! | `page_title` | source title |
//! | `page_url` | source URL |
//! | `section` | section label, `"Introduction"` when absent |
//! | `language` | language code |
//! | `chunk_index` | position, as a string |

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::CHARS_PER_TOKEN;
use crate::Document;

/// Section label used for the summary and for chunks without a section.
pub const INTRODUCTION: &str = "Introduction";

/// A chunk of document text with its position and source metadata.
///
/// Fields are read-only: a chunk is created once per processing run and
/// never modified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    id: String,
    content: String,
    position: usize,
    section: Option<String>,
    token_count: usize,
    source_title: String,
    source_url: String,
    metadata: BTreeMap<String, String>,
}

impl Chunk {
    /// Stable identifier, unique within its document.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The chunk text.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Zero-based position in the document's chunk sequence.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Section the chunk came from, if any.
    #[must_use]
    pub fn section(&self) -> Option<&str> {
        self.section.as_deref()
    }

    /// Section label with the `"Introduction"` default applied.
    #[must_use]
    pub fn section_label(&self) -> &str {
        self.section().unwrap_or(INTRODUCTION)
    }

    /// Approximate token count (chars / 4).
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.token_count
    }

    /// Title of the source page.
    #[must_use]
    pub fn source_title(&self) -> &str {
        &self.source_title
    }

    /// URL of the source page.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Flat string metadata for the index.
    #[must_use]
    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// Length of the content in chars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.content.chars().count()
    }

    /// Whether the content is empty. Assembled chunks never are.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Rebuild a chunk from what an index stored: id, content and metadata.
    ///
    /// Position, section and source fields are read back from the metadata
    /// keys written by [`assemble`]; the token count is recomputed. A stored
    /// `section` of [`INTRODUCTION`] reads back as no section, the way
    /// [`assemble`] wrote it.
    #[must_use]
    pub fn from_stored(
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: BTreeMap<String, String>,
    ) -> Self {
        let content = content.into();
        let field = |key: &str| metadata.get(key).cloned().unwrap_or_default();

        Self {
            id: id.into(),
            token_count: estimate_tokens(&content),
            position: metadata
                .get("chunk_index")
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            section: metadata
                .get("section")
                .filter(|label| label.as_str() != INTRODUCTION)
                .cloned(),
            source_title: field("page_title"),
            source_url: field("page_url"),
            content,
            metadata,
        }
    }
}

impl std::fmt::Display for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunk {{ id: {}, position: {}, section: {}, len: {} }}",
            self.id,
            self.position,
            self.section_label(),
            self.len()
        )
    }
}

/// Build a chunk for `content` cut from `document` at `position`.
///
/// ```rust
/// use wikirag::{assemble, Document};
///
/// let doc = Document::new("Test Page", "https://example.org/Test", "", "Some text.")?;
/// let chunk = assemble("Some text that made it through.", &doc, Some("History"), 3);
///
/// assert_eq!(chunk.position(), 3);
/// assert!(chunk.id().ends_with("_0003"));
/// assert_eq!(chunk.metadata()["section"], "History");
/// assert_eq!(chunk.token_count(), 31 / 4);
/// # Ok::<(), wikirag::Error>(())
/// ```
///
/// # Panics
///
/// Panics if `content` is empty after trimming. Callers filter empty text
/// before assembling; reaching this is a bug in the caller.
#[must_use]
pub fn assemble(content: &str, document: &Document, section: Option<&str>, position: usize) -> Chunk {
    assert!(
        !content.trim().is_empty(),
        "chunk content must not be empty (document {:?}, position {position})",
        document.title
    );

    let mut metadata = BTreeMap::new();
    metadata.insert("page_title".to_string(), document.title.clone());
    metadata.insert("page_url".to_string(), document.url.clone());
    metadata.insert("section".to_string(), section.unwrap_or(INTRODUCTION).to_string());
    metadata.insert("language".to_string(), document.language.clone());
    metadata.insert("chunk_index".to_string(), position.to_string());

    Chunk {
        id: chunk_id(&document.title, position),
        content: content.to_string(),
        position,
        section: section.map(str::to_string),
        token_count: estimate_tokens(content),
        source_title: document.title.clone(),
        source_url: document.url.clone(),
        metadata,
    }
}

/// Deterministic chunk id: 8 hex digits of SHA-256(title), `_`, 4-digit position.
#[must_use]
pub fn chunk_id(title: &str, position: usize) -> String {
    let digest = Sha256::digest(title.as_bytes());
    let prefix = hex::encode(&digest[..4]);
    format!("{prefix}_{position:04}")
}

/// Token estimate for `text`: chars / 4, rounded down.
#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}
