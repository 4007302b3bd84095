//! Source documents: a page with a summary and a tree of sections.
//!
//! Sections are a plain recursive value type. A parent owns its children and
//! there are no back-pointers, so a `Document` can be cloned, sent across
//! threads, or dropped once its chunks exist.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Deepest heading level a section can have.
pub const MAX_SECTION_LEVEL: u8 = 6;

/// A section of a document, with its nested subsections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Heading text.
    pub title: String,
    /// Heading depth, `1..=6`.
    pub level: u8,
    /// Body text directly under the heading (not including subsections).
    pub content: String,
    /// Child sections in document order.
    #[serde(default)]
    pub subsections: Vec<Section>,
}

impl Section {
    /// Create a section without subsections.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSection`] if `level` is outside `1..=6`.
    pub fn new(title: impl Into<String>, level: u8, content: impl Into<String>) -> Result<Self> {
        let title = title.into();
        if !(1..=MAX_SECTION_LEVEL).contains(&level) {
            return Err(Error::InvalidSection(format!(
                "{title:?} has level {level}, expected 1..={MAX_SECTION_LEVEL}"
            )));
        }

        Ok(Self {
            title,
            level,
            content: content.into(),
            subsections: Vec::new(),
        })
    }

    /// Attach child sections.
    #[must_use]
    pub fn with_subsections(mut self, subsections: Vec<Section>) -> Self {
        self.subsections = subsections;
        self
    }

    /// Number of sections in this subtree, this one included.
    #[must_use]
    pub fn count(&self) -> usize {
        1 + self.subsections.iter().map(Section::count).sum::<usize>()
    }
}

/// A fetched page, ready for chunking.
///
/// ```rust
/// use wikirag::{Document, Section};
///
/// let doc = Document::new(
///     "Rust (programming language)",
///     "https://en.wikipedia.org/wiki/Rust_(programming_language)",
///     "Rust is a general-purpose programming language.",
///     "Rust is a general-purpose programming language. It emphasizes safety.",
/// )?
/// .with_sections(vec![Section::new("History", 1, "Rust began as a side project.")?]);
///
/// assert_eq!(doc.language, "en");
/// assert_eq!(doc.section_count(), 1);
/// # Ok::<(), wikirag::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Page title.
    pub title: String,
    /// Canonical page URL.
    pub url: String,
    /// Language code of the wiki the page came from.
    pub language: String,
    /// Numeric page id, when the source reports one.
    #[serde(default)]
    pub page_id: Option<u64>,
    /// Lead text before the first heading.
    pub summary: String,
    /// Top-level sections in document order.
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Full page text.
    pub raw_content: String,
    /// Category names.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl Document {
    /// Create a document with no sections, language `en`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDocument`] if the title or raw content is blank.
    pub fn new(
        title: impl Into<String>,
        url: impl Into<String>,
        summary: impl Into<String>,
        raw_content: impl Into<String>,
    ) -> Result<Self> {
        let title = title.into();
        let raw_content = raw_content.into();

        if title.trim().is_empty() {
            return Err(Error::InvalidDocument("title is empty".into()));
        }
        if raw_content.trim().is_empty() {
            return Err(Error::InvalidDocument(format!("{title:?} has no text")));
        }

        Ok(Self {
            title,
            url: url.into(),
            language: "en".to_string(),
            page_id: None,
            summary: summary.into(),
            sections: Vec::new(),
            raw_content,
            categories: Vec::new(),
        })
    }

    /// Set the top-level sections.
    #[must_use]
    pub fn with_sections(mut self, sections: Vec<Section>) -> Self {
        self.sections = sections;
        self
    }

    /// Set the language code.
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the page id.
    #[must_use]
    pub fn with_page_id(mut self, page_id: u64) -> Self {
        self.page_id = Some(page_id);
        self
    }

    /// Set the categories.
    #[must_use]
    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    /// Title, summary and raw text joined by blank lines.
    #[must_use]
    pub fn full_text(&self) -> String {
        format!("{}\n\n{}\n\n{}", self.title, self.summary, self.raw_content)
    }

    /// Whitespace-separated words in [`Document::full_text`].
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.full_text().split_whitespace().count()
    }

    /// Number of sections at every depth.
    #[must_use]
    pub fn section_count(&self) -> usize {
        self.sections.iter().map(Section::count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> Document {
        Document::new("Test Page", "https://en.wikipedia.org/wiki/Test_Page", "A summary.", "Body text here.")
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let doc = doc();
        assert_eq!(doc.language, "en");
        assert!(doc.sections.is_empty());
        assert!(doc.page_id.is_none());
    }

    #[test]
    fn test_blank_title_rejected() {
        let err = Document::new("  ", "u", "s", "text").unwrap_err();
        assert!(matches!(err, Error::InvalidDocument(_)));
    }

    #[test]
    fn test_blank_raw_content_rejected() {
        let err = Document::new("Title", "u", "s", "\n ").unwrap_err();
        assert!(matches!(err, Error::InvalidDocument(_)));
    }

    #[test]
    fn test_section_level_bounds() {
        assert!(Section::new("ok", 1, "x").is_ok());
        assert!(Section::new("ok", 6, "x").is_ok());
        assert!(matches!(Section::new("deep", 7, "x"), Err(Error::InvalidSection(_))));
        assert!(matches!(Section::new("zero", 0, "x"), Err(Error::InvalidSection(_))));
    }

    #[test]
    fn test_word_count_and_sections() {
        let child = Section::new("Child", 2, "c").unwrap();
        let parent = Section::new("Parent", 1, "p").unwrap().with_subsections(vec![child]);
        let doc = doc().with_sections(vec![parent, Section::new("Other", 1, "o").unwrap()]);

        // "Test Page" + "A summary." + "Body text here."
        assert_eq!(doc.word_count(), 7);
        assert_eq!(doc.section_count(), 3);
    }

    #[test]
    fn test_serde_roundtrip_keeps_tree() {
        let child = Section::new("Child", 2, "c").unwrap();
        let doc = doc().with_sections(vec![Section::new("Parent", 1, "p").unwrap().with_subsections(vec![child])]);

        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }
}
