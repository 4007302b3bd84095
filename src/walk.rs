//! Section-aware traversal.
//!
//! Walks a document the way a reader would: the lead summary first, then
//! each section followed by its subsections.
//!
//! ```text
//! Summary            -> "Introduction" passages
//! 1 History          -> "History" passages
//!   1.1 Origins      -> "Origins" passages
//!   1.2 Later years  -> "Later years" passages
//! 2 Design           -> "Design" passages
//! ```
//!
//! Section segments shorter than 50 characters are dropped: they are almost
//! always stray headings, captions or punctuation, and index badly. Summary
//! segments are kept whatever their length; a one-line lead is still the
//! best answer to "what is X?".

use crate::chunk::INTRODUCTION;
use crate::{clean, Document, Section, Splitter};

/// Section segments with fewer trimmed chars than this are dropped.
pub const MIN_SECTION_SEGMENT_CHARS: usize = 50;

/// A piece of cleaned text and the section it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    /// Cleaned, split text.
    pub text: String,
    /// Section label; `None` for text not tied to a section.
    pub section: Option<String>,
}

impl Passage {
    fn new(text: String, section: &str) -> Self {
        Self {
            text,
            section: Some(section.to_string()),
        }
    }
}

/// Flatten `document` into passages in reading order.
///
/// ```rust
/// use wikirag::{walk, Document, RecursiveSplitter, Section};
///
/// let doc = Document::new("T", "u", "Intro sentence one. Intro sentence two.", "raw")?
///     .with_sections(vec![Section::new("Tiny", 1, "Too short.")?]);
///
/// let passages = walk(&doc, &RecursiveSplitter::new(3200, 600));
/// assert_eq!(passages.len(), 1);
/// assert_eq!(passages[0].section.as_deref(), Some("Introduction"));
/// # Ok::<(), wikirag::Error>(())
/// ```
pub fn walk(document: &Document, splitter: &dyn Splitter) -> Vec<Passage> {
    let mut passages = Vec::new();

    let summary = clean(&document.summary);
    if !summary.is_empty() {
        passages.extend(
            splitter
                .split(&summary)
                .into_iter()
                .map(|text| Passage::new(text, INTRODUCTION)),
        );
    }

    for section in &document.sections {
        walk_section(section, splitter, &mut passages);
    }

    passages
}

fn walk_section(section: &Section, splitter: &dyn Splitter, passages: &mut Vec<Passage>) {
    let body = clean(&section.content);

    if body.is_empty() {
        tracing::debug!(section = %section.title, "skipping empty section body");
    } else {
        let before = passages.len();
        let mut dropped = 0usize;

        for segment in splitter.split(&body) {
            if segment.trim().chars().count() < MIN_SECTION_SEGMENT_CHARS {
                dropped += 1;
                continue;
            }
            passages.push(Passage::new(segment, &section.title));
        }

        tracing::trace!(
            section = %section.title,
            kept = passages.len() - before,
            dropped,
            "walked section"
        );
    }

    // Children are visited even when the parent contributed nothing.
    for child in &section.subsections {
        walk_section(child, splitter, passages);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RecursiveSplitter;

    fn long(word: &str) -> String {
        format!("{word} is discussed at length in this paragraph of the article. ").repeat(3)
    }

    fn labels(passages: &[Passage]) -> Vec<&str> {
        passages.iter().map(|p| p.section.as_deref().unwrap_or("-")).collect()
    }

    #[test]
    fn test_preorder_traversal() {
        let origins = Section::new("Origins", 2, long("Origins")).unwrap();
        let later = Section::new("Later", 2, long("Later")).unwrap();
        let history = Section::new("History", 1, long("History"))
            .unwrap()
            .with_subsections(vec![origins, later]);
        let design = Section::new("Design", 1, long("Design")).unwrap();

        let doc = Document::new("T", "u", "A summary.", "raw")
            .unwrap()
            .with_sections(vec![history, design]);

        let passages = walk(&doc, &RecursiveSplitter::new(3200, 600));
        assert_eq!(labels(&passages), ["Introduction", "History", "Origins", "Later", "Design"]);
    }

    #[test]
    fn test_short_summary_kept() {
        let doc = Document::new("T", "u", "Short.", "raw").unwrap();
        let passages = walk(&doc, &RecursiveSplitter::new(3200, 600));
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text, "Short.");
    }

    #[test]
    fn test_short_section_dropped_children_kept() {
        let child = Section::new("Child", 2, long("Child")).unwrap();
        let parent = Section::new("Parent", 1, "Too short.").unwrap().with_subsections(vec![child]);
        let doc = Document::new("T", "u", "", "raw").unwrap().with_sections(vec![parent]);

        let passages = walk(&doc, &RecursiveSplitter::new(3200, 600));
        assert_eq!(labels(&passages), ["Child"]);
    }

    #[test]
    fn test_empty_section_body_skipped() {
        let child = Section::new("Child", 2, long("Child")).unwrap();
        let parent = Section::new("Parent", 1, "  {{template only}} ").unwrap().with_subsections(vec![child]);
        let doc = Document::new("T", "u", "   ", "raw").unwrap().with_sections(vec![parent]);

        let passages = walk(&doc, &RecursiveSplitter::new(3200, 600));
        assert_eq!(labels(&passages), ["Child"]);
    }

    #[test]
    fn test_sub_threshold_tail_segment_dropped() {
        // 60 chars against a 56-char budget: "Tail." ends up alone and is dropped.
        let body = format!("{} Tail.", "word ".repeat(11).trim_end());
        let section = Section::new("S", 1, body).unwrap();
        let doc = Document::new("T", "u", "", "raw").unwrap().with_sections(vec![section]);

        let passages = walk(&doc, &RecursiveSplitter::new(56, 0));
        assert_eq!(passages.len(), 1);
        assert_eq!(passages[0].text.chars().count(), 54);
    }
}
