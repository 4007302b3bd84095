//! Recursive separator splitting with overlap.
//!
//! Tries progressively finer separators until every segment fits the budget.
//!
//! ## The Algorithm
//!
//! Given separators `["\n\n", "\n", ". ", " ", ""]` and `max_chars = 100`:
//!
//! ```text
//! 1. Split on the first separator present in the text, keeping the
//!    separator on the unit before it (nothing is lost)
//! 2. Greedily pack consecutive units into a segment while it stays
//!    within 100 chars
//! 3. A unit that alone is > 100 chars is split again with the next
//!    separator ("\n", then ". ", then " ")
//! 4. "" is the grapheme boundary: the last resort
//! ```
//!
//! ## Overlap
//!
//! When a segment is emitted, its trailing units are carried into the next
//! one as long as they fit within `overlap_chars`:
//!
//! ```text
//! max = 24, overlap = 10
//!
//! Text:      "alpha beta gamma delta epsilon zeta"
//! Segment 0: "alpha beta gamma delta"
//! Segment 1: "delta epsilon zeta"      <- "delta " carried over
//! ```
//!
//! Overlap is made of whole units, so it is at most `overlap_chars` and can
//! be less when the next unit would not fit.
//!
//! ## Lengths
//!
//! Budgets count `char`s, not bytes: a Japanese sentence and an English one
//! of the same length get the same budget.

use std::collections::VecDeque;

use unicode_segmentation::UnicodeSegmentation;

use crate::Splitter;

/// Separators for prose, coarsest first. `""` splits between graphemes.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " ", ""];

/// Recursive separator splitter with overlapping segments.
///
/// ## Example
///
/// ```rust
/// use wikirag::{RecursiveSplitter, Splitter};
///
/// let splitter = RecursiveSplitter::new(40, 10);
/// let text = "Paragraph one.\n\nParagraph two is longer and needs splitting.";
/// let segments = splitter.split(text);
///
/// assert_eq!(segments[0], "Paragraph one.");
/// assert!(segments.iter().all(|s| s.chars().count() <= 40));
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    max_chars: usize,
    overlap_chars: usize,
    separators: Vec<String>,
}

impl RecursiveSplitter {
    /// Create a splitter with the default prose separators.
    ///
    /// # Panics
    ///
    /// Panics if `max_chars == 0` or `overlap_chars >= max_chars`.
    #[must_use]
    pub fn new(max_chars: usize, overlap_chars: usize) -> Self {
        Self::with_separators(max_chars, overlap_chars, DEFAULT_SEPARATORS)
    }

    /// Create a splitter with a custom separator hierarchy, coarsest first.
    ///
    /// Without `""` in the list, a unit that no separator can break is
    /// emitted whole even if it exceeds `max_chars`.
    ///
    /// # Panics
    ///
    /// Panics if `max_chars == 0`, `overlap_chars >= max_chars`, or
    /// `separators` is empty.
    #[must_use]
    pub fn with_separators(max_chars: usize, overlap_chars: usize, separators: &[&str]) -> Self {
        assert!(max_chars > 0, "max_chars must be > 0");
        assert!(
            overlap_chars < max_chars,
            "overlap_chars ({overlap_chars}) must be < max_chars ({max_chars})"
        );
        assert!(!separators.is_empty(), "separators must not be empty");

        Self {
            max_chars,
            overlap_chars,
            separators: separators.iter().map(|&s| s.to_string()).collect(),
        }
    }

    /// Maximum segment length in chars.
    #[must_use]
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Maximum overlap between consecutive segments in chars.
    #[must_use]
    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    /// Split with the separator at `sep_index` or a finer one.
    fn split_recursive(&self, text: &str, sep_index: usize) -> Vec<String> {
        // First separator at or after sep_index that occurs in the text.
        let found = self.separators[sep_index..]
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep.as_str()))
            .map(|offset| sep_index + offset);

        let Some(index) = found else {
            return vec![text.trim().to_string()];
        };

        let mut segments = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for unit in split_keeping_separator(text, &self.separators[index]) {
            if char_len(unit) <= self.max_chars {
                pending.push(unit);
                continue;
            }

            if !pending.is_empty() {
                segments.extend(self.merge(&pending));
                pending.clear();
            }

            if index + 1 < self.separators.len() {
                segments.extend(self.split_recursive(unit, index + 1));
            } else {
                // Atomic unit: nothing finer to split on
                segments.push(unit.trim().to_string());
            }
        }

        if !pending.is_empty() {
            segments.extend(self.merge(&pending));
        }

        segments
    }

    /// Pack units into segments, carrying trailing units forward as overlap.
    fn merge(&self, units: &[&str]) -> Vec<String> {
        let mut segments = Vec::new();
        let mut window: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0;

        for &unit in units {
            let len = char_len(unit);

            if total + len > self.max_chars && !window.is_empty() {
                push_segment(&mut segments, &window);

                while total > self.overlap_chars || (total + len > self.max_chars && total > 0) {
                    let Some((_, dropped)) = window.pop_front() else {
                        break;
                    };
                    total -= dropped;
                }
            }

            window.push_back((unit, len));
            total += len;
        }

        push_segment(&mut segments, &window);
        segments
    }
}

impl Splitter for RecursiveSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        if text.is_empty() {
            return vec![];
        }

        self.split_recursive(text, 0)
            .into_iter()
            .filter(|segment| !segment.is_empty())
            .collect()
    }

    fn estimate_segments(&self, text_len: usize) -> usize {
        if text_len == 0 {
            return 0;
        }
        text_len.div_ceil(self.max_chars - self.overlap_chars)
    }
}

/// Split `text` into overlapping segments of at most `max_chars` chars.
///
/// Shorthand for [`RecursiveSplitter::new`] followed by [`Splitter::split`].
///
/// ```rust
/// let segments = wikirag::split("one two three four five six", 12, 6);
/// assert_eq!(segments, ["one two", "two three", "three four", "four five", "five six"]);
/// ```
///
/// # Panics
///
/// Panics if `overlap_chars >= max_chars`.
#[must_use]
pub fn split(text: &str, max_chars: usize, overlap_chars: usize) -> Vec<String> {
    RecursiveSplitter::new(max_chars, overlap_chars).split(text)
}

fn split_keeping_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text.graphemes(true).collect();
    }
    text.split_inclusive(separator)
        .filter(|unit| !unit.is_empty())
        .collect()
}

fn push_segment(segments: &mut Vec<String>, window: &VecDeque<(&str, usize)>) {
    let joined: String = window.iter().map(|(unit, _)| *unit).collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
