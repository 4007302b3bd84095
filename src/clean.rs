//! Text cleaning.
//!
//! Wikipedia extracts are mostly plain text, but wiki markup leaks through:
//!
//! ```text
//! "The [[Python (language)|language]] was released{{citation needed}}.[12]"
//!                    ↓
//! "The language was released."
//! ```
//!
//! Cleaning runs before splitting so segment budgets are spent on prose, not
//! markup. It is pure and deterministic.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static TEMPLATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{[^}]+\}\}").unwrap());
static LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]+))?\]\]").unwrap());
static CITATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\d+\]").unwrap());
static ELLIPSIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\.{3,}").unwrap());

/// Normalize markup-laden text into plain prose.
///
/// - whitespace runs (newlines included) become one space
/// - `{{templates}}` are removed
/// - `[[target|label]]` becomes `label`, `[[target]]` becomes `target`
/// - numeric citation markers like `[12]` are removed
/// - three or more periods become `...`
/// - the result is trimmed
///
/// ```rust
/// use wikirag::clean;
///
/// assert_eq!(
///     clean("See  [[Guido van Rossum|Guido]]{{cn}}.[3]\n\nMore...."),
///     "See Guido. More..."
/// );
/// assert_eq!(clean(""), "");
/// ```
#[must_use]
pub fn clean(text: &str) -> String {
    let text = collapse_whitespace(text);
    let text = TEMPLATE.replace_all(&text, "");
    let text = LINK.replace_all(&text, |caps: &Captures<'_>| {
        caps.get(2)
            .or_else(|| caps.get(1))
            .map_or_else(String::new, |m| m.as_str().to_string())
    });
    let text = CITATION.replace_all(&text, "");
    let text = ELLIPSIS.replace_all(&text, "...");

    // Removals above can leave doubled spaces behind.
    collapse_whitespace(&text)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(
            clean("This  has    extra   spaces.\n\n\nAnd  newlines."),
            "This has extra spaces. And newlines."
        );
    }

    #[test]
    fn test_removes_citations() {
        assert_eq!(
            clean("This is a sentence[1] with references[2][3]."),
            "This is a sentence with references."
        );
    }

    #[test]
    fn test_keeps_non_numeric_brackets() {
        assert_eq!(clean("An array [a, b] stays."), "An array [a, b] stays.");
    }

    #[test]
    fn test_strips_templates() {
        assert_eq!(
            clean("Born in 1956{{citation needed}} in Haarlem."),
            "Born in 1956 in Haarlem."
        );
    }

    #[test]
    fn test_link_label_and_target() {
        assert_eq!(clean("A [[Snake|python]] is not a [[language]]."), "A python is not a language.");
    }

    #[test]
    fn test_ellipsis() {
        assert_eq!(clean("Wait..... what......"), "Wait... what...");
        assert_eq!(clean("Two.. dots stay"), "Two.. dots stay");
    }

    #[test]
    fn test_trims() {
        assert_eq!(clean("   padded   "), "padded");
    }

    #[test]
    fn test_empty_and_blank() {
        assert_eq!(clean(""), "");
        assert_eq!(clean(" \n\t "), "");
        assert_eq!(clean("{{only a template}}"), "");
    }

    #[test]
    fn test_idempotent() {
        let once = clean("Text [[a|b]] with {{x}} refs[9] and... more   space");
        assert_eq!(clean(&once), once);
    }
}
