//! Page source collaborator and the Wikipedia client.
//!
//! ## Identifiers
//!
//! A page can be named by title or by URL:
//!
//! ```text
//! "Quantum mechanics"                                   -> "Quantum mechanics"
//! "https://en.wikipedia.org/wiki/Quantum_mechanics"     -> "Quantum mechanics"
//! "https://en.wikipedia.org/wiki/Caf%C3%A9_au_lait"     -> "Café au lait"
//! ```
//!
//! ## Extracts
//!
//! The MediaWiki `extracts` API returns plain text with wiki-style headings
//! when asked for `exsectionformat=wiki`:
//!
//! ```text
//! Lead paragraph.
//!
//! == History ==
//! Text about history.
//!
//! === Origins ===
//! Text about origins.
//! ```
//!
//! [`parse_extract`] turns that into a [`Document`]: the lead becomes the
//! summary and headings become a section tree (`==` is level 1, `===` level
//! 2, and so on).

use std::fmt::Write;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Document, Error, Result, Section, MAX_SECTION_LEVEL};

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(={2,})\s*(.+?)\s*=+\s*$").unwrap());

/// Where documents come from.
pub trait PageSource: Send + Sync {
    /// Fetch the page named by `identifier` (a title or a page URL).
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidIdentifier`] if `identifier` names no page
    /// - [`Error::PageNotFound`] if the page does not exist
    /// - [`Error::Network`] if the source cannot be reached
    fn fetch(&self, identifier: &str) -> Result<Document>;

    /// Titles matching `query`, best first, at most `limit`. Sources without
    /// search return nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Network`] if the source cannot be reached.
    fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        let _ = (query, limit);
        Ok(Vec::new())
    }
}

/// Lets `Box<dyn PageSource>` be passed wherever a source is expected.
impl<T: PageSource + ?Sized> PageSource for Box<T> {
    fn fetch(&self, identifier: &str) -> Result<Document> {
        (**self).fetch(identifier)
    }

    fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
        (**self).search(query, limit)
    }
}

/// Page title for a title or a Wikipedia page URL.
///
/// URLs must have a `wiki` path segment followed by the title. The title is
/// percent-decoded and underscores become spaces. Plain titles are trimmed.
///
/// ```rust
/// use wikirag::title_from_identifier;
///
/// assert_eq!(
///     title_from_identifier("https://en.wikipedia.org/wiki/Python_(programming_language)")?,
///     "Python (programming language)"
/// );
/// assert_eq!(title_from_identifier("  Rust  ")?, "Rust");
/// assert!(title_from_identifier("https://example.org/about").is_err());
/// # Ok::<(), wikirag::Error>(())
/// ```
///
/// # Errors
///
/// Returns [`Error::InvalidIdentifier`] for blank input, unparseable URLs, or
/// URLs without a title after `/wiki/`.
pub fn title_from_identifier(identifier: &str) -> Result<String> {
    let identifier = identifier.trim();
    if identifier.is_empty() {
        return Err(Error::InvalidIdentifier("empty page identifier".into()));
    }

    if !(identifier.starts_with("http://") || identifier.starts_with("https://")) {
        return Ok(identifier.to_string());
    }

    let invalid = || Error::InvalidIdentifier(format!("no page title in URL {identifier:?}"));

    let parsed = url::Url::parse(identifier).map_err(|e| Error::InvalidIdentifier(format!("{identifier:?}: {e}")))?;
    let segments: Vec<&str> = parsed.path_segments().map(|s| s.collect()).unwrap_or_default();

    let raw = segments
        .iter()
        .position(|s| *s == "wiki")
        .and_then(|i| segments.get(i + 1))
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid)?;

    let decoded = urlencoding::decode(raw).map_err(|e| Error::InvalidIdentifier(format!("{identifier:?}: {e}")))?;
    let title = decoded.replace('_', " ").trim().to_string();
    if title.is_empty() {
        return Err(invalid());
    }
    Ok(title)
}

/// Build a [`Document`] from a plain-text extract with `== Heading ==` lines.
///
/// Text before the first heading is the summary. Sections with an empty
/// body and no non-empty subsections are dropped. The raw content is the
/// summary followed by each section as a Markdown heading and its body.
///
/// ```rust
/// use wikirag::parse_extract;
///
/// let extract = "Lead.\n\n== History ==\nEarly days.\n\n=== Origins ===\nRoots.\n\n== Design ==\nShape.";
/// let doc = parse_extract("T", "https://en.wikipedia.org/wiki/T", "en", extract)?;
///
/// assert_eq!(doc.summary, "Lead.");
/// assert_eq!(doc.sections.len(), 2);
/// assert_eq!(doc.sections[0].subsections[0].title, "Origins");
/// assert_eq!(doc.sections[0].subsections[0].level, 2);
/// assert!(doc.raw_content.contains("## Origins\n\nRoots."));
/// # Ok::<(), wikirag::Error>(())
/// ```
///
/// # Errors
///
/// Returns [`Error::InvalidDocument`] if the title or extract is blank.
pub fn parse_extract(title: &str, url: &str, language: &str, extract: &str) -> Result<Document> {
    let mut summary = Vec::new();
    // (level, title, body lines) in document order
    let mut flat: Vec<(u8, String, Vec<&str>)> = Vec::new();

    for line in extract.lines() {
        if let Some(caps) = HEADING.captures(line.trim()) {
            let depth = caps[1].len().saturating_sub(1).clamp(1, usize::from(MAX_SECTION_LEVEL));
            let level = u8::try_from(depth).unwrap_or(MAX_SECTION_LEVEL);
            flat.push((level, caps[2].to_string(), Vec::new()));
        } else if let Some((_, _, body)) = flat.last_mut() {
            body.push(line);
        } else {
            summary.push(line);
        }
    }

    let summary = summary.join("\n").trim().to_string();
    let sections = build_tree(flat)?;

    let mut raw = summary.clone();
    for section in &sections {
        render_section(section, &mut raw);
    }

    Ok(Document::new(title, url, summary, raw)?
        .with_sections(sections)
        .with_language(language))
}

fn build_tree(flat: Vec<(u8, String, Vec<&str>)>) -> Result<Vec<Section>> {
    let mut roots: Vec<Section> = Vec::new();
    let mut stack: Vec<Section> = Vec::new();

    for (level, title, body) in flat {
        let section = Section::new(title, level, body.join("\n").trim())?;
        while stack.last().is_some_and(|top| top.level >= level) {
            close(&mut stack, &mut roots);
        }
        stack.push(section);
    }
    while !stack.is_empty() {
        close(&mut stack, &mut roots);
    }

    Ok(roots)
}

fn close(stack: &mut Vec<Section>, roots: &mut Vec<Section>) {
    let Some(section) = stack.pop() else { return };
    if section.content.is_empty() && section.subsections.is_empty() {
        tracing::trace!(section = %section.title, "dropping empty section");
        return;
    }
    match stack.last_mut() {
        Some(parent) => parent.subsections.push(section),
        None => roots.push(section),
    }
}

fn render_section(section: &Section, out: &mut String) {
    let hashes = "#".repeat(usize::from(section.level));
    let _ = write!(out, "\n\n{hashes} {}\n\n{}", section.title, section.content);
    for child in &section.subsections {
        render_section(child, out);
    }
}

#[cfg(feature = "http")]
pub use client::WikipediaClient;

#[cfg(feature = "http")]
mod client {
    use std::time::Duration;

    use reqwest::blocking::Client;
    use serde::Deserialize;

    use super::{parse_extract, title_from_identifier, PageSource};
    use crate::{Document, Error, Result};

    #[derive(Debug, Deserialize)]
    struct QueryResponse {
        query: Option<QueryBody>,
    }

    #[derive(Debug, Deserialize)]
    struct QueryBody {
        #[serde(default)]
        pages: Vec<Page>,
    }

    #[derive(Debug, Deserialize)]
    struct Page {
        title: String,
        pageid: Option<u64>,
        #[serde(default)]
        missing: bool,
        #[serde(default)]
        invalid: bool,
        #[serde(default)]
        extract: String,
        fullurl: Option<String>,
        #[serde(default)]
        categories: Vec<Category>,
    }

    #[derive(Debug, Deserialize)]
    struct Category {
        title: String,
    }

    /// [`PageSource`] over the MediaWiki action API of one language edition.
    ///
    /// ```rust,ignore
    /// use std::time::Duration;
    /// use wikirag::{PageSource, WikipediaClient};
    ///
    /// let client = WikipediaClient::new("en", "wikirag/0.1 (educational)", Duration::from_secs(30))?;
    /// let doc = client.fetch("https://en.wikipedia.org/wiki/Rust_(programming_language)")?;
    /// println!("{} sections", doc.section_count());
    /// ```
    #[derive(Debug, Clone)]
    pub struct WikipediaClient {
        client: Client,
        language: String,
        api_url: String,
    }

    impl WikipediaClient {
        /// Create a client for the `language` edition (`en`, `de`, ...).
        ///
        /// # Errors
        ///
        /// Returns [`Error::Config`] if the HTTP client cannot be built.
        pub fn new(language: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .user_agent(user_agent)
                .timeout(timeout)
                .build()
                .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

            tracing::info!(language, "initialized Wikipedia client");

            Ok(Self {
                client,
                language: language.to_string(),
                api_url: format!("https://{language}.wikipedia.org/w/api.php"),
            })
        }

        /// Use a different API endpoint, such as a local MediaWiki.
        #[must_use]
        pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
            self.api_url = api_url.into();
            self
        }

        fn page_url(&self, title: &str) -> String {
            let slug = title.replace(' ', "_");
            format!("https://{}.wikipedia.org/wiki/{}", self.language, urlencoding::encode(&slug))
        }
    }

    impl PageSource for WikipediaClient {
        fn fetch(&self, identifier: &str) -> Result<Document> {
            let title = title_from_identifier(identifier)?;
            tracing::info!(title = %title, "fetching Wikipedia page");

            let response: QueryResponse = self
                .client
                .get(&self.api_url)
                .query(&[
                    ("action", "query"),
                    ("format", "json"),
                    ("formatversion", "2"),
                    ("prop", "extracts|info|categories"),
                    ("explaintext", "1"),
                    ("exsectionformat", "wiki"),
                    ("inprop", "url"),
                    ("cllimit", "max"),
                    ("clshow", "!hidden"),
                    ("redirects", "1"),
                    ("titles", title.as_str()),
                ])
                .send()
                .and_then(reqwest::blocking::Response::error_for_status)
                .and_then(reqwest::blocking::Response::json)
                .map_err(|e| Error::Network(format!("fetch {title:?}: {e}")))?;

            let page = response
                .query
                .and_then(|q| q.pages.into_iter().next())
                .filter(|p| !p.missing && !p.invalid && !p.extract.trim().is_empty())
                .ok_or_else(|| Error::PageNotFound(title.clone()))?;

            let url = page.fullurl.clone().unwrap_or_else(|| self.page_url(&page.title));
            let mut doc = parse_extract(&page.title, &url, &self.language, &page.extract)?
                .with_categories(page.categories.into_iter().map(|c| c.title).collect());
            if let Some(id) = page.pageid {
                doc = doc.with_page_id(id);
            }

            tracing::info!(
                title = %doc.title,
                sections = doc.section_count(),
                words = doc.word_count(),
                "fetched Wikipedia page"
            );
            Ok(doc)
        }

        fn search(&self, query: &str, limit: usize) -> Result<Vec<String>> {
            let limit = limit.to_string();
            let value: serde_json::Value = self
                .client
                .get(&self.api_url)
                .query(&[
                    ("action", "opensearch"),
                    ("search", query),
                    ("limit", limit.as_str()),
                    ("format", "json"),
                ])
                .send()
                .and_then(reqwest::blocking::Response::error_for_status)
                .and_then(reqwest::blocking::Response::json)
                .map_err(|e| Error::Network(format!("search {query:?}: {e}")))?;

            // [query, [titles], [descriptions], [urls]]
            let titles: Vec<String> = value[1]
                .as_array()
                .map(|titles| titles.iter().filter_map(|t| t.as_str().map(str::to_string)).collect())
                .unwrap_or_default();

            tracing::info!(query, found = titles.len(), "searched Wikipedia");
            Ok(titles)
        }
    }
}
