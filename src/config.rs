//! Chunking configuration and process settings.
//!
//! ## Token-Equivalents
//!
//! Sizes are given in token-equivalents, not characters. Without a real
//! tokenizer we assume ~4 characters per token, so the splitter receives
//! `chunk_size * 4` and `chunk_overlap * 4` characters:
//!
//! ```text
//! chunk_size = 800, chunk_overlap = 150
//!            ↓ × 4
//! max_chars = 3200, overlap_chars = 600
//! ```
//!
//! ## Validation
//!
//! A [`ChunkingConfig`] is checked once, at construction. An overlap equal
//! to the chunk size would make every segment a copy of the previous one, so
//! it is rejected rather than clamped.
//!
//! ## Settings
//!
//! [`Settings`] gathers everything the surrounding service needs, read from
//! environment variables (optionally seeded from a `.env` file). There is no
//! global instance: build one and hand it to constructors.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::llm::GenerationOptions;
use crate::rag::RagOptions;
use crate::{Error, Result};

/// Characters per token-equivalent.
pub const CHARS_PER_TOKEN: usize = 4;

/// Supported chunk sizes in token-equivalents.
pub const CHUNK_SIZE_RANGE: std::ops::RangeInclusive<usize> = 100..=2000;

/// Supported overlaps in token-equivalents.
pub const CHUNK_OVERLAP_RANGE: std::ops::RangeInclusive<usize> = 0..=500;

/// How a document is cut into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Follow the document's own heading structure.
    #[default]
    #[serde(alias = "semantic", alias = "sections")]
    SectionAware,
    /// Split the full text as one blob.
    #[serde(alias = "fixed")]
    FixedWindow,
    /// Currently the same as [`Strategy::SectionAware`].
    Hybrid,
}

impl Strategy {
    /// Canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SectionAware => "section-aware",
            Self::FixedWindow => "fixed-window",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "section-aware" | "semantic" | "sections" => Ok(Self::SectionAware),
            "fixed-window" | "fixed" => Ok(Self::FixedWindow),
            "hybrid" => Ok(Self::Hybrid),
            _ => Err(Error::UnknownStrategy(s.to_string())),
        }
    }
}

/// Validated chunk size, overlap and strategy.
///
/// # Examples
///
/// ```rust
/// use wikirag::{ChunkingConfig, Strategy};
///
/// let config = ChunkingConfig::new(500, 100, Strategy::FixedWindow)?;
/// assert_eq!(config.max_chars(), 2000);
/// assert_eq!(config.overlap_chars(), 400);
///
/// // Overlap must be smaller than the chunk size
/// assert!(ChunkingConfig::new(200, 200, Strategy::SectionAware).is_err());
/// # Ok::<(), wikirag::Error>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChunkingConfig {
    chunk_size: usize,
    chunk_overlap: usize,
    strategy: Strategy,
}

impl ChunkingConfig {
    /// Default chunk size in token-equivalents.
    pub const DEFAULT_CHUNK_SIZE: usize = 800;
    /// Default overlap in token-equivalents.
    pub const DEFAULT_CHUNK_OVERLAP: usize = 150;

    /// Create a validated config.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidChunkSize`] if `chunk_size` is outside `100..=2000`
    /// - [`Error::InvalidOverlap`] if `chunk_overlap` is outside `0..=500`
    /// - [`Error::OverlapExceedsSize`] if `chunk_overlap >= chunk_size`
    pub fn new(chunk_size: usize, chunk_overlap: usize, strategy: Strategy) -> Result<Self> {
        if !CHUNK_SIZE_RANGE.contains(&chunk_size) {
            return Err(Error::InvalidChunkSize(chunk_size));
        }
        if !CHUNK_OVERLAP_RANGE.contains(&chunk_overlap) {
            return Err(Error::InvalidOverlap(chunk_overlap));
        }
        if chunk_overlap >= chunk_size {
            return Err(Error::OverlapExceedsSize {
                size: chunk_size,
                overlap: chunk_overlap,
            });
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            strategy,
        })
    }

    /// Target chunk size in token-equivalents.
    #[must_use]
    pub const fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap in token-equivalents.
    #[must_use]
    pub const fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Selected strategy.
    #[must_use]
    pub const fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// Same sizes, different strategy.
    #[must_use]
    pub const fn with_strategy(self, strategy: Strategy) -> Self {
        Self { strategy, ..self }
    }

    /// Splitter budget in characters.
    #[must_use]
    pub const fn max_chars(&self) -> usize {
        self.chunk_size * CHARS_PER_TOKEN
    }

    /// Splitter overlap in characters.
    #[must_use]
    pub const fn overlap_chars(&self) -> usize {
        self.chunk_overlap * CHARS_PER_TOKEN
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            chunk_overlap: Self::DEFAULT_CHUNK_OVERLAP,
            strategy: Strategy::SectionAware,
        }
    }
}

/// Load a `.env` file from the working directory, if there is one.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Process-wide settings read from the environment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Settings {
    /// Chunk size in token-equivalents (`CHUNK_SIZE`).
    pub chunk_size: usize,
    /// Overlap in token-equivalents (`CHUNK_OVERLAP`).
    pub chunk_overlap: usize,
    /// Chunking strategy (`CHUNKING_STRATEGY`).
    pub strategy: Strategy,
    /// Wikipedia language edition (`WIKIPEDIA_LANGUAGE`).
    pub wikipedia_language: String,
    /// User agent for page fetches (`USER_AGENT`).
    pub user_agent: String,
    /// OpenAI-compatible server base URL (`LMSTUDIO_BASE_URL`).
    pub llm_base_url: String,
    /// Chat model name (`LMSTUDIO_MODEL`).
    pub llm_model: String,
    /// Embedding model name (`EMBEDDING_MODEL`).
    pub embedding_model: String,
    /// Sampling temperature (`LLM_TEMPERATURE`).
    pub llm_temperature: f32,
    /// Response length cap (`LLM_MAX_TOKENS`).
    pub llm_max_tokens: u32,
    /// Chunks retrieved per question (`TOP_K_RESULTS`).
    pub top_k: usize,
    /// Minimum similarity for a retrieved chunk (`MIN_SIMILARITY_SCORE`).
    pub min_similarity: f32,
    /// Timeout for every collaborator request (`REQUEST_TIMEOUT_SECS`).
    pub request_timeout: Duration,
    /// Log filter directive (`LOG_LEVEL`).
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: ChunkingConfig::DEFAULT_CHUNK_SIZE,
            chunk_overlap: ChunkingConfig::DEFAULT_CHUNK_OVERLAP,
            strategy: Strategy::SectionAware,
            wikipedia_language: "en".to_string(),
            user_agent: "wikirag/0.1 (educational)".to_string(),
            llm_base_url: "http://localhost:1234/v1".to_string(),
            llm_model: "mistral-7b-instruct".to_string(),
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 1000,
            top_k: 5,
            min_similarity: 0.0,
            request_timeout: Duration::from_secs(30),
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Build settings from the process environment (call [`load_dotenv`] first).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for unparseable values and the
    /// [`ChunkingConfig::new`] errors for out-of-range chunking values.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup. Missing or empty keys use defaults.
    ///
    /// ```rust
    /// use wikirag::Settings;
    ///
    /// let settings = Settings::from_lookup(|key| match key {
    ///     "CHUNK_SIZE" => Some("400".to_string()),
    ///     "CHUNKING_STRATEGY" => Some("fixed".to_string()),
    ///     _ => None,
    /// })?;
    ///
    /// assert_eq!(settings.chunking()?.max_chars(), 1600);
    /// # Ok::<(), wikirag::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Same as [`Settings::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let settings = Self {
            chunk_size: parse_or(&get, "CHUNK_SIZE", defaults.chunk_size)?,
            chunk_overlap: parse_or(&get, "CHUNK_OVERLAP", defaults.chunk_overlap)?,
            strategy: match get("CHUNKING_STRATEGY") {
                Some(v) => v.parse()?,
                None => defaults.strategy,
            },
            wikipedia_language: get("WIKIPEDIA_LANGUAGE").unwrap_or(defaults.wikipedia_language),
            user_agent: get("USER_AGENT").unwrap_or(defaults.user_agent),
            llm_base_url: get("LMSTUDIO_BASE_URL").unwrap_or(defaults.llm_base_url),
            llm_model: get("LMSTUDIO_MODEL").unwrap_or(defaults.llm_model),
            embedding_model: get("EMBEDDING_MODEL").unwrap_or(defaults.embedding_model),
            llm_temperature: parse_or(&get, "LLM_TEMPERATURE", defaults.llm_temperature)?,
            llm_max_tokens: parse_or(&get, "LLM_MAX_TOKENS", defaults.llm_max_tokens)?,
            top_k: parse_or(&get, "TOP_K_RESULTS", defaults.top_k)?,
            min_similarity: parse_or(&get, "MIN_SIMILARITY_SCORE", defaults.min_similarity)?,
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
            log_level: get("LOG_LEVEL").unwrap_or(defaults.log_level),
        };

        // Fail at load time, not on the first document.
        settings.chunking()?;
        if settings.top_k == 0 {
            return Err(Error::Config("TOP_K_RESULTS must be at least 1".into()));
        }

        Ok(settings)
    }

    /// The chunking part of the settings.
    ///
    /// # Errors
    ///
    /// Propagates [`ChunkingConfig::new`] validation errors.
    pub fn chunking(&self) -> Result<ChunkingConfig> {
        ChunkingConfig::new(self.chunk_size, self.chunk_overlap, self.strategy)
    }

    /// Sampling options for the language model.
    #[must_use]
    pub fn generation(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.llm_temperature,
            max_tokens: self.llm_max_tokens,
        }
    }

    /// Retrieval options for the question-answering service.
    #[must_use]
    pub fn rag_options(&self) -> RagOptions {
        RagOptions {
            top_k: self.top_k,
            min_similarity: self.min_similarity,
            generation: self.generation(),
        }
    }

    /// Log the settings at startup.
    pub fn log_summary(&self) {
        tracing::info!(
            chunk_size = self.chunk_size,
            chunk_overlap = self.chunk_overlap,
            strategy = %self.strategy,
            language = %self.wikipedia_language,
            llm = %self.llm_base_url,
            model = %self.llm_model,
            embedding_model = %self.embedding_model,
            top_k = self.top_k,
            "settings loaded"
        );
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}"))),
        None => Ok(default),
    }
}
