//! Embedding collaborator.
//!
//! An [`Embedder`] maps texts to fixed-length vectors. Two backends ship
//! with the crate:
//!
//! | Backend | Feature | Where the model runs |
//! |---------|---------|----------------------|
//! | `HttpEmbedder` | `http` | any OpenAI-compatible `/embeddings` server |
//! | `FastEmbedder` | `fastembed` | in process, ONNX via fastembed |

use crate::{Chunk, Error, Result};

/// Text to vector mapping.
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts; one vector per text, in order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Embedding`] if the backend fails.
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Embedding`] if the backend fails or returns nothing.
    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text])?
            .pop()
            .ok_or_else(|| Error::Embedding("backend returned no vector".into()))
    }

    /// Vector length produced by this embedder.
    fn dimensions(&self) -> usize;
}

impl<T: Embedder + ?Sized> Embedder for Box<T> {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        (**self).embed(texts)
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        (**self).embed_one(text)
    }

    fn dimensions(&self) -> usize {
        (**self).dimensions()
    }
}

/// Embed the contents of `chunks`, checking that every chunk got a vector.
///
/// # Errors
///
/// - [`Error::Embedding`] if the backend fails
/// - [`Error::EmbeddingCountMismatch`] if the backend returns the wrong count
pub fn embed_chunks(embedder: &dyn Embedder, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
    if chunks.is_empty() {
        return Ok(vec![]);
    }

    let texts: Vec<&str> = chunks.iter().map(Chunk::content).collect();
    let embeddings = embedder.embed(&texts)?;

    if embeddings.len() != texts.len() {
        return Err(Error::EmbeddingCountMismatch {
            texts: texts.len(),
            embeddings: embeddings.len(),
        });
    }

    tracing::debug!(chunks = chunks.len(), dimensions = embedder.dimensions(), "embedded chunks");
    Ok(embeddings)
}

#[cfg(feature = "http")]
pub use http::HttpEmbedder;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use reqwest::blocking::Client;
    use serde::{Deserialize, Serialize};

    use super::Embedder;
    use crate::{Error, Result};

    #[derive(Debug, Serialize)]
    struct EmbeddingRequest<'a> {
        model: &'a str,
        input: &'a [&'a str],
        encoding_format: &'a str,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingResponse {
        data: Vec<EmbeddingData>,
    }

    #[derive(Debug, Deserialize)]
    struct EmbeddingData {
        embedding: Vec<f32>,
        index: usize,
    }

    /// [`Embedder`] over an OpenAI-compatible `/embeddings` endpoint.
    ///
    /// Texts are sent in batches of at most `max_batch_size`.
    #[derive(Debug, Clone)]
    pub struct HttpEmbedder {
        client: Client,
        endpoint: String,
        model: String,
        dimensions: usize,
        max_batch_size: usize,
    }

    impl HttpEmbedder {
        /// Create an embedder for `model` at `base_url` (including `/v1`),
        /// producing vectors of `dimensions` floats.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Config`] if the HTTP client cannot be built.
        pub fn new(base_url: &str, model: impl Into<String>, dimensions: usize, timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

            let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
            let model = model.into();
            tracing::info!(endpoint = %endpoint, model = %model, dimensions, "initialized HTTP embedder");

            Ok(Self {
                client,
                endpoint,
                model,
                dimensions,
                max_batch_size: 64,
            })
        }

        /// Limit the number of texts per request.
        ///
        /// # Panics
        ///
        /// Panics if `size` is zero.
        #[must_use]
        pub fn with_max_batch_size(mut self, size: usize) -> Self {
            assert!(size > 0, "max_batch_size must be > 0");
            self.max_batch_size = size;
            self
        }

        fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            let request = EmbeddingRequest {
                model: &self.model,
                input: texts,
                encoding_format: "float",
            };

            let response = self
                .client
                .post(&self.endpoint)
                .json(&request)
                .send()
                .map_err(|e| Error::Embedding(format!("request to {} failed: {e}", self.endpoint)))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().unwrap_or_default();
                return Err(Error::Embedding(format!("status {}: {body}", status.as_u16())));
            }

            let mut parsed: EmbeddingResponse = response
                .json()
                .map_err(|e| Error::Embedding(format!("invalid embedding response: {e}")))?;

            // The API does not promise to answer in input order.
            parsed.data.sort_by_key(|d| d.index);
            let vectors: Vec<Vec<f32>> = parsed.data.into_iter().map(|d| d.embedding).collect();

            if let Some(v) = vectors.iter().find(|v| v.len() != self.dimensions) {
                return Err(Error::DimensionMismatch {
                    expected: self.dimensions,
                    actual: v.len(),
                });
            }
            Ok(vectors)
        }
    }

    impl Embedder for HttpEmbedder {
        fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            let mut vectors = Vec::with_capacity(texts.len());
            for batch in texts.chunks(self.max_batch_size) {
                tracing::debug!(endpoint = %self.endpoint, texts = batch.len(), "embedding batch");
                vectors.extend(self.request(batch)?);
            }
            Ok(vectors)
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }
}

#[cfg(feature = "fastembed")]
pub use local::FastEmbedder;

#[cfg(feature = "fastembed")]
mod local {
    use super::Embedder;
    use crate::{Error, Result};

    /// In-process [`Embedder`] backed by fastembed.
    ///
    /// Uses fastembed's default model (BGE-small-en, 384 dimensions). The
    /// model is downloaded on first use.
    pub struct FastEmbedder {
        model: fastembed::TextEmbedding,
        dimensions: usize,
    }

    impl FastEmbedder {
        /// Load the default model.
        ///
        /// # Errors
        ///
        /// Returns [`Error::Embedding`] if the model fails to load.
        pub fn new() -> Result<Self> {
            let model = fastembed::TextEmbedding::try_new(Default::default())
                .map_err(|e| Error::Embedding(e.to_string()))?;

            // Probe once for the vector length.
            let probe = model
                .embed(vec!["dimension probe"], None)
                .map_err(|e| Error::Embedding(e.to_string()))?;
            let dimensions = probe.first().map_or(0, Vec::len);

            tracing::info!(dimensions, "loaded fastembed model");
            Ok(Self { model, dimensions })
        }
    }

    impl std::fmt::Debug for FastEmbedder {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("FastEmbedder")
                .field("dimensions", &self.dimensions)
                .finish_non_exhaustive()
        }
    }

    impl Embedder for FastEmbedder {
        fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            self.model
                .embed(texts.to_vec(), None)
                .map_err(|e| Error::Embedding(e.to_string()))
        }

        fn dimensions(&self) -> usize {
            self.dimensions
        }
    }
}
