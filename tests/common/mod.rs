//! In-memory collaborators for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use wikirag::{
    title_from_identifier, Chunk, CollectionInfo, Document, Embedder, Error, GenerationOptions, LanguageModel,
    MemoryIndex, Message, PageSource, Result, SearchHit, Section, VectorIndex,
};

/// A small page shaped like a real article: lead, nested sections, one stub.
pub fn sample_page() -> Document {
    let history = Section::new(
        "History",
        1,
        "The language was conceived in the late 1980s as a successor to ABC. \
         Its first release appeared in 1991 and drew a small but loyal following.",
    )
    .unwrap()
    .with_subsections(vec![Section::new(
        "Version 3",
        2,
        "Version 3 was released in 2008 and broke backward compatibility with earlier releases \
         in order to remove long-standing design flaws.",
    )
    .unwrap()]);

    let design = Section::new(
        "Design philosophy",
        1,
        "The language emphasizes code readability with significant indentation. \
         It supports several paradigms including structured, object-oriented and functional programming.",
    )
    .unwrap();

    let stub = Section::new("See also", 1, "Other languages.").unwrap();

    Document::new(
        "Python (programming language)",
        "https://en.wikipedia.org/wiki/Python_(programming_language)",
        "Python is a high-level, general-purpose programming language.",
        "Python is a high-level, general-purpose programming language. Full text follows.",
    )
    .unwrap()
    .with_sections(vec![history, design, stub])
}

/// Serves a fixed set of documents by title.
#[derive(Debug, Default)]
pub struct FakeSource {
    pages: HashMap<String, Document>,
}

impl FakeSource {
    pub fn with(documents: impl IntoIterator<Item = Document>) -> Self {
        Self {
            pages: documents.into_iter().map(|d| (d.title.clone(), d)).collect(),
        }
    }
}

impl PageSource for FakeSource {
    fn fetch(&self, identifier: &str) -> Result<Document> {
        let title = title_from_identifier(identifier)?;
        self.pages.get(&title).cloned().ok_or(Error::PageNotFound(title))
    }
}

/// Bag-of-words embedder: each lower-cased word is hashed into one of
/// `dims` buckets, and the vector is normalized. Texts sharing words land
/// close together.
#[derive(Debug)]
pub struct HashingEmbedder {
    dims: usize,
}

impl HashingEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for word in text.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            let hash = word
                .to_lowercase()
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ u64::from(b)).wrapping_mul(0x100_0000_01b3));
            v[(hash % self.dims as u64) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Records every conversation and answers with a canned reply.
#[derive(Debug, Default)]
pub struct FakeLlm {
    calls: AtomicUsize,
    last: Mutex<Vec<Message>>,
    fail: bool,
}

impl FakeLlm {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_messages(&self) -> Vec<Message> {
        self.last.lock().clone()
    }
}

impl LanguageModel for FakeLlm {
    fn chat(&self, messages: &[Message], _options: &GenerationOptions) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = messages.to_vec();
        if self.fail {
            return Err(Error::LlmUnavailable("connection refused".into()));
        }
        Ok("Python first appeared in 1991.".into())
    }

    fn model_name(&self) -> &str {
        "fake"
    }
}

/// A [`MemoryIndex`] whose writes can be made to fail.
#[derive(Debug, Default)]
pub struct FlakyIndex {
    inner: MemoryIndex,
    fail_upserts: AtomicBool,
}

impl FlakyIndex {
    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }
}

impl VectorIndex for FlakyIndex {
    fn create_collection(&self, name: &str) -> Result<()> {
        self.inner.create_collection(name)
    }

    fn delete_collection(&self, name: &str) -> Result<()> {
        self.inner.delete_collection(name)
    }

    fn collection_exists(&self, name: &str) -> Result<bool> {
        self.inner.collection_exists(name)
    }

    fn upsert(&self, name: &str, chunks: &[Chunk], embeddings: &[Vec<f32>]) -> Result<()> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(Error::Storage("disk full".into()));
        }
        self.inner.upsert(name, chunks, embeddings)
    }

    fn search(&self, name: &str, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        self.inner.search(name, query, k)
    }

    fn collection_info(&self, name: &str) -> Result<CollectionInfo> {
        self.inner.collection_info(name)
    }

    fn clear_collection(&self, name: &str) -> Result<()> {
        self.inner.clear_collection(name)
    }
}
