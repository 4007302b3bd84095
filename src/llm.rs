//! Language model collaborator.
//!
//! The service only needs "messages in, text out". Backends implement
//! [`LanguageModel::chat`]; plain prompts and RAG prompts are built on top.
//!
//! ## System Messages
//!
//! Several models served by local OpenAI-compatible servers reject the
//! `system` role outright. [`fold_system_messages`] rewrites a conversation so
//! system text is prepended to the first user message instead:
//!
//! ```text
//! [system: "Be brief."] [user: "What is Rust?"]
//!                ↓
//! [user: "Be brief.\n\nWhat is Rust?"]
//! ```

use serde::{Deserialize, Serialize};

use crate::Result;

/// System prompt used for question answering over retrieved context.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided context. \
Use the context to answer the question accurately. \
If you use information from the context, cite the source. \
If the context doesn't contain relevant information, say so.";

/// Who a message is from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions for the model.
    System,
    /// The asking side.
    User,
    /// The model's earlier replies.
    Assistant,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Sender.
    pub role: Role,
    /// Text.
    pub content: String,
}

impl Message {
    /// A system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    /// A user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Sampling options for one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1000,
        }
    }
}

/// A text generation backend.
pub trait LanguageModel: Send + Sync {
    /// Complete a conversation.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::LlmUnavailable`] if the backend cannot be reached
    /// - [`crate::Error::ModelNotFound`] if the configured model is not loaded
    /// - [`crate::Error::Generation`] for any other failure
    fn chat(&self, messages: &[Message], options: &GenerationOptions) -> Result<String>;

    /// Name of the model answering.
    fn model_name(&self) -> &str;

    /// Complete a single prompt, with optional system instructions.
    ///
    /// # Errors
    ///
    /// Same as [`LanguageModel::chat`].
    fn generate(&self, prompt: &str, system_prompt: Option<&str>, options: &GenerationOptions) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(Message::system(system));
        }
        messages.push(Message::user(prompt));
        self.chat(&messages, options)
    }

    /// Answer `question` from `context` using [`DEFAULT_SYSTEM_PROMPT`].
    ///
    /// # Errors
    ///
    /// Same as [`LanguageModel::chat`].
    fn generate_with_context(&self, question: &str, context: &str, options: &GenerationOptions) -> Result<String> {
        self.generate(&rag_prompt(question, context), Some(DEFAULT_SYSTEM_PROMPT), options)
    }

    /// Whether the backend answers at all. Never fails.
    fn is_available(&self) -> bool {
        true
    }
}

impl<T: LanguageModel + ?Sized> LanguageModel for Box<T> {
    fn chat(&self, messages: &[Message], options: &GenerationOptions) -> Result<String> {
        (**self).chat(messages, options)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn generate(&self, prompt: &str, system_prompt: Option<&str>, options: &GenerationOptions) -> Result<String> {
        (**self).generate(prompt, system_prompt, options)
    }

    fn generate_with_context(&self, question: &str, context: &str, options: &GenerationOptions) -> Result<String> {
        (**self).generate_with_context(question, context, options)
    }

    fn is_available(&self) -> bool {
        (**self).is_available()
    }
}

/// The user prompt for answering `question` from `context`.
///
/// ```rust
/// let prompt = wikirag::rag_prompt("Who?", "[1] Section: History\nSomeone.\n");
/// assert!(prompt.starts_with("Context:\n[1] Section: History"));
/// assert!(prompt.ends_with("Question: Who?\n\nAnswer:"));
/// ```
#[must_use]
pub fn rag_prompt(question: &str, context: &str) -> String {
    format!("Context:\n{context}\n\nQuestion: {question}\n\nAnswer:")
}

/// Merge system messages into the first user message.
///
/// System texts are joined with a blank line and prepended to the first user
/// message. A conversation with no user message becomes a single user
/// message holding the system text. Other messages keep their order.
#[must_use]
pub fn fold_system_messages(messages: &[Message]) -> Vec<Message> {
    let (system, mut rest): (Vec<&Message>, Vec<&Message>) =
        messages.iter().partition(|m| m.role == Role::System);

    if system.is_empty() {
        return messages.to_vec();
    }

    let system_text = system
        .iter()
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let Some(first_user) = rest.iter().position(|m| m.role == Role::User) else {
        if rest.is_empty() {
            return vec![Message::user(system_text)];
        }
        // Only assistant turns: keep the instructions up front.
        let mut folded = vec![Message::user(system_text)];
        folded.extend(rest.drain(..).cloned());
        return folded;
    };

    rest.iter()
        .enumerate()
        .map(|(i, m)| {
            if i == first_user {
                Message::user(format!("{system_text}\n\n{}", m.content))
            } else {
                (*m).clone()
            }
        })
        .collect()
}

#[cfg(feature = "http")]
pub use client::OpenAiCompatClient;

#[cfg(feature = "http")]
mod client {
    use std::time::Duration;

    use reqwest::blocking::Client;
    use reqwest::StatusCode;
    use serde_json::json;

    use super::{fold_system_messages, GenerationOptions, LanguageModel, Message};
    use crate::{Error, Result};

    /// [`LanguageModel`] over an OpenAI-compatible `/chat/completions` API,
    /// such as the one LM Studio serves on `http://localhost:1234/v1`.
    ///
    /// System messages are always folded (see [`fold_system_messages`]).
    #[derive(Debug, Clone)]
    pub struct OpenAiCompatClient {
        client: Client,
        base_url: String,
        model: String,
        api_key: Option<String>,
    }

    impl OpenAiCompatClient {
        /// Create a client for `model` at `base_url` (including `/v1`).
        ///
        /// # Errors
        ///
        /// Returns [`Error::Config`] if the HTTP client cannot be built.
        pub fn new(base_url: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Result<Self> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

            let base_url = base_url.into().trim_end_matches('/').to_string();
            let model = model.into();
            tracing::info!(base_url = %base_url, model = %model, "initialized LLM client");

            Ok(Self {
                client,
                base_url,
                model,
                api_key: None,
            })
        }

        /// Send `Authorization: Bearer <key>` with every request.
        #[must_use]
        pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
            self.api_key = Some(key.into());
            self
        }

        fn post(&self, url: &str) -> reqwest::blocking::RequestBuilder {
            let request = self.client.post(url);
            match &self.api_key {
                Some(key) => request.bearer_auth(key),
                None => request,
            }
        }

        fn transport_error(&self, e: &reqwest::Error) -> Error {
            if e.is_connect() || e.is_timeout() {
                Error::LlmUnavailable(format!("cannot reach {}: {e}", self.base_url))
            } else {
                Error::Generation(e.to_string())
            }
        }
    }

    impl LanguageModel for OpenAiCompatClient {
        fn model_name(&self) -> &str {
            &self.model
        }

        fn chat(&self, messages: &[Message], options: &GenerationOptions) -> Result<String> {
            let url = format!("{}/chat/completions", self.base_url);
            let body = json!({
                "model": self.model,
                "messages": fold_system_messages(messages),
                "temperature": options.temperature,
                "max_tokens": options.max_tokens,
            });

            tracing::debug!(url = %url, messages = messages.len(), "chat request");

            let response = self
                .post(&url)
                .json(&body)
                .send()
                .map_err(|e| self.transport_error(&e))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().unwrap_or_default();
                let lower = text.to_lowercase();
                if status == StatusCode::NOT_FOUND || (lower.contains("model") && lower.contains("not found")) {
                    return Err(Error::ModelNotFound(self.model.clone()));
                }
                return Err(Error::Generation(format!("status {}: {text}", status.as_u16())));
            }

            let value: serde_json::Value = response.json().map_err(|e| self.transport_error(&e))?;
            let content = value["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| Error::Generation("missing choices[0].message.content".into()))?
                .to_string();

            tracing::debug!(chars = content.len(), "generated response");
            Ok(content)
        }

        fn is_available(&self) -> bool {
            let url = format!("{}/models", self.base_url);
            let mut request = self.client.get(&url);
            if let Some(key) = &self.api_key {
                request = request.bearer_auth(key);
            }

            match request.send() {
                Ok(response) => response.status().is_success(),
                Err(e) => {
                    tracing::debug!(error = %e, "LLM server not available");
                    false
                }
            }
        }
    }
}
