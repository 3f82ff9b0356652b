//! Model Runner — the single point of entry for all inference calls.
//!
//! ARCHITECTURAL RULE: the underlying model handle is NOT safe for concurrent
//! invocation. Every `chat`/`generate` call in the process goes through the
//! runner's mutex; the raw backend never escapes this module.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::errors::AppError;

pub mod backend;
pub mod prompts;

pub use backend::{InferenceBackend, LlamaServerBackend};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned empty content")]
    EmptyContent,
}

/// One turn of a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Serialized access to the one inference session alive for the process.
///
/// Construct at startup via `load` (fatal if the artifact is missing or the
/// server never comes up), tear down at shutdown by dropping.
pub struct ModelRunner {
    backend: Mutex<Box<dyn InferenceBackend>>,
}

impl ModelRunner {
    /// Loads the production llama.cpp backend. Fails fast — no retry.
    pub async fn load(config: &Config) -> Result<Self, AppError> {
        let backend = LlamaServerBackend::start(config).await?;
        Ok(Self::with_backend(Box::new(backend)))
    }

    /// Wraps an arbitrary backend (tests swap in scripted ones here).
    pub fn with_backend(backend: Box<dyn InferenceBackend>) -> Self {
        ModelRunner {
            backend: Mutex::new(backend),
        }
    }

    /// Chat completion. Blocks (asynchronously) until the full response is
    /// produced; the lock is held for the whole call.
    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let backend = self.backend.lock().await;
        backend.chat(messages, max_tokens, temperature).await
    }

    /// Raw prompt completion, same exclusion discipline as `chat`.
    pub async fn generate(
        &self,
        prompt: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, LlmError> {
        let backend = self.backend.lock().await;
        backend.generate(prompt, max_tokens, temperature).await
    }
}
