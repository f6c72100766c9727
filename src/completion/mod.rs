//! Completion service contract
//!
//! Given a prompt, returns free-form text. Callers may ask for JSON-shaped
//! output but must still parse defensively (see `crate::parsing`).

use crate::Result;
use async_trait::async_trait;

pub mod openai;
pub use openai::OpenAiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    Text,
    JsonObject,
}

/// Per-call knobs. `None` leaves the provider default in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub response_format: Option<ResponseFormat>,
}

impl CompletionOptions {
    /// Short, temperature-zero, JSON-object completion.
    pub fn strict_json(max_output_tokens: u32) -> Self {
        Self {
            max_output_tokens: Some(max_output_tokens),
            temperature: Some(0.0),
            response_format: Some(ResponseFormat::JsonObject),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
}

/// Trait for text completion (LLM controlled)
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, options: &CompletionOptions) -> Result<Completion>;
}
