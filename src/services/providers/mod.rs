//! Hosted language model abstraction
//!
//! Recommendations, viewing tips and the chat all go through this seam. The
//! concrete client is constructed once at start-up and shared through the
//! application state; tests substitute scripted implementations.

use futures::Stream;
use std::pin::Pin;

use crate::{error::AppResult, models::ChatMessage};

pub mod gemini;

pub use gemini::GeminiClient;

/// Text fragments of a streamed reply, in arrival order
///
/// An `Err` item ends the stream; fragments yielded before it stay valid.
pub type FragmentStream = Pin<Box<dyn Stream<Item = AppResult<String>> + Send>>;

/// Expected shape of the model's reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseFormat {
    #[default]
    Text,
    Json,
}

/// Sampling and format hints for a single generation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub response_format: ResponseFormat,
}

impl GenerationOptions {
    /// JSON output at the given temperature
    pub fn json(temperature: f32) -> Self {
        Self {
            temperature: Some(temperature),
            response_format: ResponseFormat::Json,
        }
    }

    /// Free text with the model's default sampling
    pub fn text() -> Self {
        Self::default()
    }
}

/// A multi-turn conversation to continue
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system_instruction: Option<String>,
    /// Conversation so far; the last entry is the user turn to answer
    pub messages: Vec<ChatMessage>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generates a complete reply to a single prompt
    ///
    /// Transport and availability failures are returned as-is; no retries.
    async fn generate_once(&self, prompt: &str, options: &GenerationOptions) -> AppResult<String>;

    /// Starts a streamed reply to a conversation
    async fn generate_stream(&self, request: ChatRequest) -> AppResult<FragmentStream>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
