//! LLM client trait and types

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::error::Result;

/// Text generation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Create a new generation request
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Set temperature
    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = Some(temp);
        self
    }

    /// Set the output token cap
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }
}

/// Reason the provider stopped generating
#[derive(Debug, Clone, PartialEq)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Safety,
    Error,
}

/// Token usage statistics
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// One-shot generation response
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub text: String,
    pub finish_reason: FinishReason,
    pub usage: Option<TokenUsage>,
}

/// Incremental piece of a streamed generation.
///
/// Text-bearing chunks carry a non-empty `text`; the terminal chunk carries
/// the finish reason and usage with an empty `text`.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    pub text: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<TokenUsage>,
}

impl StreamChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish_reason: None,
            usage: None,
        }
    }

    pub fn final_chunk(finish_reason: FinishReason, usage: Option<TokenUsage>) -> Self {
        Self {
            text: String::new(),
            finish_reason: Some(finish_reason),
            usage,
        }
    }
}

/// Stream of generation chunks
pub type TextStream = Pin<Box<dyn Stream<Item = Result<StreamChunk>> + Send>>;

/// LLM client trait
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Get provider name
    fn provider(&self) -> &str;

    /// Get model name
    fn model(&self) -> &str;

    /// Complete a generation request in one shot
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse>;

    /// Stream a generation request chunk by chunk
    fn generate_stream(&self, request: GenerationRequest) -> TextStream;

    /// Whether `generate_stream` yields incremental output
    fn supports_streaming(&self) -> bool {
        false
    }
}
