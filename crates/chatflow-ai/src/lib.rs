//! LLM provider clients for ChatFlow.
//!
//! The relay depends only on the [`llm::LlmClient`] trait; concrete
//! implementations cover the Gemini Generative Language API and a scripted
//! mock for offline runs and tests.

pub mod error;
mod http_client;
pub mod llm;

pub use error::{AiError, Result};
pub use llm::{
    FinishReason, GeminiClient, GenerationRequest, GenerationResponse, LlmClient, LlmProvider,
    MockLlmClient, MockStep, StreamChunk, TextStream, TokenUsage, create_client,
};
