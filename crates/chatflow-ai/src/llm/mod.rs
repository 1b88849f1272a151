//! LLM module - provider client abstraction for text generation

mod client;
mod factory;
mod gemini;
mod mock_client;

pub use client::{
    FinishReason, GenerationRequest, GenerationResponse, LlmClient, StreamChunk, TextStream,
    TokenUsage,
};
pub use factory::{LlmProvider, create_client};
pub use gemini::GeminiClient;
pub use mock_client::{MockLlmClient, MockStep};
