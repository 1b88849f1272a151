//! Deterministic mock LLM client for offline runs and tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

use crate::error::{AiError, Result};

use super::{
    FinishReason, GenerationRequest, GenerationResponse, LlmClient, StreamChunk, TextStream,
    TokenUsage,
};

/// Deterministic step for scripted mock generations.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Emit a text fragment.
    Text(String),
    /// Fail with an LLM error.
    Error(String),
}

/// Scripted generation step with optional delay.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub kind: MockStepKind,
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Text(content.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Error(message.into()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// A deterministic mock LLM client driven by scripted steps.
///
/// `generate` consumes the whole script and returns the concatenated text;
/// `generate_stream` yields one chunk per scripted step, which is what the
/// relay tests use to model multi-fragment upstream streams. With an empty
/// script both echo the prompt.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    model: String,
    script: Arc<Mutex<VecDeque<MockStep>>>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    pub fn from_steps(model: impl Into<String>, steps: Vec<MockStep>) -> Self {
        Self {
            model: model.into(),
            script: Arc::new(Mutex::new(VecDeque::from(steps))),
        }
    }

    pub async fn push_step(&self, step: MockStep) {
        self.script.lock().await.push_back(step);
    }

    async fn next_step(&self) -> Option<MockStep> {
        self.script.lock().await.pop_front()
    }

    fn usage_for(content_len: usize) -> TokenUsage {
        let completion_tokens = content_len as u32;
        TokenUsage {
            prompt_tokens: 1,
            completion_tokens,
            total_tokens: 1 + completion_tokens,
        }
    }

    fn echo_text(request: &GenerationRequest) -> String {
        format!("mock-echo: {}", request.prompt)
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        let mut text = String::new();
        let mut scripted = false;

        while let Some(step) = self.next_step().await {
            scripted = true;
            if step.delay_ms > 0 {
                sleep(Duration::from_millis(step.delay_ms)).await;
            }
            match step.kind {
                MockStepKind::Text(content) => text.push_str(&content),
                MockStepKind::Error(message) => return Err(AiError::Llm(message)),
            }
        }

        if !scripted {
            text = Self::echo_text(&request);
        }

        Ok(GenerationResponse {
            usage: Some(Self::usage_for(text.len())),
            text,
            finish_reason: FinishReason::Stop,
        })
    }

    fn generate_stream(&self, request: GenerationRequest) -> TextStream {
        let client = self.clone();
        Box::pin(async_stream::stream! {
            let mut emitted = 0usize;
            let mut total_len = 0usize;

            while let Some(step) = client.next_step().await {
                if step.delay_ms > 0 {
                    sleep(Duration::from_millis(step.delay_ms)).await;
                }
                match step.kind {
                    MockStepKind::Text(content) => {
                        emitted += 1;
                        total_len += content.len();
                        yield Ok(StreamChunk::text(content));
                    }
                    MockStepKind::Error(message) => {
                        yield Err(AiError::Llm(message));
                        return;
                    }
                }
            }

            if emitted == 0 {
                let text = Self::echo_text(&request);
                total_len = text.len();
                yield Ok(StreamChunk::text(text));
            }

            yield Ok(StreamChunk::final_chunk(
                FinishReason::Stop,
                Some(Self::usage_for(total_len)),
            ));
        })
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}
