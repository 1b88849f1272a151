//! LLM client construction from configuration

use std::sync::Arc;

use crate::error::{AiError, Result};
use crate::llm::{GeminiClient, LlmClient, MockLlmClient};

/// Supported providers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Gemini,
    Mock,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::Mock => "mock",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            other => Err(AiError::Llm(format!("Unknown provider '{other}'"))),
        }
    }
}

/// Build a client for the configured provider.
///
/// Gemini requires an API key; the mock provider ignores it.
pub fn create_client(
    provider: LlmProvider,
    model: Option<&str>,
    api_key: Option<&str>,
) -> Result<Arc<dyn LlmClient>> {
    match provider {
        LlmProvider::Gemini => {
            let key = api_key
                .ok_or_else(|| AiError::Llm("Gemini API key is required".to_string()))?;
            let mut client = GeminiClient::new(key);
            if let Some(model) = model {
                client = client.with_model(model);
            }
            Ok(Arc::new(client))
        }
        LlmProvider::Mock => {
            let client = MockLlmClient::new(model.unwrap_or("mock-model"));
            Ok(Arc::new(client))
        }
    }
}
