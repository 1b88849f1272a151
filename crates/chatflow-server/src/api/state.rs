use chatflow_ai::LlmClient;
use std::sync::Arc;

/// Application state shared across all API handlers
#[derive(Clone)]
pub struct AppState {
    pub llm: Arc<dyn LlmClient>,
}

impl AppState {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }
}
