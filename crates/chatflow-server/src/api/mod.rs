pub mod state;
pub mod stream;

use axum::{Json, Router, routing::get};
use state::AppState;

#[derive(serde::Serialize)]
struct Health {
    status: String,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "chatflow relay is working!".to_string(),
    })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/gemini/stream", get(stream::stream_generate))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chatflow_ai::{
        GenerationRequest, GenerationResponse, LlmClient, MockLlmClient, MockStep, TextStream,
    };

    use super::*;

    async fn spawn_relay(llm: Arc<dyn LlmClient>) -> String {
        let state = AppState::new(llm);
        let app = router(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn relays_fragments_as_sse_data_events() {
        let llm = MockLlmClient::from_steps(
            "mock-model",
            vec![MockStep::text("Hel"), MockStep::text("lo")],
        );
        let base = spawn_relay(Arc::new(llm)).await;

        let response = reqwest::get(format!("{base}/gemini/stream?prompt=Hi"))
            .await
            .expect("request should succeed");
        assert!(
            response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.starts_with("text/event-stream"))
        );

        let body = response.text().await.expect("body should stream to end");
        let hel = body.find(r#"data: {"text":"Hel"}"#).expect("first fragment");
        let lo = body.find(r#"data: {"text":"lo"}"#).expect("second fragment");
        assert!(hel < lo);
        assert!(!body.contains("event: error"));
    }

    #[tokio::test]
    async fn upstream_failure_emits_named_error_event() {
        let llm = MockLlmClient::from_steps(
            "mock-model",
            vec![MockStep::text("par"), MockStep::error("provider down")],
        );
        let base = spawn_relay(Arc::new(llm)).await;

        let body = reqwest::get(format!("{base}/gemini/stream?prompt=Hi"))
            .await
            .expect("request should succeed")
            .text()
            .await
            .expect("body should stream to end");

        assert!(body.contains(r#"data: {"text":"par"}"#));
        assert!(body.contains("event: error"));
        assert!(body.contains(r#""error":"LLM error: provider down""#));
    }

    #[tokio::test]
    async fn missing_prompt_is_rejected() {
        let llm = MockLlmClient::new("mock-model");
        let base = spawn_relay(Arc::new(llm)).await;

        let response = reqwest::get(format!("{base}/gemini/stream"))
            .await
            .expect("request should succeed");
        assert!(response.status().is_client_error());
    }

    struct OneShotClient;

    #[async_trait]
    impl LlmClient for OneShotClient {
        fn provider(&self) -> &str {
            "one-shot"
        }

        fn model(&self) -> &str {
            "one-shot-model"
        }

        async fn generate(
            &self,
            _request: GenerationRequest,
        ) -> chatflow_ai::Result<GenerationResponse> {
            Ok(GenerationResponse {
                text: "all at once".to_string(),
                finish_reason: chatflow_ai::FinishReason::Stop,
                usage: None,
            })
        }

        fn generate_stream(&self, _request: GenerationRequest) -> TextStream {
            Box::pin(futures::stream::empty())
        }
    }

    #[tokio::test]
    async fn non_streaming_client_falls_back_to_one_shot() {
        let base = spawn_relay(Arc::new(OneShotClient)).await;

        let body = reqwest::get(format!("{base}/gemini/stream?prompt=Hi"))
            .await
            .expect("request should succeed")
            .text()
            .await
            .expect("body should stream to end");

        assert!(body.contains(r#"data: {"text":"all at once"}"#));
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let llm = MockLlmClient::new("mock-model");
        let base = spawn_relay(Arc::new(llm)).await;

        let body = reqwest::get(format!("{base}/health"))
            .await
            .expect("request should succeed")
            .text()
            .await
            .expect("body");
        assert!(body.contains("chatflow relay is working!"));
    }
}
