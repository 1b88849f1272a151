//! Gemini LLM provider (Generative Language API)

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{
    FinishReason, GenerationRequest, GenerationResponse, LlmClient, StreamChunk, TextStream,
    TokenUsage,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Gemini client
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn request_body(request: &GenerationRequest) -> GeminiRequest {
        let generation_config =
            if request.temperature.is_some() || request.max_output_tokens.is_some() {
                Some(GenerationConfig {
                    temperature: request.temperature,
                    max_output_tokens: request.max_output_tokens,
                })
            } else {
                None
            };

        GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: request.prompt.clone(),
                }],
            }],
            generation_config,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

/// One `GenerateContentResponse` message; the streaming endpoint emits a
/// sequence of these as SSE data payloads.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    total_token_count: u32,
}

impl GeminiResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }

    fn finish_reason(&self) -> Option<FinishReason> {
        let reason = self
            .candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())?;
        Some(match reason {
            "STOP" => FinishReason::Stop,
            "MAX_TOKENS" => FinishReason::MaxTokens,
            "SAFETY" | "RECITATION" | "PROHIBITED_CONTENT" => FinishReason::Safety,
            _ => FinishReason::Stop,
        })
    }

    fn usage(&self) -> Option<TokenUsage> {
        self.usage_metadata.as_ref().map(|u| TokenUsage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u.total_token_count,
        })
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    fn provider(&self) -> &str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = Self::request_body(&request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let error = response.text().await.unwrap_or_default();
            return Err(AiError::Llm(format!("Gemini API error: {}", error)));
        }

        let data: GeminiResponse = response.json().await?;

        Ok(GenerationResponse {
            text: data.text(),
            finish_reason: data.finish_reason().unwrap_or(FinishReason::Stop),
            usage: data.usage(),
        })
    }

    fn generate_stream(&self, request: GenerationRequest) -> TextStream {
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        );

        Box::pin(async_stream::stream! {
            let body = Self::request_body(&request);

            let response = match client
                .post(&url)
                .header("x-goog-api-key", &api_key)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    yield Err(AiError::Llm(format!("Request failed: {}", e)));
                    return;
                }
            };

            if !response.status().is_success() {
                let error = response.text().await.unwrap_or_default();
                yield Err(AiError::Llm(format!("Gemini API error: {}", error)));
                return;
            }

            let mut byte_stream = response.bytes_stream();
            let mut buffer = String::new();
            let mut usage: Option<TokenUsage> = None;
            let mut finish_reason: Option<FinishReason> = None;

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(AiError::Llm(format!("Stream error: {}", e)));
                        return;
                    }
                };

                buffer.push_str(&String::from_utf8_lossy(&chunk));

                // Process complete SSE events from buffer
                while let Some(pos) = buffer.find("\n\n") {
                    let event_str = buffer[..pos].to_string();
                    buffer = buffer[pos + 2..].to_string();

                    for line in event_str.lines() {
                        if let Some(data) = line.strip_prefix("data: ") {
                            if data.trim().is_empty() {
                                continue;
                            }

                            let message: GeminiResponse = match serde_json::from_str(data) {
                                Ok(m) => m,
                                Err(_) => continue,
                            };

                            let text = message.text();
                            if !text.is_empty() {
                                yield Ok(StreamChunk::text(text));
                            }

                            if let Some(u) = message.usage() {
                                usage = Some(u);
                            }
                            if let Some(reason) = message.finish_reason() {
                                finish_reason = Some(reason);
                            }
                        }
                    }
                }
            }

            yield Ok(StreamChunk::final_chunk(
                finish_reason.unwrap_or(FinishReason::Stop),
                usage,
            ));
        })
    }

    fn supports_streaming(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn sse_body(messages: &[&str]) -> String {
        let mut body = String::new();
        for message in messages {
            body.push_str("data: ");
            body.push_str(message);
            body.push_str("\n\n");
        }
        body
    }

    #[tokio::test]
    async fn streams_text_fragments_in_order() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            r#"{"candidates":[{"content":{"parts":[{"text":"Hel"}]}}]}"#,
            r#"{"candidates":[{"content":{"parts":[{"text":"lo"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":2,"candidatesTokenCount":3,"totalTokenCount":5}}"#,
        ]);

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:streamGenerateContent"))
            .and(query_param("alt", "sse"))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = GeminiClient::new("test-key").with_base_url(server.uri());
        let chunks: Vec<StreamChunk> = client
            .generate_stream(GenerationRequest::new("Hi"))
            .try_collect()
            .await
            .expect("stream should succeed");

        let text: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(text, "Hello");

        let last = chunks.last().unwrap();
        assert_eq!(last.finish_reason, Some(FinishReason::Stop));
        assert_eq!(last.usage.as_ref().unwrap().total_tokens, 5);
    }

    #[tokio::test]
    async fn stream_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:streamGenerateContent"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let client = GeminiClient::new("test-key").with_base_url(server.uri());
        let result: Result<Vec<StreamChunk>> = client
            .generate_stream(GenerationRequest::new("Hi"))
            .try_collect()
            .await;

        let err = result.expect_err("stream should fail");
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn generate_collects_full_text() {
        let server = MockServer::start().await;
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hi "},{"text":"there"}]},"finishReason":"STOP"}],"usageMetadata":{"promptTokenCount":1,"candidatesTokenCount":2,"totalTokenCount":3}}"#;

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "application/json"))
            .mount(&server)
            .await;

        let client = GeminiClient::new("test-key").with_base_url(server.uri());
        let response = client
            .generate(GenerationRequest::new("Hi"))
            .await
            .expect("generate should succeed");

        assert_eq!(response.text, "Hi there");
        assert_eq!(response.finish_reason, FinishReason::Stop);
    }

    #[test]
    fn request_body_includes_generation_config() {
        let request = GenerationRequest::new("Hi")
            .with_temperature(0.5)
            .with_max_output_tokens(64);
        let body = GeminiClient::request_body(&request);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["contents"][0]["parts"][0]["text"], "Hi");
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 64);

        let bare = GeminiClient::request_body(&GenerationRequest::new("Hi"));
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("generationConfig").is_none());
    }

    #[tokio::test]
    async fn malformed_stream_payloads_are_skipped() {
        let server = MockServer::start().await;
        let body = sse_body(&[
            "not json",
            r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]},"finishReason":"STOP"}]}"#,
        ]);

        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:streamGenerateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let client = GeminiClient::new("test-key").with_base_url(server.uri());
        let chunks: Vec<StreamChunk> = client
            .generate_stream(GenerationRequest::new("Hi"))
            .try_collect()
            .await
            .expect("stream should succeed");

        let text: String = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(text, "ok");
    }
}
