use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::Sse;
use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use serde::Deserialize;
use tracing::{info, warn};

use chatflow_ai::GenerationRequest;
use chatflow_models::{StreamErrorPayload, StreamPayload};

use crate::api::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    pub prompt: String,
}

// GET /gemini/stream?prompt=...
//
// Republishes each upstream fragment as one SSE data event `{"text": ...}`.
// Upstream failure yields a single named `error` event, then the stream
// closes.
pub async fn stream_generate(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(prompt_chars = query.prompt.chars().count(), "Opening generation stream");

    let llm = state.llm.clone();
    let request = GenerationRequest::new(query.prompt);

    let stream = async_stream::stream! {
        if llm.supports_streaming() {
            let mut upstream = llm.generate_stream(request);
            while let Some(chunk) = upstream.next().await {
                match chunk {
                    Ok(chunk) => {
                        if !chunk.text.is_empty() {
                            yield text_event(chunk.text);
                        }
                    }
                    Err(err) => {
                        warn!("Upstream generation failed: {}", err);
                        yield error_event(err.to_string());
                        return;
                    }
                }
            }
        } else {
            // One-shot fallback for providers without incremental output
            match llm.generate(request).await {
                Ok(response) => {
                    if !response.text.is_empty() {
                        yield text_event(response.text);
                    }
                }
                Err(err) => {
                    warn!("Upstream generation failed: {}", err);
                    yield error_event(err.to_string());
                }
            }
        }
    };

    Sse::new(stream)
}

fn text_event(text: String) -> Result<Event, Infallible> {
    Ok(Event::default()
        .json_data(StreamPayload::new(text))
        .unwrap())
}

fn error_event(message: String) -> Result<Event, Infallible> {
    Ok(Event::default()
        .event("error")
        .json_data(StreamErrorPayload::new(message))
        .unwrap())
}
