//! SSE consumer for the relay endpoint.
//!
//! One streaming GET per submission. Frames are parsed incrementally off the
//! byte stream and forwarded to the UI loop over an unbounded channel.

use anyhow::{Result, bail};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use chatflow_models::{StreamErrorPayload, StreamPayload};

/// Event delivered to the UI loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayEvent {
    /// One text fragment from the relay.
    Fragment(String),
    /// The relay reported an upstream failure.
    Error(String),
    /// The stream ended.
    Closed,
}

/// Handle to an in-flight stream; dropping the task closes the connection.
#[derive(Debug)]
pub struct RelayHandle {
    task: JoinHandle<()>,
}

impl RelayHandle {
    pub fn close(self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    base_url: String,
    client: reqwest::Client,
}

impl RelayClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Open the SSE stream for one prompt, forwarding events to `tx`.
    pub fn open_stream(
        &self,
        prompt: &str,
        tx: mpsc::UnboundedSender<RelayEvent>,
    ) -> RelayHandle {
        let url = format!("{}/gemini/stream", self.base_url);
        let client = self.client.clone();
        let prompt = prompt.to_string();

        let task = tokio::spawn(async move {
            match consume_stream(client, url, prompt, &tx).await {
                Ok(()) => {
                    let _ = tx.send(RelayEvent::Closed);
                }
                Err(err) => {
                    warn!("Relay stream failed: {}", err);
                    let _ = tx.send(RelayEvent::Error(err.to_string()));
                }
            }
        });

        RelayHandle { task }
    }
}

async fn consume_stream(
    client: reqwest::Client,
    url: String,
    prompt: String,
    tx: &mpsc::UnboundedSender<RelayEvent>,
) -> Result<()> {
    let response = client
        .get(&url)
        .query(&[("prompt", prompt.as_str())])
        .send()
        .await?;

    if !response.status().is_success() {
        bail!("relay returned {}", response.status());
    }

    let mut byte_stream = response.bytes_stream();
    let mut buffer = String::new();

    while let Some(chunk_result) = byte_stream.next().await {
        let chunk = chunk_result?;
        buffer.push_str(&String::from_utf8_lossy(&chunk));

        // Process complete SSE frames from buffer
        while let Some(pos) = buffer.find("\n\n") {
            let frame = buffer[..pos].to_string();
            buffer = buffer[pos + 2..].to_string();

            if let Some(event) = parse_frame(&frame) {
                let _ = tx.send(event);
            }
        }
    }

    Ok(())
}

/// Decode one SSE frame into a relay event.
///
/// Malformed JSON payloads are logged and dropped; the stream continues.
fn parse_frame(frame: &str) -> Option<RelayEvent> {
    let mut event_name: Option<&str> = None;
    let mut data = String::new();

    for line in frame.lines() {
        if let Some(name) = line.strip_prefix("event: ") {
            event_name = Some(name.trim());
        } else if let Some(payload) = line.strip_prefix("data: ") {
            data.push_str(payload);
        }
    }

    if data.is_empty() {
        return None;
    }

    match event_name {
        Some("error") => match serde_json::from_str::<StreamErrorPayload>(&data) {
            Ok(payload) => Some(RelayEvent::Error(payload.error)),
            Err(err) => {
                warn!("Error parsing stream error event: {}", err);
                None
            }
        },
        _ => match serde_json::from_str::<StreamPayload>(&data) {
            Ok(payload) => Some(RelayEvent::Fragment(payload.text)),
            Err(err) => {
                warn!("Error parsing stream chunk: {}", err);
                None
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn parses_data_frames() {
        assert_eq!(
            parse_frame(r#"data: {"text":"Hel"}"#),
            Some(RelayEvent::Fragment("Hel".to_string()))
        );
    }

    #[test]
    fn parses_named_error_frames() {
        let frame = "event: error\ndata: {\"error\":\"provider down\"}";
        assert_eq!(
            parse_frame(frame),
            Some(RelayEvent::Error("provider down".to_string()))
        );
    }

    #[test]
    fn malformed_payloads_are_dropped() {
        assert_eq!(parse_frame("data: not json"), None);
        assert_eq!(parse_frame(": keep-alive comment"), None);
        assert_eq!(parse_frame(""), None);
    }

    #[tokio::test]
    async fn forwards_fragments_then_closed() {
        let server = MockServer::start().await;
        let body = concat!(
            "data: {\"text\":\"Hel\"}\n\n",
            "data: {\"text\":\"lo\"}\n\n",
        );

        Mock::given(method("GET"))
            .and(path("/gemini/stream"))
            .and(query_param("prompt", "Hi"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
            .mount(&server)
            .await;

        let relay = RelayClient::new(server.uri());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = relay.open_stream("Hi", tx);

        assert_eq!(rx.recv().await, Some(RelayEvent::Fragment("Hel".to_string())));
        assert_eq!(rx.recv().await, Some(RelayEvent::Fragment("lo".to_string())));
        assert_eq!(rx.recv().await, Some(RelayEvent::Closed));
    }

    #[tokio::test]
    async fn http_failure_surfaces_as_error_event() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gemini/stream"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let relay = RelayClient::new(server.uri());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _handle = relay.open_stream("Hi", tx);

        match rx.recv().await {
            Some(RelayEvent::Error(message)) => assert!(message.contains("500")),
            other => panic!("expected error event, got {:?}", other),
        }
    }
}
