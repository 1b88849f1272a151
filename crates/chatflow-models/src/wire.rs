//! Wire payloads carried in the relay's SSE data fields.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// One streamed text fragment: `{ "text": ... }`
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct StreamPayload {
    pub text: String,
}

impl StreamPayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Payload of the relay's named `error` event: `{ "error": ... }`
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct StreamErrorPayload {
    pub error: String,
}

impl StreamErrorPayload {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_payload_round_trips() {
        let payload = StreamPayload::new("Hel");
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"text":"Hel"}"#);

        let parsed: StreamPayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, payload);
    }
}
