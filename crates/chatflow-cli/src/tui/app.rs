//! TUI application state

use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::relay::{RelayClient, RelayEvent, RelayHandle};
use crate::session::{ChatSession, SessionPhase};

const IDLE_POLL: Duration = Duration::from_millis(100);

pub struct ChatApp {
    pub input: String,
    pub cursor_position: usize,
    pub session: ChatSession,
    relay: RelayClient,
    event_rx: Option<mpsc::UnboundedReceiver<RelayEvent>>,
    relay_handle: Option<RelayHandle>,
    next_reveal: Option<Instant>,
}

impl ChatApp {
    pub fn new(relay: RelayClient) -> Self {
        Self {
            input: String::new(),
            cursor_position: 0,
            session: ChatSession::new(),
            relay,
            event_rx: None,
            relay_handle: None,
            next_reveal: None,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.session.phase() {
            SessionPhase::Idle => "Ready",
            SessionPhase::Streaming | SessionPhase::Draining => "Streaming...",
        }
    }

    /// Input is disabled while a response is streaming or draining.
    pub fn input_enabled(&self) -> bool {
        !self.session.is_streaming()
    }

    /// Submit the current input: append the user turn and an empty
    /// assistant turn, then open the SSE connection. Ignored while a
    /// stream is in flight or the input is blank.
    pub fn submit(&mut self) {
        let prompt = self.input.clone();
        if !self.session.submit(&prompt) {
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.relay_handle = Some(self.relay.open_stream(&prompt, tx));
        self.event_rx = Some(rx);
        self.input.clear();
        self.cursor_position = 0;
    }

    /// Drain pending relay events without blocking the UI loop.
    pub fn drain_relay_events(&mut self) {
        let Some(rx) = &mut self.event_rx else {
            return;
        };

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }

        for event in events {
            self.handle_relay_event(event);
        }
    }

    fn handle_relay_event(&mut self, event: RelayEvent) {
        match event {
            RelayEvent::Fragment(text) => {
                if !self.session.is_streaming() {
                    return;
                }
                self.session.push_fragment(&text);
                debug!(backlog = self.session.buffer_len(), "Fragment queued");
                self.arm_reveal();
            }
            RelayEvent::Error(err) => {
                warn!("Stream failed: {}", err);
                self.close_stream();
            }
            RelayEvent::Closed => {
                self.close_stream();
            }
        }
    }

    /// Esc: drop the in-flight connection; queued characters still reveal.
    pub fn cancel_streaming(&mut self) {
        if self.session.is_streaming() {
            self.close_stream();
        }
    }

    /// Ctrl+L: discard the conversation and force Idle.
    pub fn clear(&mut self) {
        if let Some(handle) = self.relay_handle.take() {
            handle.close();
        }
        self.event_rx = None;
        self.session.clear();
        self.next_reveal = None;
    }

    fn close_stream(&mut self) {
        if let Some(handle) = self.relay_handle.take() {
            handle.close();
        }
        self.event_rx = None;
        self.session.upstream_closed();
    }

    /// How long the UI loop may block waiting for terminal events.
    pub fn poll_timeout(&self) -> Duration {
        match self.next_reveal {
            Some(at) => at.saturating_duration_since(Instant::now()),
            None => IDLE_POLL,
        }
    }

    /// Fire the reveal tick when due: pop exactly one character, then
    /// re-arm from the remaining backlog.
    pub fn reveal_if_due(&mut self) {
        let Some(at) = self.next_reveal else {
            return;
        };
        if Instant::now() < at {
            return;
        }

        self.session.reveal_next();
        self.next_reveal = self
            .session
            .reveal_delay()
            .map(|delay| Instant::now() + delay);
    }

    fn arm_reveal(&mut self) {
        if self.next_reveal.is_none()
            && let Some(delay) = self.session.reveal_delay()
        {
            self.next_reveal = Some(Instant::now() + delay);
        }
    }

    fn char_to_byte_idx(&self, char_idx: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_idx)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.input.len())
    }

    pub fn enter_char(&mut self, c: char) {
        let byte_idx = self.char_to_byte_idx(self.cursor_position);
        self.input.insert(byte_idx, c);
        self.cursor_position += 1;
    }

    pub fn delete_char(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
            let byte_idx = self.char_to_byte_idx(self.cursor_position);
            self.input.remove(byte_idx);
        }
    }

    pub fn move_cursor_left(&mut self) {
        if self.cursor_position > 0 {
            self.cursor_position -= 1;
        }
    }

    pub fn move_cursor_right(&mut self) {
        let char_count = self.input.chars().count();
        if self.cursor_position < char_count {
            self.cursor_position += 1;
        }
    }

    /// Input text up to the cursor, for column math in the renderer.
    pub fn input_before_cursor(&self) -> &str {
        let byte_idx = self.char_to_byte_idx(self.cursor_position);
        &self.input[..byte_idx]
    }
}
