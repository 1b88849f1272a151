//! Chat session: conversation, stream buffer, and reveal timing.
//!
//! The session is the single owner of client-side state. Incoming SSE
//! fragments are queued character-by-character in the stream buffer; the UI
//! loop drains the buffer one character per reveal tick and appends it to
//! the in-progress assistant turn.

use std::collections::VecDeque;
use std::time::Duration;

use chatflow_models::Conversation;

const REVEAL_BASE_MS: u64 = 30;
const REVEAL_FLOOR_MS: u64 = 5;

/// Lifecycle of one submission.
///
/// Idle: input enabled, no connection. Streaming: connection open, buffer
/// filling and draining. Draining: upstream closed but characters are still
/// queued; input stays disabled until the buffer empties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Streaming,
    Draining,
}

/// Reveal delay for the current backlog: `max(5, 30 - len/2)` milliseconds.
/// Reveal accelerates as the backlog grows.
pub fn reveal_interval(backlog: usize) -> Duration {
    let ms = REVEAL_BASE_MS
        .saturating_sub((backlog / 2) as u64)
        .max(REVEAL_FLOOR_MS);
    Duration::from_millis(ms)
}

#[derive(Debug)]
pub struct ChatSession {
    conversation: Conversation,
    buffer: VecDeque<char>,
    phase: SessionPhase,
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            conversation: Conversation::new(),
            buffer: VecDeque::new(),
            phase: SessionPhase::Idle,
        }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// True from submission until the upstream closes AND the buffer drains.
    pub fn is_streaming(&self) -> bool {
        self.phase != SessionPhase::Idle
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Start a new exchange. Returns false (and appends nothing) when the
    /// prompt is blank or a stream is already in flight.
    pub fn submit(&mut self, prompt: &str) -> bool {
        if self.phase != SessionPhase::Idle || prompt.trim().is_empty() {
            return false;
        }

        self.conversation.push_user(prompt);
        self.conversation.begin_assistant();
        self.buffer.clear();
        self.phase = SessionPhase::Streaming;
        true
    }

    /// Queue an incoming fragment for reveal.
    pub fn push_fragment(&mut self, text: &str) {
        self.buffer.extend(text.chars());
    }

    /// One reveal tick: pop a single character and append it to the last
    /// assistant turn. Returns true when a character was revealed. A tick
    /// against a missing or wrong-role last turn leaves state unchanged.
    pub fn reveal_next(&mut self) -> bool {
        let Some(ch) = self.buffer.pop_front() else {
            self.settle();
            return false;
        };

        let revealed = self.conversation.append_to_assistant(ch);
        self.settle();
        revealed
    }

    /// Upstream completed or failed; the connection is gone. The session
    /// returns to Idle as soon as the backlog is revealed.
    pub fn upstream_closed(&mut self) {
        if self.phase == SessionPhase::Streaming {
            self.phase = if self.buffer.is_empty() {
                SessionPhase::Idle
            } else {
                SessionPhase::Draining
            };
        }
    }

    /// Reset: discard the conversation and buffer, force Idle.
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.buffer.clear();
        self.phase = SessionPhase::Idle;
    }

    /// Delay until the next reveal tick, or None when the buffer is empty
    /// and no tick should be scheduled.
    pub fn reveal_delay(&self) -> Option<Duration> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(reveal_interval(self.buffer.len()))
        }
    }

    fn settle(&mut self) {
        if self.phase == SessionPhase::Draining && self.buffer.is_empty() {
            self.phase = SessionPhase::Idle;
        }
    }
}
