//! Conversation model: an append-only list of user/assistant turns.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, Serialize, Deserialize, TS, PartialEq, Eq)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Single turn in a conversation
#[derive(Debug, Clone, Serialize, Deserialize, TS, PartialEq)]
#[ts(export)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Empty assistant turn, filled in as the stream is revealed.
    pub fn assistant() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
        }
    }
}

/// Ordered sequence of turns. Append-only during a session; cleared
/// wholesale by an explicit reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(Turn::user(content));
    }

    /// Open an empty assistant turn for the response being streamed.
    pub fn begin_assistant(&mut self) {
        self.turns.push(Turn::assistant());
    }

    /// Append one revealed character to the in-progress assistant turn.
    ///
    /// Returns false and leaves the conversation unchanged when the last
    /// turn is missing or not an assistant turn, so a stale reveal tick
    /// cannot corrupt the turn list.
    pub fn append_to_assistant(&mut self, ch: char) -> bool {
        match self.turns.last_mut() {
            Some(turn) if turn.role == Role::Assistant => {
                turn.content.push(ch);
                true
            }
            _ => false,
        }
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.last()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_reaches_open_assistant_turn() {
        let mut conversation = Conversation::new();
        conversation.push_user("Hi");
        conversation.begin_assistant();

        for ch in "Hello".chars() {
            assert!(conversation.append_to_assistant(ch));
        }

        assert_eq!(conversation.turns().len(), 2);
        assert_eq!(conversation.last().unwrap().content, "Hello");
        assert_eq!(conversation.last().unwrap().role, Role::Assistant);
    }

    #[test]
    fn append_is_noop_without_assistant_turn() {
        let mut conversation = Conversation::new();
        assert!(!conversation.append_to_assistant('x'));

        conversation.push_user("Hi");
        assert!(!conversation.append_to_assistant('x'));
        assert_eq!(conversation.last().unwrap().content, "Hi");
    }

    #[test]
    fn clear_discards_all_turns() {
        let mut conversation = Conversation::new();
        conversation.push_user("Hi");
        conversation.begin_assistant();
        conversation.clear();

        assert!(conversation.is_empty());
        assert!(!conversation.append_to_assistant('x'));
    }

    #[test]
    fn roles_serialize_lowercase() {
        let turn = Turn::user("Hi");
        let json = serde_json::to_string(&turn).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"Hi"}"#);
    }
}
