//! Conversation store — ordered history and typing flag for one chat session.
//!
//! DESIGN
//! ======
//! Append-only. Ids are ordinals handed out by the store, so insertion
//! order, id order and display order coincide. Nothing here is persisted.

use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Assistant,
}

/// A single chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub text: String,
    pub sender: Sender,
}

/// Point-in-time copy of the conversation, published to observers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub is_typing: bool,
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
    is_typing: bool,
    next_id: u64,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with one assistant greeting.
    #[must_use]
    pub fn with_greeting(greeting: &str) -> Self {
        let mut store = Self::new();
        store.append_assistant_message(greeting);
        store
    }

    /// Append a user message. Empty or whitespace-only text is ignored.
    pub fn append_user_message(&mut self, text: &str) -> Option<Message> {
        if text.trim().is_empty() {
            return None;
        }
        Some(self.push(text, Sender::User))
    }

    pub fn append_assistant_message(&mut self, text: &str) -> Message {
        self.push(text, Sender::Assistant)
    }

    pub fn set_typing(&mut self, flag: bool) {
        self.is_typing = flag;
    }

    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.is_typing
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> ConversationState {
        ConversationState { messages: self.messages.clone(), is_typing: self.is_typing }
    }

    fn push(&mut self, text: &str, sender: Sender) -> Message {
        let message = Message { id: self.next_id, text: text.to_string(), sender };
        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }
}

#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;
