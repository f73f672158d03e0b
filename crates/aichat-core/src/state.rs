//! UI-agnostic conversation state
//!
//! These types are shared by every front end (terminal, sidebar, etc.) and
//! don't depend on any specific UI framework. A [`ConversationState`] is owned
//! by whoever created it; a stream borrows it mutably for its whole duration.

use serde::{Deserialize, Serialize};

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered chat history.
///
/// Append-only, except that the trailing assistant message may have its
/// content replaced while a stream is writing into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    history: Vec<ChatMessage>,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.history.last()
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.history.push(message);
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.push(ChatMessage::user(content));
    }

    /// Write the full accumulated reply into the conversation.
    ///
    /// Replaces the content of the trailing assistant message when there is
    /// one, otherwise opens a new assistant message. `accumulated` is the
    /// whole reply so far, not a delta.
    pub fn upsert_assistant(&mut self, accumulated: &str) {
        match self.history.last_mut() {
            Some(last) if last.role == ChatRole::Assistant => {
                last.content.clear();
                last.content.push_str(accumulated);
            }
            _ => self.push(ChatMessage::assistant(accumulated)),
        }
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }
}
