//! Receiver for conversation updates while a reply streams in.

use crate::state::ChatMessage;

/// Implemented by the UI layer.
pub trait ChatSink {
    /// Called after every change to the history.
    fn on_update(&mut self, history: &[ChatMessage]);

    /// Called once when a stream ends in failure, after the error message
    /// has been appended to the history.
    fn on_error(&mut self, _message: &str) {}
}

impl<F> ChatSink for F
where
    F: FnMut(&[ChatMessage]),
{
    fn on_update(&mut self, history: &[ChatMessage]) {
        self(history)
    }
}

/// Discards every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ChatSink for NullSink {
    fn on_update(&mut self, _history: &[ChatMessage]) {}
}

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingSink {
    pub updates: Vec<Vec<ChatMessage>>,
    pub errors: Vec<String>,
}

#[cfg(test)]
impl RecordingSink {
    /// Content of the last message at each update.
    pub fn contents(&self) -> Vec<String> {
        self.updates
            .iter()
            .filter_map(|history| history.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[cfg(test)]
impl ChatSink for RecordingSink {
    fn on_update(&mut self, history: &[ChatMessage]) {
        self.updates.push(history.to_vec());
    }

    fn on_error(&mut self, message: &str) {
        self.errors.push(message.to_string());
    }
}
