//! A conversation bound to a client and a selected model.

use tracing::debug;

use crate::client::ChatClient;
use crate::sink::ChatSink;
use crate::sse::StreamState;
use crate::state::ConversationState;

pub struct ChatSession {
    client: ChatClient,
    conversation: ConversationState,
    model: String,
}

impl ChatSession {
    pub fn new(client: ChatClient, model: impl Into<String>) -> Self {
        Self {
            client,
            conversation: ConversationState::new(),
            model: model.into(),
        }
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Send a user message and stream the reply.
    ///
    /// Blank input is ignored and returns `None`. `&mut self` keeps a second
    /// send from starting while a reply is still streaming.
    pub async fn send<S: ChatSink + ?Sized>(
        &mut self,
        input: &str,
        sink: &mut S,
    ) -> Option<StreamState> {
        if input.trim().is_empty() {
            return None;
        }

        self.conversation.push_user(input);
        sink.on_update(self.conversation.history());

        debug!(model = %self.model, turns = self.conversation.len(), "sending chat message");
        let state = self
            .client
            .stream_chat(&mut self.conversation, &self.model, sink)
            .await;
        Some(state)
    }

    /// Forget the conversation so far.
    pub fn clear(&mut self) {
        self.conversation.clear();
    }
}
