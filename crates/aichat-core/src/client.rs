//! HTTP client for the streaming chat endpoint.

use anyhow::Result;
use futures_util::StreamExt;
use reqwest::header;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::ChatError;
use crate::sink::ChatSink;
use crate::sse::{AssemblerOptions, StreamAssembler, StreamState};
use crate::state::{ChatMessage, ConversationState};

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    model: &'a str,
}

#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    options: AssemblerOptions,
}

impl ChatClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
            options: AssemblerOptions::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.chat_endpoint.clone(),
            options: config.assembler_options(),
        })
    }

    pub fn with_options(mut self, options: AssemblerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send the whole history and stream the reply into `conversation`.
    ///
    /// The reply grows in a trailing assistant message, with `sink` told after
    /// every change. Failures do not escape: the error text is appended as one
    /// assistant message, `sink.on_error` fires, and `Failed` is returned.
    pub async fn stream_chat<S: ChatSink + ?Sized>(
        &self,
        conversation: &mut ConversationState,
        model: &str,
        sink: &mut S,
    ) -> StreamState {
        match self.run_stream(conversation, model, sink).await {
            Ok(state) => state,
            Err(err) => {
                warn!(error = ?err, endpoint = %self.endpoint, "chat stream failed");
                let message = err.to_string();
                conversation.push(ChatMessage::assistant(message.as_str()));
                sink.on_update(conversation.history());
                sink.on_error(&message);
                StreamState::Failed
            }
        }
    }

    async fn run_stream<S: ChatSink + ?Sized>(
        &self,
        conversation: &mut ConversationState,
        model: &str,
        sink: &mut S,
    ) -> Result<StreamState, ChatError> {
        let request = ChatRequest {
            messages: conversation.history(),
            model,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "text/event-stream")
            .json(&request)
            .send()
            .await
            .map_err(ChatError::transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::from_status(status.as_u16()));
        }
        debug!(%status, model, "chat stream opened");

        let mut assembler = StreamAssembler::new(self.options);
        let mut body = response.bytes_stream();

        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(ChatError::transport)?;
            if assembler.step(&chunk, conversation, sink)? == StreamState::Done {
                return Ok(StreamState::Done);
            }
        }

        assembler.finish(conversation, sink)
    }
}
