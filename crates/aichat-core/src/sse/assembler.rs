//! Turns framed lines into a growing assistant reply.
//!
//! One [`StreamAssembler`] lives for one stream. It is driven by [`step`]
//! once per body chunk and by [`finish`] when the body ends, and writes the
//! reply into the conversation it is handed on each call.
//!
//! [`step`]: StreamAssembler::step
//! [`finish`]: StreamAssembler::finish

use tracing::{debug, warn};

use super::frame::{classify, decode_delta, FrameAction};
use super::reader::LineReader;
use crate::error::ChatError;
use crate::sink::ChatSink;
use crate::state::ConversationState;

pub const DEFAULT_MAX_REMERGE_ATTEMPTS: u32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Streaming,
    Done,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssemblerOptions {
    /// Consecutive failed re-merges of an undecodable payload before the
    /// stream is abandoned.
    pub max_remerge_attempts: u32,
    /// Treat unterminated text left at end of stream as a final line.
    pub flush_trailing_line: bool,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            max_remerge_attempts: DEFAULT_MAX_REMERGE_ATTEMPTS,
            flush_trailing_line: false,
        }
    }
}

enum LineOutcome {
    Continue,
    Terminate,
    Malformed(serde_json::Error),
}

#[derive(Debug)]
pub struct StreamAssembler {
    reader: LineReader,
    accumulator: String,
    state: StreamState,
    remerge_attempts: u32,
    options: AssemblerOptions,
}

impl Default for StreamAssembler {
    fn default() -> Self {
        Self::new(AssemblerOptions::default())
    }
}

impl StreamAssembler {
    pub fn new(options: AssemblerOptions) -> Self {
        Self {
            reader: LineReader::new(),
            accumulator: String::new(),
            state: StreamState::Streaming,
            remerge_attempts: 0,
            options,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// The reply assembled so far.
    pub fn accumulated(&self) -> &str {
        &self.accumulator
    }

    /// Process one body chunk.
    ///
    /// Returns `Done` once the sentinel is seen; nothing after it is read.
    /// A payload that fails to decode is held back and retried joined with the
    /// text that follows it, starting with the next chunk.
    pub fn step<S: ChatSink + ?Sized>(
        &mut self,
        chunk: &[u8],
        conversation: &mut ConversationState,
        sink: &mut S,
    ) -> Result<StreamState, ChatError> {
        if self.state != StreamState::Streaming {
            return Ok(self.state);
        }

        self.reader.feed(chunk);
        self.drain(conversation, sink)
    }

    /// The body ended. Processes whatever complete lines are still buffered,
    /// then the trailing line if the options ask for it.
    pub fn finish<S: ChatSink + ?Sized>(
        &mut self,
        conversation: &mut ConversationState,
        sink: &mut S,
    ) -> Result<StreamState, ChatError> {
        while self.state == StreamState::Streaming && self.reader.has_complete_line() {
            self.drain(conversation, sink)?;
        }
        if self.state != StreamState::Streaming {
            return Ok(self.state);
        }

        if let Some(line) = self.reader.finish(self.options.flush_trailing_line) {
            if let LineOutcome::Malformed(err) = self.handle_line(&line, conversation, sink) {
                warn!(error = %err, "dropping undecodable payload at end of stream");
            }
        }

        self.state = StreamState::Done;
        Ok(self.state)
    }

    fn drain<S: ChatSink + ?Sized>(
        &mut self,
        conversation: &mut ConversationState,
        sink: &mut S,
    ) -> Result<StreamState, ChatError> {
        while let Some(line) = self.reader.next_line() {
            match self.handle_line(&line, conversation, sink) {
                LineOutcome::Continue => {}
                LineOutcome::Terminate => {
                    debug!(chars = self.accumulator.len(), "stream terminated by sentinel");
                    self.state = StreamState::Done;
                    break;
                }
                LineOutcome::Malformed(err) => {
                    self.remerge_attempts += 1;
                    if self.remerge_attempts > self.options.max_remerge_attempts {
                        warn!(
                            attempts = self.remerge_attempts,
                            error = %err,
                            "giving up on undecodable payload"
                        );
                        self.state = StreamState::Failed;
                        return Err(ChatError::MalformedFrame {
                            attempts: self.remerge_attempts,
                            reason: err.to_string(),
                        });
                    }

                    debug!(
                        attempt = self.remerge_attempts,
                        truncated = err.is_eof(),
                        "payload did not decode, holding it for the next chunk"
                    );
                    self.reader.push_front(&line);
                    break;
                }
            }
        }

        Ok(self.state)
    }

    fn handle_line<S: ChatSink + ?Sized>(
        &mut self,
        line: &str,
        conversation: &mut ConversationState,
        sink: &mut S,
    ) -> LineOutcome {
        let json = match classify(line) {
            FrameAction::Ignore => {
                if !line.trim().is_empty() && !line.starts_with(':') {
                    debug!(line, "ignoring non-data line");
                }
                return LineOutcome::Continue;
            }
            FrameAction::Terminate => return LineOutcome::Terminate,
            FrameAction::Payload(json) => json,
        };

        match decode_delta(json) {
            Ok(Some(delta)) => {
                self.remerge_attempts = 0;
                self.accumulator.push_str(&delta);
                conversation.upsert_assistant(&self.accumulator);
                sink.on_update(conversation.history());
                LineOutcome::Continue
            }
            Ok(None) => {
                self.remerge_attempts = 0;
                debug!("payload without content delta");
                LineOutcome::Continue
            }
            Err(err) => LineOutcome::Malformed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{NullSink, RecordingSink};
    use crate::state::{ChatMessage, ChatRole};

    fn frame(content: &str) -> String {
        let payload = serde_json::json!({ "choices": [{ "delta": { "content": content } }] });
        format!("data: {payload}\n")
    }

    fn conversation() -> ConversationState {
        let mut state = ConversationState::new();
        state.push_user("hi");
        state
    }

    #[test]
    fn test_incremental_accumulation() {
        let mut state = conversation();
        let mut sink = RecordingSink::default();
        let mut assembler = StreamAssembler::default();

        let mut seen = Vec::new();
        for delta in ["Hel", "lo", " world"] {
            assembler
                .step(frame(delta).as_bytes(), &mut state, &mut sink)
                .unwrap();
            seen.push(state.last().unwrap().content.clone());
        }

        assert_eq!(seen, vec!["Hel", "Hello", "Hello world"]);
        assert_eq!(sink.contents(), seen);
        assert_eq!(state.len(), 2);
        assert_eq!(state.history()[1].role, ChatRole::Assistant);
    }

    #[test]
    fn test_sentinel_stops_processing_same_chunk() {
        let mut state = conversation();
        let mut sink = RecordingSink::default();
        let mut assembler = StreamAssembler::default();

        let body = format!("{}data: [DONE]\n{}", frame("a"), frame("b"));
        let result = assembler.step(body.as_bytes(), &mut state, &mut sink);

        assert_eq!(result, Ok(StreamState::Done));
        assert_eq!(state.last().unwrap().content, "a");
        assert_eq!(sink.updates.len(), 1);

        // Later chunks are ignored too
        let result = assembler.step(frame("c").as_bytes(), &mut state, &mut sink);
        assert_eq!(result, Ok(StreamState::Done));
        assert_eq!(state.last().unwrap().content, "a");
    }

    #[test]
    fn test_empty_delta_does_not_mutate_or_notify() {
        let mut state = conversation();
        let mut sink = RecordingSink::default();
        let mut assembler = StreamAssembler::default();

        let body = concat!(
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"\"}}]}\n",
            ": comment\n",
            "\n",
            "event: ping\n",
        );
        assembler.step(body.as_bytes(), &mut state, &mut sink).unwrap();

        assert_eq!(state.history(), &[ChatMessage::user("hi")]);
        assert!(sink.updates.is_empty());
    }

    #[test]
    fn test_split_json_is_remerged() {
        let mut state = conversation();
        let mut sink = RecordingSink::default();
        let mut assembler = StreamAssembler::default();

        let first = "data: {\"choices\":[{\"delta\":{\"content\":\"x\n";
        let second = "\"}}]}\n";

        let result = assembler.step(first.as_bytes(), &mut state, &mut sink);
        assert_eq!(result, Ok(StreamState::Streaming));
        assert!(sink.updates.is_empty());

        assembler.step(second.as_bytes(), &mut state, &mut sink).unwrap();
        assert_eq!(state.last().unwrap().content, "x");
        assert_eq!(sink.updates.len(), 1);

        assembler.step(frame("y").as_bytes(), &mut state, &mut sink).unwrap();
        assert_eq!(state.last().unwrap().content, "xy");
    }

    #[test]
    fn test_split_json_in_one_chunk_resumes_on_next_chunk() {
        let mut state = conversation();
        let mut sink = RecordingSink::default();
        let mut assembler = StreamAssembler::default();

        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"x\n\"}}]}\n";
        assembler.step(body.as_bytes(), &mut state, &mut sink).unwrap();
        assert!(sink.updates.is_empty());

        assembler.step(b"", &mut state, &mut sink).unwrap();
        assert_eq!(state.last().unwrap().content, "x");
    }

    #[test]
    fn test_finish_drains_held_back_payload() {
        let mut state = conversation();
        let mut sink = RecordingSink::default();
        let mut assembler = StreamAssembler::default();

        let body = format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"x\n\"}}}}]}}\n{}",
            frame("z")
        );
        assembler.step(body.as_bytes(), &mut state, &mut sink).unwrap();
        let result = assembler.finish(&mut state, &mut sink);

        assert_eq!(result, Ok(StreamState::Done));
        assert_eq!(state.last().unwrap().content, "xz");
        assert_eq!(sink.contents(), vec!["x", "xz"]);
    }

    #[test]
    fn test_finish_without_sentinel_is_done() {
        let mut state = conversation();
        let mut sink = RecordingSink::default();
        let mut assembler = StreamAssembler::default();

        assembler.step(frame("ok").as_bytes(), &mut state, &mut sink).unwrap();
        assert_eq!(assembler.finish(&mut state, &mut sink), Ok(StreamState::Done));
        assert_eq!(assembler.accumulated(), "ok");
    }

    #[test]
    fn test_trailing_line_is_dropped_unless_flushed() {
        let tail = frame("tail");
        let tail = tail.trim_end();

        let mut state = conversation();
        let mut assembler = StreamAssembler::default();
        assembler.step(tail.as_bytes(), &mut state, &mut NullSink).unwrap();
        assembler.finish(&mut state, &mut NullSink).unwrap();
        assert_eq!(state.len(), 1);

        let mut state = conversation();
        let mut assembler = StreamAssembler::new(AssemblerOptions {
            flush_trailing_line: true,
            ..AssemblerOptions::default()
        });
        assembler.step(tail.as_bytes(), &mut state, &mut NullSink).unwrap();
        assembler.finish(&mut state, &mut NullSink).unwrap();
        assert_eq!(state.last().unwrap().content, "tail");
    }

    #[test]
    fn test_remerge_cap_surfaces_malformed_frame() {
        let mut state = conversation();
        let mut sink = RecordingSink::default();
        let mut assembler = StreamAssembler::new(AssemblerOptions {
            max_remerge_attempts: 2,
            ..AssemblerOptions::default()
        });

        assert_eq!(
            assembler.step(b"data: {oops\n", &mut state, &mut sink),
            Ok(StreamState::Streaming)
        );
        assert_eq!(
            assembler.step(b"still\n", &mut state, &mut sink),
            Ok(StreamState::Streaming)
        );
        let result = assembler.step(b"broken\n", &mut state, &mut sink);

        assert!(matches!(result, Err(ChatError::MalformedFrame { attempts: 3, .. })));
        assert_eq!(assembler.state(), StreamState::Failed);
        assert!(sink.updates.is_empty());
    }

    #[test]
    fn test_successful_decode_resets_remerge_count() {
        let mut state = conversation();
        let mut sink = RecordingSink::default();
        let mut assembler = StreamAssembler::new(AssemblerOptions {
            max_remerge_attempts: 1,
            ..AssemblerOptions::default()
        });

        for delta in ["a", "b", "c"] {
            let line = frame(delta);
            let (head, tail) = line.split_at(line.len() / 2);
            assembler
                .step(format!("{head}\n").as_bytes(), &mut state, &mut sink)
                .unwrap();
            assembler.step(tail.as_bytes(), &mut state, &mut sink).unwrap();
        }

        assert_eq!(state.last().unwrap().content, "abc");
    }

    #[test]
    fn test_multibyte_delta_split_across_chunks() {
        let mut state = conversation();
        let mut sink = RecordingSink::default();
        let mut assembler = StreamAssembler::default();

        let line = frame("café ☕");
        let bytes = line.as_bytes();
        let cut = line.find('☕').unwrap() + 1;
        assembler.step(&bytes[..cut], &mut state, &mut sink).unwrap();
        assembler.step(&bytes[cut..], &mut state, &mut sink).unwrap();

        assert_eq!(state.last().unwrap().content, "café ☕");
    }

    #[test]
    fn test_reply_replaces_not_appends_across_chunks() {
        let mut state = conversation();
        let mut sink = RecordingSink::default();
        let mut assembler = StreamAssembler::default();

        let body = format!("{}{}", frame("ab"), frame("cd"));
        for byte in body.as_bytes() {
            assembler
                .step(std::slice::from_ref(byte), &mut state, &mut sink)
                .unwrap();
        }

        assert_eq!(state.len(), 2);
        assert_eq!(state.last().unwrap().content, "abcd");
    }

    #[test]
    fn test_closure_sink() {
        let mut state = conversation();
        let mut lengths = Vec::new();
        let mut sink = |history: &[ChatMessage]| lengths.push(history.len());
        let mut assembler = StreamAssembler::default();

        assembler.step(frame("a").as_bytes(), &mut state, &mut sink).unwrap();
        assembler.step(frame("b").as_bytes(), &mut state, &mut sink).unwrap();

        assert_eq!(lengths, vec![2, 2]);
    }
}
