use std::io::{self, Write};

use aichat_core::{ChatMessage, ChatRole, ChatSink};
use colored::*;

/// Prints the assistant's reply as it streams in.
///
/// Only the text added since the last update is written, so the reply
/// appears incrementally on one line of output.
pub struct TerminalSink<W: Write> {
    out: W,
    /// Index of the assistant message being printed.
    current: Option<usize>,
    /// Bytes of that message already printed.
    printed: usize,
    failed: bool,
}

impl TerminalSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            current: None,
            printed: 0,
            failed: false,
        }
    }

    pub fn failed(&self) -> bool {
        self.failed
    }

    /// Reset between turns. Ends the reply line if one was started.
    pub fn finish_turn(&mut self) {
        if self.current.take().is_some() {
            let _ = writeln!(self.out);
        }
        self.printed = 0;
        self.failed = false;
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChatSink for TerminalSink<W> {
    fn on_update(&mut self, history: &[ChatMessage]) {
        let index = history.len().saturating_sub(1);
        let Some(last) = history.last() else {
            return;
        };
        if last.role != ChatRole::Assistant {
            return;
        }

        if self.current != Some(index) {
            if self.current.is_some() {
                let _ = writeln!(self.out);
            }
            let _ = write!(self.out, "{} ", "AI:".bold().green());
            self.current = Some(index);
            self.printed = 0;
        }

        match last.content.get(self.printed..) {
            Some(new_text) => {
                let _ = write!(self.out, "{}", new_text);
            }
            // Content was rewritten rather than extended
            None => {
                let _ = write!(self.out, "\n{}", last.content);
            }
        }
        self.printed = last.content.len();
        let _ = self.out.flush();
    }

    fn on_error(&mut self, _message: &str) {
        self.failed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(updates: &[Vec<ChatMessage>]) -> String {
        colored::control::set_override(false);
        let mut sink = TerminalSink::new(Vec::new());
        for history in updates {
            sink.on_update(history);
        }
        sink.finish_turn();
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_prints_only_new_text() {
        let user = ChatMessage::user("hi");
        let out = render(&[
            vec![user.clone()],
            vec![user.clone(), ChatMessage::assistant("Hel")],
            vec![user.clone(), ChatMessage::assistant("Hello")],
            vec![user, ChatMessage::assistant("Hello world")],
        ]);
        assert_eq!(out, "AI: Hello world\n");
    }

    #[test]
    fn test_error_message_starts_new_line() {
        let user = ChatMessage::user("hi");
        let out = render(&[
            vec![user.clone(), ChatMessage::assistant("par")],
            vec![
                user,
                ChatMessage::assistant("par"),
                ChatMessage::assistant("An error occurred: reset"),
            ],
        ]);
        assert_eq!(out, "AI: par\nAI: An error occurred: reset\n");
    }

    #[test]
    fn test_on_error_marks_turn_failed() {
        let mut sink = TerminalSink::new(Vec::new());
        sink.on_error("Failed to start stream");
        assert!(sink.failed());
        sink.finish_turn();
        assert!(!sink.failed());
    }
}
