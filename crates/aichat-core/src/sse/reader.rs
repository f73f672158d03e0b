//! Newline framing over a chunked byte stream.
//!
//! Chunks may split lines, and UTF-8 characters, at any byte. Incomplete
//! code units are carried over to the next chunk; complete text waits in
//! `pending` until a `\n` arrives.

use tracing::debug;

#[derive(Debug, Default)]
pub struct LineReader {
    /// Decoded text that does not yet end in a newline.
    pending: String,
    /// Trailing bytes of a multi-byte character cut off by a chunk boundary.
    partial: Vec<u8>,
}

impl LineReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `chunk` and append it to the pending text.
    pub fn feed(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }

        let mut bytes = std::mem::take(&mut self.partial);
        bytes.extend_from_slice(chunk);

        let mut input: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    self.pending.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, rest) = input.split_at(err.valid_up_to());
                    self.pending.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        // Invalid sequence in the middle of the input
                        Some(len) => {
                            self.pending.push(char::REPLACEMENT_CHARACTER);
                            input = &rest[len..];
                        }
                        // Incomplete sequence at the end, wait for more bytes
                        None => {
                            self.partial = rest.to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Take the next complete line out of the pending text, without its
    /// `\n` or a trailing `\r`.
    pub fn next_line(&mut self) -> Option<String> {
        let newline = self.pending.find('\n')?;
        let mut line: String = self.pending.drain(..=newline).collect();
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }

    /// Feed a chunk and return every line it completed.
    pub fn next_lines(&mut self, chunk: &[u8]) -> Vec<String> {
        self.feed(chunk);
        std::iter::from_fn(|| self.next_line()).collect()
    }

    /// Put text back in front of the pending text.
    ///
    /// No separator is inserted, so the text joins whatever follows it.
    pub fn push_front(&mut self, text: &str) {
        self.pending.insert_str(0, text);
    }

    pub fn has_complete_line(&self) -> bool {
        self.pending.contains('\n')
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// End of stream. Returns the unterminated remainder as a last line when
    /// `flush` is set; otherwise it is dropped.
    pub fn finish(&mut self, flush: bool) -> Option<String> {
        if !self.partial.is_empty() {
            let tail = std::mem::take(&mut self.partial);
            self.pending.push_str(&String::from_utf8_lossy(&tail));
        }

        let rest = std::mem::take(&mut self.pending);
        if rest.is_empty() {
            return None;
        }
        if flush {
            Some(rest)
        } else {
            debug!(bytes = rest.len(), "dropping unterminated trailing line");
            None
        }
    }
}
