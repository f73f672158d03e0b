//! Frame classification and payload decoding.

use serde::Deserialize;
use serde_json::Value;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// What to do with one framed line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameAction<'a> {
    /// Comment, blank, or a field other than `data`.
    Ignore,
    /// Trimmed JSON text following `data: `.
    Payload(&'a str),
    /// `data: [DONE]`
    Terminate,
}

pub fn classify(line: &str) -> FrameAction<'_> {
    if line.starts_with(':') || line.trim().is_empty() {
        return FrameAction::Ignore;
    }

    let Some(rest) = line.strip_prefix(DATA_PREFIX) else {
        return FrameAction::Ignore;
    };

    let payload = rest.trim();
    if payload == DONE_SENTINEL {
        FrameAction::Terminate
    } else {
        FrameAction::Payload(payload)
    }
}

/// Streaming chunk of an OpenAI-compatible chat completion.
///
/// Every field is optional: a chunk without a text delta (role header,
/// finish reason, usage, keep-alive) is valid and carries nothing to render.
#[derive(Debug, Default, Deserialize)]
pub struct StreamChunk {
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamChoice {
    #[serde(default)]
    pub delta: Option<StreamDelta>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StreamDelta {
    #[serde(default)]
    pub content: Option<String>,
}

impl StreamChunk {
    /// `choices[0].delta.content`, if present and non-empty.
    pub fn into_content(self) -> Option<String> {
        self.choices
            .into_iter()
            .next()?
            .delta?
            .content
            .filter(|content| !content.is_empty())
    }
}

/// Decode a payload into its text delta.
///
/// Fails only when `json` is not a JSON document. Documents of an unexpected
/// shape decode to `None`, the same as a chunk with no content.
pub fn decode_delta(json: &str) -> Result<Option<String>, serde_json::Error> {
    let value: Value = serde_json::from_str(json)?;
    Ok(serde_json::from_value::<StreamChunk>(value)
        .ok()
        .and_then(StreamChunk::into_content))
}
