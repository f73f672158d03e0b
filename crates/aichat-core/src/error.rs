use thiserror::Error;

/// Why a chat stream did not complete.
///
/// The `Display` text is what ends up in the conversation as the assistant's
/// reply.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("Payment required. Please add credits.")]
    PaymentRequired,

    /// Non-success status other than 429 and 402.
    #[error("Failed to start stream")]
    StreamStartFailure { status: u16 },

    /// A payload kept failing to decode after `attempts` re-merges.
    #[error("Received a malformed response from the chat service")]
    MalformedFrame { attempts: u32, reason: String },

    /// Sending the request or reading the body failed.
    #[error("An error occurred: {0}")]
    TransportFailure(String),
}

impl ChatError {
    pub fn from_status(status: u16) -> Self {
        match status {
            429 => ChatError::RateLimited,
            402 => ChatError::PaymentRequired,
            status => ChatError::StreamStartFailure { status },
        }
    }

    pub fn transport(err: impl std::fmt::Display) -> Self {
        ChatError::TransportFailure(err.to_string())
    }
}
