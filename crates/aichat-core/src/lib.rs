pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod session;
pub mod settings;
pub mod sink;
pub mod sse;
pub mod state;

// Re-export main types for convenience
pub use client::ChatClient;
pub use config::Config;
pub use error::ChatError;
pub use models::{ModelFamily, ModelOption, DEFAULT_MODEL};
pub use session::ChatSession;
pub use settings::{ApiKeys, FileSettingsStore, MemorySettingsStore, SettingsError, SettingsStore};
pub use sink::{ChatSink, NullSink};
pub use sse::{AssemblerOptions, LineReader, StreamAssembler, StreamState};
pub use state::{ChatMessage, ChatRole, ConversationState};
