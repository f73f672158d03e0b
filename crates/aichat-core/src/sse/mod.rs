//! Server-sent-event style framing of a streamed chat reply.
//!
//! [`LineReader`] turns body chunks into lines; [`StreamAssembler`] turns
//! lines into conversation updates.

pub mod assembler;
pub mod frame;
pub mod reader;

pub use assembler::{AssemblerOptions, StreamAssembler, StreamState};
pub use frame::{classify, decode_delta, FrameAction};
pub use reader::LineReader;
