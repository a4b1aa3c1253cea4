//! Channel layer: prompt synchronization over a raw shell stream.
//!
//! Shell output has no message boundaries. This module accumulates reads,
//! normalizes terminal artifacts and decides when the remote side is ready
//! for the next command by matching prompt patterns.

mod buffer;
mod patterns;
mod pty;

pub use buffer::{AnsiStripper, PatternBuffer, normalize};
pub use patterns::{DEFAULT_PROMPT, LOGIN_PROMPT, PromptSet};
pub use pty::{DEFAULT_MAX_CHUNK, PtyChannel, PtyConfig, ReadResult};
