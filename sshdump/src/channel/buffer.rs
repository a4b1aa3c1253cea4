//! Accumulating read buffer with terminal normalization.
//!
//! Raw shell output has no framing, so every chunk is normalized as it
//! arrives: NUL bytes are dropped and CRLF becomes LF. Normalization is
//! per chunk, so a CR at the very end of one chunk is kept even if the next
//! chunk starts with LF.

use std::fmt;

/// Accumulates normalized shell output for prompt matching.
#[derive(Debug, Default)]
pub struct PatternBuffer {
    buffer: Vec<u8>,
}

impl PatternBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
        }
    }

    /// Normalize a chunk and append it.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(&normalize(data));
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the buffer contents as a string (lossy UTF-8 conversion).
    pub fn as_str_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.buffer)
    }
}

/// Drop NUL bytes, then rewrite CRLF as LF.
pub fn normalize(data: &[u8]) -> Vec<u8> {
    let without_nul: Vec<u8> = data.iter().copied().filter(|&b| b != 0).collect();

    let mut out = Vec::with_capacity(without_nul.len());
    let mut bytes = without_nul.iter().copied().peekable();
    while let Some(b) = bytes.next() {
        if b == b'\r' && bytes.peek() == Some(&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

/// Removes ANSI escape sequences from a byte stream.
///
/// Parser state is kept between calls so a sequence split across two reads
/// is still removed.
pub struct AnsiStripper {
    parser: vte::Parser,
}

impl AnsiStripper {
    pub fn new() -> Self {
        Self {
            parser: vte::Parser::new(),
        }
    }

    /// Strip escape sequences from `data`, keeping printable text,
    /// newlines, carriage returns and tabs.
    pub fn strip(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(data.len());
        let mut performer = Printable { out: &mut out };
        self.parser.advance(&mut performer, data);
        out
    }
}

impl Default for AnsiStripper {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AnsiStripper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnsiStripper").finish_non_exhaustive()
    }
}

struct Printable<'a> {
    out: &'a mut Vec<u8>,
}

impl vte::Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out.extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte);
        }
    }
}
