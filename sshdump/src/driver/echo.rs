//! Command echo removal.
//!
//! A PTY echoes every command back before its output. The echo is cut by
//! looking for the exact line that was written, as a literal.

use memchr::memmem;

/// What to return when the written line does not appear in the output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EchoFallback {
    /// Return an empty string, discarding the whole capture.
    ///
    /// This is the historical behavior and existing consumers of the output
    /// file may depend on it.
    #[default]
    Discard,

    /// Return the capture unchanged.
    KeepOutput,
}

/// The exact line written for `command`: trailing newlines trimmed, one added.
pub fn command_line(command: &str) -> String {
    format!("{}\n", command.trim_end_matches('\n'))
}

/// Return everything after the first literal occurrence of `line` in `output`.
///
/// Later occurrences are kept as they are. When `line` does not occur,
/// `fallback` decides the result.
pub fn strip_command_echo(output: &str, line: &str, fallback: EchoFallback) -> String {
    match memmem::find(output.as_bytes(), line.as_bytes()) {
        Some(pos) => output[pos + line.len()..].to_string(),
        None => match fallback {
            EchoFallback::Discard => String::new(),
            EchoFallback::KeepOutput => output.to_string(),
        },
    }
}
