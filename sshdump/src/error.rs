//! Error types for sshdump.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for sshdump operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration or credential errors, raised before connecting
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel (prompt reader) errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session lifecycle errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Result sink errors
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),
}

impl Error {
    /// Whether this error is the result of a cancellation request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Session(SessionError::Cancelled))
    }
}

/// Configuration errors (command file, flags, credentials).
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Config file is not valid JSON for the expected shape
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No cycle commands were configured
    #[error("missing or empty \"cycle_commands\" field in {source_name}")]
    EmptyCycleCommands { source_name: String },

    /// A prompt pattern failed to compile
    #[error("Invalid prompt pattern '{pattern}': {source}")]
    InvalidPrompt {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Cycle period is zero, negative, not finite or too large
    #[error("Invalid cycle period: {0}")]
    InvalidPeriod(f64),

    /// Timeout is too large to compute a deadline from
    #[error("Invalid timeout: {0:?}")]
    InvalidTimeout(Duration),

    /// A required credential is missing or empty
    #[error("{field} missing or empty")]
    MissingCredential { field: &'static str },
}

/// Transport layer errors (connection, authentication, raw I/O).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: russh::Error,
    },

    /// SSH protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host is not in known_hosts (strict verification)
    #[error("Host key for {host}:{port} is not known")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key does not match known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// The remote refused the PTY or shell request
    #[error("Shell request refused ({width}x{height})")]
    ShellRefused { width: u32, height: u32 },

    /// Operation attempted before a shell was opened
    #[error("No shell channel open")]
    NoShell,

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

/// Channel layer errors (prompt synchronization).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The transport failed mid-read; `partial` holds what was buffered.
    #[error("Read failed after {} buffered bytes: {source}", partial.len())]
    ReadFailed {
        partial: String,
        #[source]
        source: TransportError,
    },

    /// No prompt matched before the deadline
    #[error("Prompt not found within {timeout:?}")]
    PatternTimeout { timeout: Duration, partial: String },
}

/// Session lifecycle errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Operation is not valid in the current state
    #[error("Cannot {operation} in state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// The session was asked to stop
    #[error("Session cancelled")]
    Cancelled,
}

/// Result sink errors.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The record could not be serialized
    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The record could not be appended to the output file
    #[error("Failed to append to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type alias using sshdump's Error.
pub type Result<T> = std::result::Result<T, Error>;
