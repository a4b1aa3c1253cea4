//! Raw shell transport.
//!
//! The session core only needs a byte pipe to an interactive shell: request
//! a PTY, write bytes, read bytes with a deadline, close. [`SshTransport`] is
//! the production implementation on top of russh.

pub mod config;
#[cfg(test)]
pub(crate) mod mock;
mod ssh;

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

pub use config::{HostKeyVerification, SshConfig};
pub use ssh::SshTransport;

use crate::error::TransportError;

/// Result alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Bidirectional byte stream to a remote interactive shell.
///
/// Implementations own their connection exclusively; none of these methods
/// are called concurrently.
pub trait Transport: Send {
    /// Request a pseudo-terminal of the given size and start a shell on it.
    fn request_shell(
        &mut self,
        term: &str,
        width: u32,
        height: u32,
    ) -> impl Future<Output = TransportResult<()>> + Send;

    /// Write raw bytes to the shell.
    fn write(&mut self, data: &[u8]) -> impl Future<Output = TransportResult<()>> + Send;

    /// Read up to `max_bytes`, waiting until data arrives or `deadline` passes.
    ///
    /// An empty chunk without error means the deadline passed. A chunk may
    /// carry both data and an error when the stream failed after a partial
    /// read.
    fn read(
        &mut self,
        max_bytes: usize,
        deadline: Instant,
    ) -> impl Future<Output = ReadChunk> + Send;

    /// Close the connection.
    fn close(&mut self) -> impl Future<Output = TransportResult<()>> + Send;
}

/// Outcome of a single [`Transport::read`].
#[derive(Debug, Default)]
pub struct ReadChunk {
    /// Bytes received, possibly empty.
    pub data: Bytes,

    /// Error that ended the read, if any.
    pub error: Option<TransportError>,
}

impl ReadChunk {
    /// A successful read.
    pub fn data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            error: None,
        }
    }

    /// A read that hit its deadline with nothing to return.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A read that failed, keeping whatever arrived first.
    pub fn failed(data: impl Into<Bytes>, error: TransportError) -> Self {
        Self {
            data: data.into(),
            error: Some(error),
        }
    }
}

/// Roughly 30 years, the same horizon tokio uses for an unreachable deadline.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `start + after`, clamped to a far-future instant instead of overflowing.
pub fn deadline_after(start: Instant, after: Duration) -> Instant {
    start
        .checked_add(after)
        .or_else(|| start.checked_add(FAR_FUTURE))
        .unwrap_or(start)
}
