//! Prompt-synchronized channel over a raw shell transport.

use std::time::Duration;

use log::{trace, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::buffer::{AnsiStripper, PatternBuffer};
use super::patterns::PromptSet;
use crate::error::{ChannelError, Result, SessionError};
use crate::transport::{Transport, deadline_after};

/// Largest chunk requested from the transport per read.
pub const DEFAULT_MAX_CHUNK: usize = 65536;

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Deadline for each prompt read, measured from the start of the call.
    pub timeout: Duration,

    /// Maximum bytes requested per transport read.
    pub max_chunk: usize,

    /// Remove ANSI escape sequences from everything read.
    pub strip_ansi: bool,

    /// Treat a read that ends without a prompt match as an error.
    pub fail_on_timeout: bool,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_chunk: DEFAULT_MAX_CHUNK,
            strip_ansi: false,
            fail_on_timeout: false,
        }
    }
}

/// Result of a read operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadResult {
    /// The text that was read, with the matched prompt removed if requested.
    pub data: String,

    /// Index of the prompt pattern that matched, `None` if the read timed out.
    pub matched: Option<usize>,
}

impl ReadResult {
    /// Whether the deadline passed without any prompt matching.
    pub fn timed_out(&self) -> bool {
        self.matched.is_none()
    }
}

/// A shell transport plus the prompt-synchronizing reader on top of it.
///
/// Every write to the shell is followed by exactly one
/// [`read_until_prompt`](Self::read_until_prompt).
pub struct PtyChannel<T> {
    transport: T,
    config: PtyConfig,
    ansi: Option<AnsiStripper>,
    cancel: CancellationToken,
}

impl<T: Transport> PtyChannel<T> {
    /// Create a new channel over an open transport.
    pub fn new(transport: T, config: PtyConfig, cancel: CancellationToken) -> Self {
        let ansi = config.strip_ansi.then(AnsiStripper::new);
        Self {
            transport,
            config,
            ansi,
            cancel,
        }
    }

    /// Write raw text to the shell.
    pub async fn send(&mut self, text: &str) -> Result<()> {
        self.transport.write(text.as_bytes()).await?;
        Ok(())
    }

    /// Read until a prompt matches, using the configured timeout.
    pub async fn read_until_prompt(
        &mut self,
        prompts: &PromptSet,
        strip_matched: bool,
    ) -> Result<ReadResult> {
        self.read_until_prompt_within(prompts, strip_matched, self.config.timeout)
            .await
    }

    /// Read until one of `prompts` matches or `timeout` elapses.
    ///
    /// Patterns are tried in order against the whole accumulated buffer and
    /// the first match wins. With `strip_matched`, every occurrence of that one
    /// pattern is removed from the returned text.
    ///
    /// A timeout is not an error unless `fail_on_timeout` is set: the text
    /// buffered so far is returned with `matched == None`. A transport failure
    /// returns [`ChannelError::ReadFailed`] carrying the partial buffer.
    pub async fn read_until_prompt_within(
        &mut self,
        prompts: &PromptSet,
        strip_matched: bool,
        timeout: Duration,
    ) -> Result<ReadResult> {
        let deadline = deadline_after(Instant::now(), timeout);
        let mut buffer = PatternBuffer::new();
        let mut matched = None;

        while Instant::now() < deadline {
            let chunk = tokio::select! {
                _ = self.cancel.cancelled() => return Err(SessionError::Cancelled.into()),
                chunk = self.transport.read(self.config.max_chunk, deadline) => chunk,
            };

            if !chunk.data.is_empty() {
                trace!("read {} bytes: {:?}", chunk.data.len(), chunk.data);
                match self.ansi.as_mut() {
                    Some(ansi) => buffer.extend(&ansi.strip(&chunk.data)),
                    None => buffer.extend(&chunk.data),
                }
            }

            if let Some(source) = chunk.error {
                return Err(ChannelError::ReadFailed {
                    partial: buffer.as_str_lossy().into_owned(),
                    source,
                }
                .into());
            }

            if chunk.data.is_empty() {
                continue;
            }

            if let Some(index) = prompts.first_match(buffer.as_slice()) {
                matched = Some(index);
                break;
            }
        }

        let data = match matched {
            Some(index) if strip_matched => {
                String::from_utf8_lossy(&prompts.strip(index, buffer.as_slice())).into_owned()
            }
            _ => buffer.as_str_lossy().into_owned(),
        };

        if matched.is_none() {
            if self.config.fail_on_timeout {
                return Err(ChannelError::PatternTimeout {
                    timeout,
                    partial: data,
                }
                .into());
            }
            warn!(
                "no prompt matched within {:?}, keeping {} buffered bytes",
                timeout,
                data.len()
            );
        }

        Ok(ReadResult { data, matched })
    }

    /// Get a mutable reference to the underlying transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, TransportError};
    use crate::transport::mock::MockTransport;

    fn channel(mock: &MockTransport, timeout_secs: u64) -> PtyChannel<MockTransport> {
        let config = PtyConfig {
            timeout: Duration::from_secs(timeout_secs),
            ..Default::default()
        };
        PtyChannel::new(mock.clone(), config, CancellationToken::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_on_first_prompt_match() {
        let mock = MockTransport::new();
        mock.push_output("show version\nCisco IOS ");
        mock.push_output("Software\nrouter# ");
        mock.push_output("never read");

        let mut ch = channel(&mock, 5);
        let start = Instant::now();
        let result = ch.read_until_prompt(&PromptSet::new(), false).await.unwrap();

        assert_eq!(result.data, "show version\nCisco IOS Software\nrouter# ");
        assert_eq!(result.matched, Some(0));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_strips_matched_prompt() {
        let mock = MockTransport::new();
        mock.push_output("show version\r\nCisco IOS Software\r\nrouter# ");

        let mut ch = channel(&mock, 5);
        let result = ch.read_until_prompt(&PromptSet::new(), true).await.unwrap();
        assert_eq!(result.data, "show version\nCisco IOS Software\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_earliest_pattern_wins_and_only_it_is_stripped() {
        let prompts = PromptSet::from_patterns([r"router# ", r"(?m)^MARK$"]).unwrap();
        let mock = MockTransport::new();
        mock.push_output("MARK\nrouter# ");

        let mut ch = channel(&mock, 5);
        let result = ch.read_until_prompt(&prompts, true).await.unwrap();
        assert_eq!(result.matched, Some(0));
        assert_eq!(result.data, "MARK\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_delayed_prompt() {
        let mock = MockTransport::new();
        mock.push_output("partial output\n");
        mock.push_output_after(Duration::from_millis(1500), "router# ");

        let mut ch = channel(&mock, 5);
        let start = Instant::now();
        let result = ch.read_until_prompt(&PromptSet::new(), true).await.unwrap();

        assert_eq!(result.data, "partial output\n");
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(1500) && elapsed < Duration::from_millis(1510));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_returns_partial_buffer_without_error() {
        let mock = MockTransport::new();
        mock.push_output("show version\nCisco IOS");

        let mut ch = channel(&mock, 2);
        let start = Instant::now();
        let result = ch.read_until_prompt(&PromptSet::new(), true).await.unwrap();

        assert!(result.timed_out());
        assert_eq!(result.data, "show version\nCisco IOS");
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_secs(2) && elapsed < Duration::from_millis(2010));
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_timeout_does_not_overflow() {
        let mock = MockTransport::new();
        mock.push_output("router# ");
        let config = PtyConfig {
            timeout: Duration::from_secs(u64::MAX),
            ..Default::default()
        };
        let mut ch = PtyChannel::new(mock.clone(), config, CancellationToken::new());
        let result = ch.read_until_prompt(&PromptSet::new(), true).await.unwrap();
        assert_eq!(result.matched, Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_with_nothing_read_is_empty() {
        let mock = MockTransport::new();
        let mut ch = channel(&mock, 1);
        let result = ch.read_until_prompt(&PromptSet::new(), true).await.unwrap();
        assert_eq!(result.data, "");
        assert!(result.timed_out());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fail_on_timeout() {
        let mock = MockTransport::new();
        mock.push_output("hung");
        let config = PtyConfig {
            timeout: Duration::from_secs(1),
            fail_on_timeout: true,
            ..Default::default()
        };
        let mut ch = PtyChannel::new(mock.clone(), config, CancellationToken::new());

        let err = ch.read_until_prompt(&PromptSet::new(), true).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Channel(ChannelError::PatternTimeout { ref partial, .. }) if partial == "hung"
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_error_returns_partial_buffer() {
        let mock = MockTransport::new();
        mock.push_output("half a line");
        mock.fail_when_drained();

        let mut ch = channel(&mock, 5);
        let err = ch.read_until_prompt(&PromptSet::new(), true).await.unwrap_err();
        match err {
            Error::Channel(ChannelError::ReadFailed { partial, source }) => {
                assert_eq!(partial, "half a line");
                assert!(matches!(source, TransportError::Disconnected));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_respects_max_chunk() {
        let mock = MockTransport::new();
        mock.push_output("abcdef$ ");
        let config = PtyConfig {
            max_chunk: 3,
            ..Default::default()
        };
        let mut ch = PtyChannel::new(mock.clone(), config, CancellationToken::new());
        let result = ch.read_until_prompt(&PromptSet::new(), false).await.unwrap();

        assert_eq!(result.data, "abcdef$ ");
        let reads = mock
            .events()
            .into_iter()
            .filter(|e| matches!(e, crate::transport::mock::Event::Read(_)))
            .count();
        assert_eq!(reads, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_strip_ansi() {
        let mock = MockTransport::new();
        mock.push_output("\x1b[1mbold\x1b[0m\r\n\x1b[32mhost\x1b[0m$ ");
        let config = PtyConfig {
            strip_ansi: true,
            ..Default::default()
        };
        let mut ch = PtyChannel::new(mock.clone(), config, CancellationToken::new());
        let result = ch.read_until_prompt(&PromptSet::new(), true).await.unwrap();
        assert_eq!(result.data, "bold\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_read() {
        let mock = MockTransport::new();
        let cancel = CancellationToken::new();
        let mut ch = PtyChannel::new(mock.clone(), PtyConfig::default(), cancel.clone());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            cancel.cancel();
        });

        let start = Instant::now();
        let err = ch.read_until_prompt(&PromptSet::new(), true).await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
