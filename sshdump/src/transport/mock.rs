//! Scripted in-memory transport for unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use super::{ReadChunk, Transport, TransportResult};
use crate::error::TransportError;

/// Something observable the session did to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Event {
    Shell(u32, u32),
    Write(String),
    Read(String),
    Closed,
}

struct Rule {
    input: String,
    output: Vec<(Duration, Bytes)>,
    once: bool,
    used: bool,
}

#[derive(Default)]
struct State {
    inbox: VecDeque<(Instant, Bytes)>,
    rules: Vec<Rule>,
    events: Vec<Event>,
    refuse_shells: usize,
    fail_writes: bool,
    fail_when_drained: bool,
}

/// Transport that replays scripted output in response to writes.
///
/// Unscripted writes produce no output, which looks like a hung device.
#[derive(Clone, Default)]
pub(crate) struct MockTransport {
    state: Arc<Mutex<State>>,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Queue output that is available immediately, such as a banner.
    pub(crate) fn push_output(&self, data: &str) {
        self.state()
            .inbox
            .push_back((Instant::now(), Bytes::copy_from_slice(data.as_bytes())));
    }

    /// Queue output that becomes available after `delay`.
    pub(crate) fn push_output_after(&self, delay: Duration, data: &str) {
        self.state()
            .inbox
            .push_back((Instant::now() + delay, Bytes::copy_from_slice(data.as_bytes())));
    }

    /// Reply with `output` every time exactly `input` is written.
    pub(crate) fn respond(&self, input: &str, output: &[&str]) {
        self.add_rule(input, output, false);
    }

    /// Reply with `output` the first time exactly `input` is written.
    pub(crate) fn respond_once(&self, input: &str, output: &[&str]) {
        self.add_rule(input, output, true);
    }

    fn add_rule(&self, input: &str, output: &[&str], once: bool) {
        self.state().rules.push(Rule {
            input: input.to_string(),
            output: output
                .iter()
                .map(|s| (Duration::ZERO, Bytes::copy_from_slice(s.as_bytes())))
                .collect(),
            once,
            used: false,
        });
    }

    /// Refuse the next `n` shell requests.
    pub(crate) fn refuse_shells(&self, n: usize) {
        self.state().refuse_shells = n;
    }

    /// Make every write fail.
    pub(crate) fn fail_writes(&self) {
        self.state().fail_writes = true;
    }

    /// Report a disconnect once all queued output has been read.
    pub(crate) fn fail_when_drained(&self) {
        self.state().fail_when_drained = true;
    }

    pub(crate) fn events(&self) -> Vec<Event> {
        self.state().events.clone()
    }

    pub(crate) fn writes(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Write(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state().events.contains(&Event::Closed)
    }
}

impl Transport for MockTransport {
    async fn request_shell(&mut self, _term: &str, width: u32, height: u32) -> TransportResult<()> {
        let mut state = self.state();
        state.events.push(Event::Shell(width, height));
        if state.refuse_shells > 0 {
            state.refuse_shells -= 1;
            return Err(TransportError::ShellRefused { width, height });
        }
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> TransportResult<()> {
        let mut state = self.state();
        if state.fail_writes {
            return Err(TransportError::Disconnected);
        }

        let text = String::from_utf8_lossy(data).to_string();
        state.events.push(Event::Write(text.clone()));

        let now = Instant::now();
        let mut replies = Vec::new();
        if let Some(rule) = state
            .rules
            .iter_mut()
            .find(|r| r.input == text && !(r.once && r.used))
        {
            rule.used = true;
            replies.extend(rule.output.iter().map(|(d, b)| (now + *d, b.clone())));
        }
        state.inbox.extend(replies);
        Ok(())
    }

    async fn read(&mut self, max_bytes: usize, deadline: Instant) -> ReadChunk {
        let (next, fail_when_drained) = {
            let state = self.state();
            (
                state.inbox.front().map(|(ready, _)| *ready),
                state.fail_when_drained,
            )
        };

        match next {
            Some(ready) if ready <= deadline => {
                tokio::time::sleep_until(ready).await;
                let mut state = self.state();
                let Some((ready, mut data)) = state.inbox.pop_front() else {
                    return ReadChunk::empty();
                };
                if data.len() > max_bytes {
                    let rest = data.split_off(max_bytes);
                    state.inbox.push_front((ready, rest));
                }
                state
                    .events
                    .push(Event::Read(String::from_utf8_lossy(&data).to_string()));
                ReadChunk::data(data)
            }
            None if fail_when_drained => {
                ReadChunk::failed(Bytes::new(), TransportError::Disconnected)
            }
            _ => {
                tokio::time::sleep_until(deadline).await;
                ReadChunk::empty()
            }
        }
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.state().events.push(Event::Closed);
        Ok(())
    }
}
