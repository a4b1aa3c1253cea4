//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use log::{debug, trace, warn};
use russh::client::{self, Handle, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;
use tokio::time::Instant;

use super::config::{HostKeyVerification, SshConfig};
use super::{ReadChunk, Transport, TransportResult, deadline_after};
use crate::error::TransportError;

/// Keepalive interval for long-lived dump sessions.
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// SSH transport wrapping a russh client session and one shell channel.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    /// The interactive shell channel, once requested.
    channel: Option<Channel<Msg>>,

    /// Data received but not yet handed out by `read`.
    pending: BytesMut,

    /// Timeout for connect and channel request replies.
    timeout: Duration,

    closed: bool,
}

impl SshTransport {
    /// Connect to the SSH server and authenticate with the configured password.
    pub async fn connect(config: &SshConfig) -> TransportResult<Self> {
        let ssh_config = Arc::new(client::Config {
            inactivity_timeout: None,
            keepalive_interval: Some(KEEPALIVE_INTERVAL),
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification,
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        debug!("connecting to {}", config.socket_addr());

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|e| {
            // Prefer the detailed host-key error over russh's generic UnknownKey
            let stored = host_key_error
                .lock()
                .ok()
                .and_then(|mut slot| slot.take());
            stored.unwrap_or(TransportError::ConnectionFailed {
                host: config.host.clone(),
                port: config.port,
                source: e,
            })
        })?;

        let auth = session
            .authenticate_password(&config.username, config.password.expose_secret())
            .await?;

        if !auth.success() {
            return Err(TransportError::AuthenticationFailed {
                user: config.username.clone(),
            });
        }

        debug!("authenticated as '{}'", config.username);

        Ok(Self {
            session,
            channel: None,
            pending: BytesMut::with_capacity(4096),
            timeout: config.timeout,
            closed: false,
        })
    }

    /// Request a PTY and a shell on a fresh channel, waiting for both replies.
    async fn start_shell(
        channel: &mut Channel<Msg>,
        pending: &mut BytesMut,
        term: &str,
        width: u32,
        height: u32,
        timeout: Duration,
    ) -> TransportResult<()> {
        channel
            .request_pty(true, term, width, height, 0, 0, &[])
            .await?;
        if !wait_for_reply(channel, pending, timeout).await? {
            return Err(TransportError::ShellRefused { width, height });
        }

        channel.request_shell(true).await?;
        if !wait_for_reply(channel, pending, timeout).await? {
            return Err(TransportError::ShellRefused { width, height });
        }

        Ok(())
    }

    fn take_pending(&mut self, max_bytes: usize) -> Bytes {
        let n = self.pending.len().min(max_bytes);
        self.pending.split_to(n).freeze()
    }
}

impl Transport for SshTransport {
    async fn request_shell(&mut self, term: &str, width: u32, height: u32) -> TransportResult<()> {
        let mut channel = self.session.channel_open_session().await?;

        match Self::start_shell(
            &mut channel,
            &mut self.pending,
            term,
            width,
            height,
            self.timeout,
        )
        .await
        {
            Ok(()) => {
                debug!("shell open ({} {}x{})", term, width, height);
                self.channel = Some(channel);
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = channel.close().await {
                    trace!("closing refused channel: {}", close_err);
                }
                Err(e)
            }
        }
    }

    async fn write(&mut self, data: &[u8]) -> TransportResult<()> {
        let channel = self.channel.as_ref().ok_or(TransportError::NoShell)?;
        channel.data(data).await?;
        trace!("wrote {} bytes", data.len());
        Ok(())
    }

    async fn read(&mut self, max_bytes: usize, deadline: Instant) -> ReadChunk {
        if !self.pending.is_empty() {
            return ReadChunk::data(self.take_pending(max_bytes));
        }

        let Some(channel) = self.channel.as_mut() else {
            return ReadChunk::failed(Bytes::new(), TransportError::NoShell);
        };

        loop {
            match tokio::time::timeout_at(deadline, channel.wait()).await {
                Err(_) => return ReadChunk::empty(),
                Ok(Some(ChannelMsg::Data { data }))
                | Ok(Some(ChannelMsg::ExtendedData { data, .. })) => {
                    self.pending.extend_from_slice(&data);
                    let n = self.pending.len().min(max_bytes);
                    return ReadChunk::data(self.pending.split_to(n).freeze());
                }
                Ok(msg) if msg.as_ref().is_none_or(ends_stream) => {
                    let rest = self.pending.split().freeze();
                    return ReadChunk::failed(rest, TransportError::Disconnected);
                }
                Ok(other) => trace!("ignoring channel message: {:?}", other),
            }
        }
    }

    async fn close(&mut self) -> TransportResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        if let Some(channel) = self.channel.take() {
            if let Err(e) = channel.eof().await {
                trace!("channel eof on close: {}", e);
            }
        }

        self.session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await?;
        debug!("disconnected");
        Ok(())
    }
}

/// Wait for the reply to a `want_reply` channel request.
///
/// Returns `Ok(false)` if the server refused. Shell output that races ahead
/// of the reply is kept in `pending`.
async fn wait_for_reply(
    channel: &mut Channel<Msg>,
    pending: &mut BytesMut,
    timeout: Duration,
) -> TransportResult<bool> {
    let deadline = deadline_after(Instant::now(), timeout);
    loop {
        match tokio::time::timeout_at(deadline, channel.wait()).await {
            Err(_) => return Err(TransportError::Timeout(timeout)),
            Ok(Some(ChannelMsg::Success)) => return Ok(true),
            Ok(Some(ChannelMsg::Failure)) => return Ok(false),
            Ok(Some(ChannelMsg::Data { data }))
            | Ok(Some(ChannelMsg::ExtendedData { data, .. })) => {
                pending.extend_from_slice(&data);
            }
            Ok(msg) if msg.as_ref().is_none_or(ends_stream) => {
                return Err(TransportError::Disconnected);
            }
            Ok(other) => trace!("ignoring channel message: {:?}", other),
        }
    }
}

/// Whether the server is done sending on this channel.
fn ends_stream(msg: &ChannelMsg) -> bool {
    matches!(msg, ChannelMsg::Eof | ChannelMsg::Close)
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Stores a detailed host-key error so connect() can surface it
    /// instead of the generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Check the host key against known_hosts.
    ///
    /// Returns `Ok(true)` if matched, `Ok(false)` if host not found,
    /// `Err(TransportError::HostKeyChanged)` if key changed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> Result<bool, TransportError> {
        let result = match self.known_hosts_path {
            Some(ref path) => {
                russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
            }
            None => russh::keys::check_known_hosts(&self.host, self.port, pubkey),
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    /// Save a new host key to known_hosts.
    fn learn_host_key(&self, pubkey: &PublicKey) -> Result<(), TransportError> {
        let result = match self.known_hosts_path {
            Some(ref path) => russh::keys::known_hosts::learn_known_hosts_path(
                &self.host, self.port, pubkey, path,
            ),
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey),
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        match self.host_key_verification {
            HostKeyVerification::Disabled => Ok(true),

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    Ok(true)
                }
                Err(e) => Ok(self.reject(e)),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => Ok(true),
                Ok(false) => Ok(self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                })),
                Err(e) => Ok(self.reject(e)),
            },
        }
    }
}
