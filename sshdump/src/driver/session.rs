//! Interactive shell session lifecycle.

use std::fmt;

use chrono::Local;
use log::{debug, warn};
use secrecy::SecretString;
use tokio_util::sync::CancellationToken;

use super::auth::terminal_login;
use super::echo::{EchoFallback, command_line, strip_command_echo};
use crate::channel::{PromptSet, PtyChannel, PtyConfig};
use crate::error::{Result, SessionError};
use crate::output::{CommandOutput, CommandOutputs};
use crate::transport::{SshConfig, SshTransport, Transport};

/// Lifecycle of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No transport yet.
    Disconnected,
    /// Transport open, no shell.
    Connected,
    /// PTY shell granted.
    ShellReady,
    /// Terminal login in progress or done, banner not yet drained.
    Authenticating,
    /// Banner drained and setup commands run.
    SetupDone,
    /// At least one cycle has run.
    Cycling,
    /// Transport closed.
    Terminated,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connected => "connected",
            SessionState::ShellReady => "shell-ready",
            SessionState::Authenticating => "authenticating",
            SessionState::SetupDone => "setup-done",
            SessionState::Cycling => "cycling",
            SessionState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Options controlling how a session talks to the shell.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Reader behavior (timeout, chunk size, ANSI stripping).
    pub pty: PtyConfig,

    /// Terminal type sent with the PTY request.
    pub terminal_type: String,

    /// Preferred PTY size (width, height).
    pub terminal_size: (u32, u32),

    /// PTY size to retry with if the preferred size is refused.
    pub fallback_terminal_size: (u32, u32),

    /// Strip the matched prompt from captured output.
    pub remove_prompt_echo: bool,

    /// Strip the echoed command line from captured output.
    pub remove_command_echo: bool,

    /// What echo removal returns when the command line is not found.
    pub echo_fallback: EchoFallback,

    /// Trim leading and trailing whitespace from each output.
    pub trim_output: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            pty: PtyConfig::default(),
            terminal_type: "xterm".to_string(),
            terminal_size: (1024, 1024),
            fallback_terminal_size: (80, 24),
            remove_prompt_echo: true,
            remove_command_echo: true,
            echo_fallback: EchoFallback::default(),
            trim_output: false,
        }
    }
}

/// A shell session driven through prompt synchronization.
///
/// The session owns its transport until [`close`](Self::close).
pub struct Session<T> {
    channel: PtyChannel<T>,
    options: SessionOptions,
    state: SessionState,
}

impl Session<SshTransport> {
    /// Open an SSH connection and wrap it in a session.
    pub async fn connect(
        config: &SshConfig,
        options: SessionOptions,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let transport = tokio::select! {
            _ = cancel.cancelled() => return Err(SessionError::Cancelled.into()),
            transport = SshTransport::connect(config) => transport?,
        };
        debug!("session: {} -> {}", SessionState::Disconnected, SessionState::Connected);
        Ok(Self::new(transport, options, cancel))
    }
}

impl<T: Transport> Session<T> {
    /// Wrap an already open transport.
    pub fn new(transport: T, options: SessionOptions, cancel: CancellationToken) -> Self {
        Self {
            channel: PtyChannel::new(transport, options.pty.clone(), cancel),
            options,
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            debug!("session: {} -> {}", self.state, to);
            self.state = to;
        }
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state.to_string(),
            }
            .into())
        }
    }

    /// Request the PTY shell, retrying once at the fallback size.
    pub async fn open_shell(&mut self) -> Result<()> {
        self.require("open a shell", &[SessionState::Connected])?;

        let term = self.options.terminal_type.clone();
        let (width, height) = self.options.terminal_size;
        let transport = self.channel.transport_mut();

        if let Err(e) = transport.request_shell(&term, width, height).await {
            let (width, height) = self.options.fallback_terminal_size;
            warn!("shell request refused ({}), retrying at {}x{}", e, width, height);
            transport.request_shell(&term, width, height).await?;
        }

        self.transition(SessionState::ShellReady);
        Ok(())
    }

    /// Log in through username/password prompts printed by the shell.
    pub async fn authenticate(&mut self, username: &str, password: &SecretString) -> Result<()> {
        self.require("authenticate", &[SessionState::ShellReady])?;
        self.transition(SessionState::Authenticating);
        terminal_login(&mut self.channel, username, password).await
    }

    /// Read and discard everything up to the first prompt (banner, MOTD).
    pub async fn drain_banner(&mut self, prompts: &PromptSet) -> Result<String> {
        self.require(
            "drain the banner",
            &[SessionState::ShellReady, SessionState::Authenticating],
        )?;
        let banner = self
            .channel
            .read_until_prompt(prompts, self.options.remove_prompt_echo)
            .await?;
        debug!("session: drained {} banner bytes", banner.data.len());
        Ok(banner.data)
    }

    /// Run each setup command once, discarding its output.
    pub async fn run_setup(&mut self, prompts: &PromptSet, commands: &[String]) -> Result<()> {
        self.require(
            "run setup commands",
            &[SessionState::ShellReady, SessionState::Authenticating],
        )?;
        for command in commands {
            debug!("setup: {:?}", command);
            self.channel.send(&command_line(command)).await?;
            self.channel
                .read_until_prompt(prompts, self.options.remove_prompt_echo)
                .await?;
        }
        self.transition(SessionState::SetupDone);
        Ok(())
    }

    /// Run one command and return its cleaned output.
    pub async fn run_command(&mut self, prompts: &PromptSet, command: &str) -> Result<String> {
        self.require(
            "run a command",
            &[SessionState::SetupDone, SessionState::Cycling],
        )?;
        let line = command_line(command);
        self.channel.send(&line).await?;

        let read = self
            .channel
            .read_until_prompt(prompts, self.options.remove_prompt_echo)
            .await?;

        let mut output = read.data;
        if self.options.remove_command_echo {
            output = strip_command_echo(&output, &line, self.options.echo_fallback);
        }
        if self.options.trim_output {
            output = output.trim().to_string();
        }
        Ok(output)
    }

    /// Run every cycle command in order and collect one batch.
    pub async fn run_cycle(
        &mut self,
        prompts: &PromptSet,
        commands: &[String],
    ) -> Result<CommandOutputs> {
        self.require(
            "run a cycle",
            &[SessionState::SetupDone, SessionState::Cycling],
        )?;
        self.transition(SessionState::Cycling);

        let mut outputs = CommandOutputs::new(Local::now());
        for command in commands {
            let output = self.run_command(prompts, command).await?;
            debug!("cycle: {:?} -> {} bytes", command, output.len());
            outputs.push(CommandOutput::new(command.as_str(), output));
        }
        Ok(outputs)
    }

    /// Close the transport. Safe to call more than once.
    pub async fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Terminated {
            return Ok(());
        }
        self.transition(SessionState::Terminated);
        self.channel.transport_mut().close().await?;
        Ok(())
    }
}
