//! Builder for creating dumpers.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use secrecy::{ExposeSecret, SecretString};

use super::dumper::Dumper;
use super::echo::EchoFallback;
use super::session::SessionOptions;
use crate::config::DumpConfig;
use crate::error::{ConfigError, Result};
use crate::transport::config::{HostKeyVerification, SshConfig};

/// Builder for constructing a [`Dumper`].
///
/// # Example
///
/// ```rust,no_run
/// use sshdump::{DumpConfig, DumperBuilder};
///
/// # fn example() -> Result<(), sshdump::Error> {
/// let dumper = DumperBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .period_secs(8.0)
///     .commands(DumpConfig::load("config.json")?)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct DumperBuilder {
    host: String,
    port: u16,
    username: Option<String>,
    password: Option<SecretString>,
    timeout: Duration,
    period_secs: f64,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    commands: Option<DumpConfig>,
    options: SessionOptions,
    dumb_authentication: bool,
}

impl DumperBuilder {
    /// Create a new builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: None,
            password: None,
            timeout: Duration::from_secs(5),
            period_secs: 8.0,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            commands: None,
            options: SessionOptions::default(),
            dumb_authentication: false,
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the username for authentication.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the password for authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    /// Set the connection timeout, also used for every prompt read (default: 5s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the cycle period (default: 8s).
    pub fn period(mut self, period: Duration) -> Self {
        self.period_secs = period.as_secs_f64();
        self
    }

    /// Set the cycle period in seconds. Fractions are allowed.
    pub fn period_secs(mut self, secs: f64) -> Self {
        self.period_secs = secs;
        self
    }

    /// Set host key verification mode (default: accept-new).
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a custom known_hosts file instead of `~/.ssh/known_hosts`.
    pub fn known_hosts(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Set the prompts and commands to run.
    pub fn commands(mut self, commands: DumpConfig) -> Self {
        self.commands = Some(commands);
        self
    }

    /// Strip the echoed command line from outputs (default: true).
    pub fn remove_command_echo(mut self, enabled: bool) -> Self {
        self.options.remove_command_echo = enabled;
        self
    }

    /// Strip the matched prompt from outputs (default: true).
    pub fn remove_prompt_echo(mut self, enabled: bool) -> Self {
        self.options.remove_prompt_echo = enabled;
        self
    }

    /// Trim whitespace around each output (default: false).
    pub fn trim_output(mut self, enabled: bool) -> Self {
        self.options.trim_output = enabled;
        self
    }

    /// Log in through shell-printed `Username:`/`Password:` prompts (default: false).
    pub fn dumb_authentication(mut self, enabled: bool) -> Self {
        self.dumb_authentication = enabled;
        self
    }

    /// Remove ANSI escape sequences from everything read (default: false).
    pub fn strip_ansi(mut self, enabled: bool) -> Self {
        self.options.pty.strip_ansi = enabled;
        self
    }

    /// Fail when a prompt does not appear in time (default: false).
    pub fn fail_on_timeout(mut self, enabled: bool) -> Self {
        self.options.pty.fail_on_timeout = enabled;
        self
    }

    /// Keep the whole output when its command echo is missing (default: false).
    pub fn keep_output_without_echo(mut self, enabled: bool) -> Self {
        self.options.echo_fallback = if enabled {
            EchoFallback::KeepOutput
        } else {
            EchoFallback::Discard
        };
        self
    }

    /// Set the preferred terminal dimensions (default: 1024x1024).
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.options.terminal_size = (width, height);
        self
    }

    /// Validate the settings and build the dumper.
    ///
    /// This does not connect. Call [`Dumper::run`] to start.
    pub fn build(self) -> Result<Dumper> {
        let username = self
            .username
            .filter(|u| !u.is_empty())
            .ok_or(ConfigError::MissingCredential { field: "username" })?;
        let password = self
            .password
            .filter(|p| !p.expose_secret().is_empty())
            .ok_or(ConfigError::MissingCredential { field: "password" })?;

        if !self.period_secs.is_finite() || self.period_secs <= 0.0 {
            return Err(ConfigError::InvalidPeriod(self.period_secs).into());
        }
        let period = Duration::try_from_secs_f64(self.period_secs)
            .ok()
            .filter(|p| Instant::now().checked_add(*p).is_some())
            .ok_or(ConfigError::InvalidPeriod(self.period_secs))?;

        if Instant::now().checked_add(self.timeout).is_none() {
            return Err(ConfigError::InvalidTimeout(self.timeout).into());
        }

        let commands = self.commands.ok_or(ConfigError::EmptyCycleCommands {
            source_name: "builder".to_string(),
        })?;

        let mut options = self.options;
        options.pty.timeout = self.timeout;

        let ssh_config = SshConfig {
            host: self.host,
            port: self.port,
            username,
            password,
            timeout: self.timeout,
            host_key_verification: self.host_key_verification,
            known_hosts_path: self.known_hosts_path,
        };

        Ok(Dumper::new(
            ssh_config,
            commands,
            options,
            self.dumb_authentication,
            period,
        ))
    }
}
