//! Periodic command dumping.

use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::schedule::Schedule;
use super::session::{Session, SessionOptions};
use crate::config::DumpConfig;
use crate::error::{Result, SessionError};
use crate::sink::Sink;
use crate::transport::{SshConfig, Transport};

/// Connects to one device and dumps the cycle commands every period.
///
/// Built with [`DumperBuilder`](super::DumperBuilder).
#[derive(Debug, Clone)]
pub struct Dumper {
    ssh: SshConfig,
    config: DumpConfig,
    options: SessionOptions,
    dumb_authentication: bool,
    period: Duration,
}

impl Dumper {
    pub(crate) fn new(
        ssh: SshConfig,
        config: DumpConfig,
        options: SessionOptions,
        dumb_authentication: bool,
        period: Duration,
    ) -> Self {
        Self {
            ssh,
            config,
            options,
            dumb_authentication,
            period,
        }
    }

    pub fn ssh_config(&self) -> &SshConfig {
        &self.ssh
    }

    pub fn config(&self) -> &DumpConfig {
        &self.config
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Connect over SSH and run until an error or `cancel` fires.
    ///
    /// Cancellation is a clean exit and returns `Ok(())`. The connection is
    /// closed on every path once it has been opened.
    pub async fn run<S: Sink>(&self, sink: &mut S, cancel: CancellationToken) -> Result<()> {
        info!("connecting to {}", self.ssh.socket_addr());
        let session = match Session::connect(&self.ssh, self.options.clone(), cancel.clone()).await
        {
            Err(e) if e.is_cancelled() => {
                info!("cancelled before the connection was established");
                return Ok(());
            }
            session => session?,
        };
        self.drive(session, sink, &cancel).await
    }

    /// Run over an already open transport.
    pub async fn run_with<T: Transport, S: Sink>(
        &self,
        transport: T,
        sink: &mut S,
        cancel: CancellationToken,
    ) -> Result<()> {
        let session = Session::new(transport, self.options.clone(), cancel.clone());
        self.drive(session, sink, &cancel).await
    }

    async fn drive<T: Transport, S: Sink>(
        &self,
        mut session: Session<T>,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let result = self.cycle(&mut session, sink, cancel).await;
        let closed = session.close().await;

        match result {
            Err(e) if e.is_cancelled() => {
                info!("cancelled, connection closed");
                closed
            }
            Err(e) => {
                if let Err(close_err) = closed {
                    warn!("failed to close connection: {}", close_err);
                }
                Err(e)
            }
            Ok(()) => closed,
        }
    }

    async fn cycle<T: Transport, S: Sink>(
        &self,
        session: &mut Session<T>,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let prompts = &self.config.prompts;

        session.open_shell().await?;
        if self.dumb_authentication {
            session
                .authenticate(&self.ssh.username, &self.ssh.password)
                .await?;
        }
        session.drain_banner(prompts).await?;
        session
            .run_setup(prompts, &self.config.setup_commands)
            .await?;
        info!(
            "setup done, dumping {} commands every {:?}",
            self.config.cycle_commands.len(),
            self.period
        );

        let mut schedule = Schedule::new(Instant::now(), self.period);
        loop {
            let now = Instant::now();
            let tick = schedule.next_tick(now);
            if tick.at <= now {
                debug!("previous cycle overran the period, starting now");
            }
            if tick.skipped > 0 {
                warn!("cycle overran the period, skipped {} ticks", tick.skipped);
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(SessionError::Cancelled.into()),
                _ = tokio::time::sleep_until(tick.at) => {}
            }

            let outputs = session
                .run_cycle(prompts, &self.config.cycle_commands)
                .await?;
            sink.emit(&outputs).await?;
        }
    }
}
