//! Command-line entry point.
//!
//! ```bash
//! SSHDUMP_PASSWORD=secret sshdump --host 192.168.1.1 --username admin \
//!     --config-path config.json --output-path ssh_output.jsonl --period 8
//! ```
//!
//! Set `RUST_LOG=debug` for verbose output. Ctrl-C stops after closing the
//! connection.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use log::{error, info};
use tokio_util::sync::CancellationToken;

use sshdump::{DumpConfig, DumperBuilder, HostKeyVerification, JsonLinesSink, Result};

/// Periodically run commands over an interactive SSH shell and record the outputs.
#[derive(Parser, Debug)]
#[command(name = "sshdump")]
#[command(version)]
struct Args {
    /// Host to connect to.
    #[arg(long, default_value = "localhost")]
    host: String,

    /// SSH port.
    #[arg(long, default_value_t = 22)]
    port: u16,

    /// Connect and per-read timeout in seconds.
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// Username for authentication.
    #[arg(long, env = "SSHDUMP_USERNAME")]
    username: Option<String>,

    /// Password for authentication.
    #[arg(long, env = "SSHDUMP_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Cycle period in seconds. Fractions are allowed.
    #[arg(long, default_value_t = 8.0)]
    period: f64,

    /// JSON file with prompts, setup commands and cycle commands.
    #[arg(long, default_value = "config.json")]
    config_path: PathBuf,

    /// JSON Lines file the cycle results are appended to.
    #[arg(long, default_value = "ssh_output.jsonl")]
    output_path: PathBuf,

    /// Remove the echoed command from each output.
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    remove_command_echo: bool,

    /// Remove the matched prompt from each output.
    #[arg(long, default_value_t = true, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    remove_prompt_echo: bool,

    /// Trim leading and trailing whitespace from each output.
    #[arg(long, default_value_t = false, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    trim_output: bool,

    /// Log in through `Username:`/`Password:` prompts printed by the shell.
    #[arg(long, default_value_t = false, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    dumb_authentication: bool,

    /// Remove ANSI escape sequences from everything read.
    #[arg(long, default_value_t = false, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    strip_ansi: bool,

    /// Stop with an error when a prompt does not appear within the timeout.
    #[arg(long, default_value_t = false, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    fail_on_timeout: bool,

    /// Keep the whole output when the command echo is not found, instead of recording nothing.
    #[arg(long, default_value_t = false, action = ArgAction::Set, num_args = 0..=1, default_missing_value = "true")]
    keep_output_without_echo: bool,

    /// Host key checking mode.
    #[arg(long, value_enum, default_value_t = HostKeyMode::AcceptNew)]
    host_key_verification: HostKeyMode,

    /// Custom known_hosts file.
    #[arg(long)]
    known_hosts: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum HostKeyMode {
    /// Reject hosts missing from known_hosts.
    Strict,
    /// Learn unknown hosts, reject changed keys.
    AcceptNew,
    /// Accept any key.
    Disabled,
}

impl From<HostKeyMode> for HostKeyVerification {
    fn from(mode: HostKeyMode) -> Self {
        match mode {
            HostKeyMode::Strict => HostKeyVerification::Strict,
            HostKeyMode::AcceptNew => HostKeyVerification::AcceptNew,
            HostKeyMode::Disabled => HostKeyVerification::Disabled,
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    // Config problems must surface before any connection attempt
    let commands = DumpConfig::load(&args.config_path)?;

    let mut builder = DumperBuilder::new(args.host)
        .port(args.port)
        .timeout(Duration::from_secs(args.timeout))
        .period_secs(args.period)
        .commands(commands)
        .remove_command_echo(args.remove_command_echo)
        .remove_prompt_echo(args.remove_prompt_echo)
        .trim_output(args.trim_output)
        .dumb_authentication(args.dumb_authentication)
        .strip_ansi(args.strip_ansi)
        .fail_on_timeout(args.fail_on_timeout)
        .keep_output_without_echo(args.keep_output_without_echo)
        .host_key_verification(args.host_key_verification.into());

    if let Some(username) = args.username {
        builder = builder.username(username);
    }
    if let Some(password) = args.password {
        builder = builder.password(password);
    }
    if let Some(path) = args.known_hosts {
        builder = builder.known_hosts(path);
    }

    let dumper = builder.build()?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupted, shutting down");
            trigger.cancel();
        }
    });

    let mut sink = JsonLinesSink::new(args.output_path);
    dumper.run(&mut sink, cancel).await
}
