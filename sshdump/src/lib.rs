//! # sshdump
//!
//! Periodically run commands on a device over an interactive SSH shell and
//! record their outputs.
//!
//! sshdump opens a PTY shell, synchronizes on prompt patterns instead of
//! exit codes, and strips command and prompt echoes from what it reads. It
//! works with network equipment and appliances whose CLI only exists as an
//! interactive shell.
//!
//! ## Features
//!
//! - Async SSH connections via russh
//! - Prompt matching with ordered regex patterns and a per-read deadline
//! - Optional login through shell-printed `Username:`/`Password:` prompts
//! - Fixed-period cycles that never overlap or burst
//! - JSON Lines output, one record per cycle
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sshdump::{DumpConfig, DumperBuilder, JsonLinesSink};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sshdump::Error> {
//!     let dumper = DumperBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .commands(DumpConfig::new(["show version", "show clock"])?)
//!         .build()?;
//!
//!     let mut sink = JsonLinesSink::new("ssh_output.jsonl");
//!     dumper.run(&mut sink, CancellationToken::new()).await
//! }
//! ```

pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod output;
pub mod sink;
pub mod transport;

// Re-export main types for convenience
pub use config::DumpConfig;
pub use driver::{Dumper, DumperBuilder, Session, SessionOptions, SessionState};
pub use error::{Error, Result};
pub use output::{CommandOutput, CommandOutputs};
pub use sink::{JsonLinesSink, Sink};
pub use transport::{HostKeyVerification, SshConfig, SshTransport, Transport};
