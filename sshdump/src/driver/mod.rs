//! Session orchestration.
//!
//! A [`Session`] walks one shell through its lifecycle: request the PTY,
//! optionally log in, drain the banner, run setup commands, then run cycles.
//! A [`Dumper`] drives a session on a fixed [`Schedule`] and hands each
//! cycle's batch to a [`Sink`](crate::sink::Sink).

mod auth;
mod builder;
mod dumper;
mod echo;
mod schedule;
mod session;

pub use auth::terminal_login;
pub use builder::DumperBuilder;
pub use dumper::Dumper;
pub use echo::{EchoFallback, command_line, strip_command_echo};
pub use schedule::{Schedule, Tick};
pub use session::{Session, SessionOptions, SessionState};
