//! Dump a few commands from a Linux host to stdout instead of a file.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example stdout_dump -- localhost your_username your_password
//! ```
//!
//! Runs `uptime` and `df -h` every 5 seconds until Ctrl-C.

use std::env;

use sshdump::{CommandOutputs, DumpConfig, DumperBuilder, HostKeyVerification};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = env::args().skip(1);
    let (Some(host), Some(user), Some(password)) = (args.next(), args.next(), args.next()) else {
        eprintln!("Usage: stdout_dump <host> <username> <password>");
        std::process::exit(1);
    };

    let commands = DumpConfig::new(["uptime", "df -h"])?.with_setup_commands(["unset PROMPT_COMMAND"]);

    let dumper = DumperBuilder::new(host)
        .username(user)
        .password(password)
        .period_secs(5.0)
        .strip_ansi(true)
        .trim_output(true)
        .host_key_verification(HostKeyVerification::Disabled)
        .commands(commands)
        .build()?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        trigger.cancel();
    });

    let mut print = |batch: &CommandOutputs| -> sshdump::Result<()> {
        println!("=== {} ===", batch.timestamp.format("%H:%M:%S"));
        for output in batch.iter() {
            println!("$ {}\n{}", output.command, output.output);
        }
        Ok(())
    };

    dumper.run(&mut print, cancel).await?;
    println!("Done.");
    Ok(())
}
