//! Destinations for cycle results.

use std::future::Future;
use std::path::{Path, PathBuf};

use log::info;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, SinkError};
use crate::output::CommandOutputs;

/// Receives one [`CommandOutputs`] batch per cycle.
///
/// An error stops the cycle loop.
pub trait Sink: Send {
    fn emit(&mut self, outputs: &CommandOutputs) -> impl Future<Output = Result<()>> + Send;
}

/// Plain callbacks work as sinks.
impl<F> Sink for F
where
    F: FnMut(&CommandOutputs) -> Result<()> + Send,
{
    fn emit(&mut self, outputs: &CommandOutputs) -> impl Future<Output = Result<()>> + Send {
        std::future::ready((*self)(outputs))
    }
}

/// Appends each batch as one JSON object per line.
///
/// The file is opened in append mode for every record and created if
/// missing; existing content is never truncated.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, line: &str) -> std::result::Result<(), std::io::Error> {
        let mut options = OpenOptions::new();
        options.append(true).create(true);
        #[cfg(unix)]
        options.mode(0o644);

        let mut file = options.open(&self.path).await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await
    }
}

impl Sink for JsonLinesSink {
    async fn emit(&mut self, outputs: &CommandOutputs) -> Result<()> {
        let line = serde_json::to_string(outputs).map_err(SinkError::Serialize)?;
        info!("{}", line);

        self.append(&line).await.map_err(|source| SinkError::Write {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::output::CommandOutput;
    use chrono::Local;

    fn batch(command: &str, output: &str) -> CommandOutputs {
        let mut outputs = CommandOutputs::new(Local::now());
        outputs.push(CommandOutput::new(command, output));
        outputs
    }

    #[tokio::test]
    async fn test_appends_one_line_per_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        std::fs::write(&path, "{\"existing\":true}\n").unwrap();

        let mut sink = JsonLinesSink::new(&path);
        sink.emit(&batch("uptime", "up 3 days\nload: 0.1\n")).await.unwrap();
        sink.emit(&batch("date", "Mon\n")).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "{\"existing\":true}");

        let first: CommandOutputs = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(first.command_outputs[0].output, "up 3 days\nload: 0.1\n");
        let second: CommandOutputs = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(second.command_outputs[0].command, "date");
    }

    #[tokio::test]
    async fn test_write_failure_is_sink_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = JsonLinesSink::new(dir.path().join("missing").join("out.jsonl"));

        let err = sink.emit(&batch("uptime", "")).await.unwrap_err();
        assert!(matches!(err, Error::Sink(SinkError::Write { .. })));
    }

    #[tokio::test]
    async fn test_closure_sink() {
        let mut seen = Vec::new();
        {
            let mut sink = |outputs: &CommandOutputs| -> Result<()> {
                seen.push(outputs.len());
                Ok(())
            };
            sink.emit(&batch("a", "b")).await.unwrap();
        }
        assert_eq!(seen, vec![1]);
    }
}
