//! Result records produced by each cycle.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Output captured for one command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// The command as configured.
    pub command: String,

    /// The captured output, after prompt and echo removal.
    pub output: String,
}

impl CommandOutput {
    pub fn new(command: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            output: output.into(),
        }
    }
}

/// All outputs captured during one cycle, in configured command order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandOutputs {
    /// When the cycle started.
    pub timestamp: DateTime<Local>,

    pub command_outputs: Vec<CommandOutput>,
}

impl CommandOutputs {
    /// Start an empty batch stamped with `timestamp`.
    pub fn new(timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            command_outputs: Vec::new(),
        }
    }

    pub fn push(&mut self, output: CommandOutput) {
        self.command_outputs.push(output);
    }

    pub fn len(&self) -> usize {
        self.command_outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.command_outputs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandOutput> {
        self.command_outputs.iter()
    }
}
