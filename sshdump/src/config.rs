//! Command file configuration.
//!
//! The command file is a JSON object:
//!
//! ```json
//! {
//!     "prompts": ["(?m)^\\S+>$"],
//!     "setup_commands": ["terminal length 0"],
//!     "cycle_commands": ["show version", "show clock"]
//! }
//! ```
//!
//! `prompts` are appended after the built-in prompt pattern. Only
//! `cycle_commands` is required, and it must not be empty.

use std::path::Path;

use serde::Deserialize;

use crate::channel::PromptSet;
use crate::error::ConfigError;

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    prompts: Option<Vec<String>>,
    setup_commands: Option<Vec<String>>,
    cycle_commands: Option<Vec<String>>,
}

/// Validated command configuration.
#[derive(Debug, Clone)]
pub struct DumpConfig {
    /// Prompt patterns, built-in pattern first.
    pub prompts: PromptSet,

    /// Commands run once after login; their output is discarded.
    pub setup_commands: Vec<String>,

    /// Commands run on every cycle, in this order.
    pub cycle_commands: Vec<String>,
}

impl DumpConfig {
    /// Build a config from cycle commands alone, with the built-in prompt.
    pub fn new<I, S>(cycle_commands: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let cycle_commands: Vec<String> = cycle_commands.into_iter().map(Into::into).collect();
        if cycle_commands.is_empty() {
            return Err(ConfigError::EmptyCycleCommands {
                source_name: "configuration".to_string(),
            });
        }
        Ok(Self {
            prompts: PromptSet::new(),
            setup_commands: Vec::new(),
            cycle_commands,
        })
    }

    /// Load and validate a JSON command file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: RawConfig = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_raw(raw, &path.display().to_string())
    }

    /// Parse and validate a JSON command document.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            path: "<inline>".into(),
            source,
        })?;
        Self::from_raw(raw, "<inline>")
    }

    fn from_raw(raw: RawConfig, source_name: &str) -> Result<Self, ConfigError> {
        let mut prompts = PromptSet::new();
        for pattern in raw.prompts.unwrap_or_default() {
            prompts.push(&pattern)?;
        }

        let cycle_commands = raw.cycle_commands.unwrap_or_default();
        if cycle_commands.is_empty() {
            return Err(ConfigError::EmptyCycleCommands {
                source_name: source_name.to_string(),
            });
        }

        Ok(Self {
            prompts,
            setup_commands: raw.setup_commands.unwrap_or_default(),
            cycle_commands,
        })
    }

    /// Add setup commands.
    pub fn with_setup_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.setup_commands.extend(commands.into_iter().map(Into::into));
        self
    }
}
