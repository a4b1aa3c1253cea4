//! Prompt patterns.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::error::ConfigError;

/// Built-in catch-all prompt: a line ending in `$`, `^` or `#` plus a space.
pub const DEFAULT_PROMPT: &str = r"(?m)^.*[$^#] ";

/// Generic login prompt: any line ending in a colon.
pub const LOGIN_PROMPT: &str = r"(?m)^.*:[ \t]*$";

static DEFAULT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(DEFAULT_PROMPT).expect("built-in prompt pattern is valid"));

static LOGIN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(LOGIN_PROMPT).expect("built-in login pattern is valid"));

/// Ordered list of prompt patterns; the first pattern that matches wins.
#[derive(Debug, Clone)]
pub struct PromptSet {
    patterns: Vec<Regex>,
}

impl PromptSet {
    /// A set holding only the built-in catch-all prompt.
    pub fn new() -> Self {
        Self {
            patterns: vec![DEFAULT_REGEX.clone()],
        }
    }

    /// A set holding only the generic colon-terminated login prompt.
    pub fn login() -> Self {
        Self {
            patterns: vec![LOGIN_REGEX.clone()],
        }
    }

    /// A set of exactly the given patterns, replacing the built-in one.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self {
            patterns: Vec::new(),
        };
        for pattern in patterns {
            set.push(pattern.as_ref())?;
        }
        Ok(set)
    }

    /// Compile and append a pattern after the existing ones.
    pub fn push(&mut self, pattern: &str) -> Result<(), ConfigError> {
        let regex = Regex::new(pattern).map_err(|source| ConfigError::InvalidPrompt {
            pattern: pattern.to_string(),
            source,
        })?;
        self.patterns.push(regex);
        Ok(())
    }

    /// Builder form of [`push`](Self::push).
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self, ConfigError> {
        self.push(pattern)?;
        Ok(self)
    }

    /// Index of the first pattern, in order, that matches anywhere in `data`.
    pub fn first_match(&self, data: &[u8]) -> Option<usize> {
        self.patterns.iter().position(|p| p.is_match(data))
    }

    /// Remove every occurrence of pattern `index` from `data`.
    ///
    /// Other patterns are left alone even if they also match.
    pub fn strip(&self, index: usize, data: &[u8]) -> Vec<u8> {
        match self.patterns.get(index) {
            Some(pattern) => pattern.replace_all(data, &b""[..]).into_owned(),
            None => data.to_vec(),
        }
    }
}

impl Default for PromptSet {
    fn default() -> Self {
        Self::new()
    }
}
