//! Batch configuration types

use crate::request::{ProbeTask, DEFAULT_PROMPT};
use serde::{Deserialize, Serialize};

/// Lowest accepted concurrency level
pub const MIN_CONCURRENCY: usize = 1;

/// Highest accepted concurrency level
pub const MAX_CONCURRENCY: usize = 20;

/// Number of probes allowed in flight at once, clamped to `[1, 20]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "usize")]
pub struct Concurrency(usize);

impl Concurrency {
    /// Clamp `level` into the accepted range
    pub fn new(level: usize) -> Self {
        let clamped = level.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY);
        if clamped != level {
            tracing::debug!(requested = level, clamped, "Concurrency clamped");
        }
        Self(clamped)
    }

    /// The clamped level
    pub fn get(&self) -> usize {
        self.0
    }

    /// Number of workers needed for `tasks` queued tasks
    pub fn workers_for(&self, tasks: usize) -> usize {
        self.0.min(tasks)
    }
}

impl Default for Concurrency {
    fn default() -> Self {
        Self(MIN_CONCURRENCY)
    }
}

impl From<usize> for Concurrency {
    fn from(level: usize) -> Self {
        Self::new(level)
    }
}

impl From<i64> for Concurrency {
    /// Negative levels clamp to the lower bound
    fn from(level: i64) -> Self {
        if level < MIN_CONCURRENCY as i64 {
            tracing::debug!(requested = level, clamped = MIN_CONCURRENCY, "Concurrency clamped");
            return Self(MIN_CONCURRENCY);
        }
        Self::new(usize::try_from(level).unwrap_or(MAX_CONCURRENCY))
    }
}

impl From<Concurrency> for usize {
    fn from(level: Concurrency) -> Self {
        level.0
    }
}

impl std::fmt::Display for Concurrency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Batch configuration
///
/// Defines which models are probed, with which prompt, and how many probes
/// may run at the same time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Model identifiers in submission order
    #[serde(default)]
    pub models: Vec<String>,

    /// Prompt shared by every task
    #[serde(default)]
    pub prompt: String,

    /// Prompt used when `prompt` is blank
    #[serde(default = "default_prompt")]
    pub default_prompt: String,

    /// Maximum probes in flight
    #[serde(default)]
    pub concurrency: Concurrency,
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            prompt: String::new(),
            default_prompt: default_prompt(),
            concurrency: Concurrency::default(),
        }
    }
}

impl BatchConfig {
    /// Create a config for the given models
    pub fn new<I, S>(models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            models: models.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set the shared prompt
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Set the fallback prompt
    pub fn with_default_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.default_prompt = prompt.into();
        self
    }

    /// Set the concurrency level (clamped)
    pub fn with_concurrency(mut self, level: usize) -> Self {
        self.concurrency = Concurrency::new(level);
        self
    }

    /// The prompt actually sent: trimmed `prompt`, or `default_prompt` when blank
    pub fn effective_prompt(&self) -> &str {
        match self.prompt.trim() {
            "" => self.default_prompt.trim(),
            prompt => prompt,
        }
    }

    /// Build the task list
    pub fn tasks(&self) -> Vec<ProbeTask> {
        ProbeTask::batch(self.models.iter().map(|m| m.trim()), self.effective_prompt())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(index) = self.models.iter().position(|m| m.trim().is_empty()) {
            return Err(ConfigError::EmptyModel(index));
        }

        if self.effective_prompt().is_empty() {
            return Err(ConfigError::EmptyPrompt);
        }

        Ok(())
    }
}

/// Configuration validation errors
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A model identifier is blank
    #[error("model at position {0} is empty")]
    EmptyModel(usize),

    /// Both the prompt and the fallback prompt are blank
    #[error("prompt and default prompt are both empty")]
    EmptyPrompt,
}
