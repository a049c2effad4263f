//! Probe tasks and the chat completion request body

use serde::{Deserialize, Serialize};

/// Prompt used when a batch is started with an empty prompt
pub const DEFAULT_PROMPT: &str = "Hello, please briefly introduce yourself.";

/// Submission index of a task within its batch
///
/// Doubles as the tie-breaker when results are reordered for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub usize);

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for TaskId {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// One unit of work: send `prompt` to `model`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeTask {
    /// Submission index
    pub id: TaskId,
    /// Model identifier as reported by the endpoint
    pub model: String,
    /// Prompt text
    pub prompt: String,
}

impl ProbeTask {
    /// Create a task
    pub fn new(id: usize, model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: TaskId(id),
            model: model.into(),
            prompt: prompt.into(),
        }
    }

    /// Build one task per model, all sharing `prompt`, numbered in submission order
    pub fn batch<I, S>(models: I, prompt: &str) -> Vec<ProbeTask>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        models
            .into_iter()
            .enumerate()
            .map(|(index, model)| ProbeTask::new(index, model, prompt))
            .collect()
    }
}

/// How the endpoint should deliver its answer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProbeMode {
    /// One complete JSON response
    #[default]
    SingleShot,
    /// Incremental `data:` frames
    Streaming,
}

impl ProbeMode {
    /// Whether the request asks for incremental delivery
    pub fn is_streaming(&self) -> bool {
        matches!(self, ProbeMode::Streaming)
    }

    /// Default completion budget for this mode
    pub fn default_max_tokens(&self) -> u32 {
        match self {
            ProbeMode::SingleShot => 80,
            ProbeMode::Streaming => 250,
        }
    }
}

impl std::fmt::Display for ProbeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeMode::SingleShot => write!(f, "single-shot"),
            ProbeMode::Streaming => write!(f, "streaming"),
        }
    }
}

/// Chat message (OpenAI-compatible format)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// User message (input)
    User,
}

/// Sampling parameters shared by every probe in a batch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingParams {
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl SamplingParams {
    /// Defaults for the given delivery mode
    pub fn for_mode(mode: ProbeMode) -> Self {
        Self {
            max_tokens: mode.default_max_tokens(),
            temperature: 0.7,
        }
    }
}

/// Body of `POST /v1/chat/completions`
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    /// Model identifier
    pub model: &'a str,
    /// Single user message carrying the prompt
    pub messages: Vec<Message>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Whether to request incremental delivery
    pub stream: bool,
}

impl<'a> ChatRequest<'a> {
    /// Build the request body for a task
    pub fn for_task(task: &'a ProbeTask, params: SamplingParams, mode: ProbeMode) -> Self {
        Self {
            model: &task.model,
            messages: vec![Message::user(task.prompt.as_str())],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            stream: mode.is_streaming(),
        }
    }
}
