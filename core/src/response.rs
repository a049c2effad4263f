//! Task status and result types

use crate::error::ErrorKind;
use crate::request::TaskId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Number of characters kept in a result preview
pub const PREVIEW_CHARS: usize = 150;

/// Lifecycle state of a task
///
/// Tasks move `Pending -> Running -> Success | Failed` and never go back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum TaskStatus {
    /// Queued, not yet claimed by a worker
    Pending = 0,
    /// Claimed and in flight
    Running = 1,
    /// Finished with response text
    Success = 2,
    /// Finished with an error
    Failed = 3,
}

impl TaskStatus {
    /// Whether the task has finished
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            0 => TaskStatus::Pending,
            1 => TaskStatus::Running,
            2 => TaskStatus::Success,
            _ => TaskStatus::Failed,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Why a task failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeFailure {
    /// Error classification; `None` when the worker itself died
    pub kind: Option<ErrorKind>,
    /// Error message
    pub message: String,
}

/// View of one task's result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Submission index
    pub id: TaskId,

    /// Model identifier
    pub model: String,

    /// Current status
    pub status: TaskStatus,

    /// Response text on success, error message on failure, empty otherwise
    pub output: String,

    /// First [`PREVIEW_CHARS`] characters of `output`
    pub preview: String,

    /// `preview` was cut short
    pub truncated: bool,

    /// Failure classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,

    /// Non-fatal problems absorbed on the success path
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ErrorKind>,

    /// Wall-clock time spent in the probe
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<f64>,
}

impl TaskResult {
    /// Result for a task that has not finished
    pub fn unfinished(id: TaskId, model: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id,
            model: model.into(),
            status,
            output: String::new(),
            preview: String::new(),
            truncated: false,
            error_kind: None,
            warnings: Vec::new(),
            elapsed_ms: None,
        }
    }

    /// Set the output text and derive the preview
    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        let (preview, truncated) = make_preview(&self.output, PREVIEW_CHARS);
        self.preview = preview;
        self.truncated = truncated;
        self
    }

    /// Set the elapsed probe time
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = Some(elapsed.as_secs_f64() * 1000.0);
        self
    }

    /// Whether the task finished successfully
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

/// Cut `text` to at most `limit` characters, appending `...` when shortened
pub fn make_preview(text: &str, limit: usize) -> (String, bool) {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => (format!("{}...", &text[..byte_index]), true),
        None => (text.to_string(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
        assert!(TaskStatus::Success.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn test_status_u8_mapping() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Running,
            TaskStatus::Success,
            TaskStatus::Failed,
        ] {
            assert_eq!(TaskStatus::from_u8(status as u8), status);
        }
    }

    #[test]
    fn test_short_output_is_not_truncated() {
        let result = TaskResult::unfinished(TaskId(0), "m", TaskStatus::Success).with_output("hi");
        assert_eq!(result.preview, "hi");
        assert!(!result.truncated);
    }

    #[test]
    fn test_long_output_preview() {
        let text = "x".repeat(PREVIEW_CHARS + 10);
        let result = TaskResult::unfinished(TaskId(0), "m", TaskStatus::Success).with_output(text);

        assert!(result.truncated);
        assert_eq!(result.preview.len(), PREVIEW_CHARS + 3);
        assert!(result.preview.ends_with("..."));
        assert_eq!(result.output.len(), PREVIEW_CHARS + 10);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        let (preview, truncated) = make_preview("héllo wörld", 4);
        assert_eq!(preview, "héll...");
        assert!(truncated);

        let (preview, truncated) = make_preview("héllo", 5);
        assert_eq!(preview, "héllo");
        assert!(!truncated);
    }

    #[test]
    fn test_result_serialization_skips_empty_fields() {
        let result = TaskResult::unfinished(TaskId(3), "m", TaskStatus::Pending);
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"status\":\"pending\""));
        assert!(json.contains("\"id\":3"));
        assert!(!json.contains("error_kind"));
        assert!(!json.contains("warnings"));
    }
}
