//! Error types for probe-bench-core

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification of everything that can go wrong while probing a model.
///
/// Only [`Timeout`](ErrorKind::Timeout), [`TransportError`](ErrorKind::TransportError)
/// and [`HttpError`](ErrorKind::HttpError) end a task as failed. The other
/// kinds are absorbed by the probe and reported alongside a successful result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Timer expired before the exchange completed
    Timeout,
    /// Connection-level failure (DNS, refused, reset, body read)
    TransportError,
    /// Non-2xx response from the endpoint
    HttpError,
    /// A streamed payload could not be parsed and was skipped
    MalformedStreamChunk,
    /// A single-shot response had no message content
    MissingContent,
}

impl ErrorKind {
    /// Whether this kind ends the task in the failed state
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ErrorKind::Timeout | ErrorKind::TransportError | ErrorKind::HttpError
        )
    }

    /// Stable identifier used in logs and JSON output
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Timeout => "timeout",
            ErrorKind::TransportError => "transport_error",
            ErrorKind::HttpError => "http_error",
            ErrorKind::MalformedStreamChunk => "malformed_stream_chunk",
            ErrorKind::MissingContent => "missing_content",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a [`BenchError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchErrorKind {
    /// Invalid configuration value
    Config,
    /// A required builder field was never set
    MissingConfig,
}

impl std::fmt::Display for BenchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BenchErrorKind::Config => write!(f, "configuration error"),
            BenchErrorKind::MissingConfig => write!(f, "missing configuration"),
        }
    }
}

/// Error raised while assembling or coordinating a batch run
///
/// Individual probe failures never surface here; they are recorded as
/// failed task results instead.
#[derive(Error, Debug)]
#[error("{kind}: {message}")]
pub struct BenchError {
    /// Error category
    pub kind: BenchErrorKind,
    /// Human readable detail
    pub message: String,
}

impl BenchError {
    /// Create an error of the given kind
    pub fn new(kind: BenchErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Invalid configuration
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(BenchErrorKind::Config, message)
    }

    /// A builder was finalized without a required field
    pub fn missing_config(field: &str) -> Self {
        Self::new(
            BenchErrorKind::MissingConfig,
            format!("`{field}` must be set before building"),
        )
    }
}

/// Result type alias
pub type BenchResult<T> = std::result::Result<T, BenchError>;
