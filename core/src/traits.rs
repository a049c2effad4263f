//! Core traits for probe clients
//!
//! The trait is defined in core so the worker pool can drive any client.
//! The HTTP implementation lives in the vendors crate.

use crate::error::ErrorKind;
use crate::request::{ProbeMode, ProbeTask};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Probe Client Trait
// ============================================================================

/// Executes one request/response exchange for a task
///
/// Implementations own the timeout: a probe that outlives it must resolve to
/// [`ProbeError::Timeout`] and release its connection.
#[async_trait]
pub trait ProbeClient: Send + Sync {
    /// Endpoint identifier used in logs
    fn endpoint(&self) -> &str;

    /// Delivery mode shared by every probe issued through this client
    fn mode(&self) -> ProbeMode;

    /// Run the exchange for `task`
    async fn probe(&self, task: &ProbeTask) -> Result<ProbeOutput, ProbeError>;
}

/// Text produced by a successful probe
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeOutput {
    /// Response text, or the fallback diagnostic when content was missing
    pub text: String,

    /// The response carried no message content
    #[serde(default)]
    pub missing_content: bool,

    /// Streamed payloads that failed to parse and were skipped
    #[serde(default)]
    pub malformed_chunks: usize,
}

impl ProbeOutput {
    /// Plain text output
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Non-fatal problems absorbed while producing this output
    pub fn warnings(&self) -> Vec<ErrorKind> {
        let mut warnings = Vec::new();
        if self.missing_content {
            warnings.push(ErrorKind::MissingContent);
        }
        if self.malformed_chunks > 0 {
            warnings.push(ErrorKind::MalformedStreamChunk);
        }
        warnings
    }
}

/// Probe errors
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Timer fired before the exchange completed
    #[error("request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Connection-level failure
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-2xx response
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Structured error message or raw body
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Client misconfiguration
    #[error("configuration error: {0}")]
    Config(String),
}

impl ProbeError {
    /// Map to the error kind recorded for the task
    ///
    /// Shape and configuration errors count as HTTP-level failures: the
    /// exchange happened (or could not be attempted) but yielded nothing usable.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProbeError::Timeout(_) => ErrorKind::Timeout,
            ProbeError::Transport(_) => ErrorKind::TransportError,
            ProbeError::Http { .. } | ProbeError::InvalidResponse(_) | ProbeError::Config(_) => {
                ErrorKind::HttpError
            }
        }
    }
}
