//! Probe client implementations for probe-bench
//!
//! This crate provides:
//!
//! - [`OpenAiClient`], an implementation of `ProbeClient` for
//!   OpenAI-compatible endpoints (single-shot and streaming)
//! - [`StreamAggregator`], the state machine that reassembles streamed text
//! - [`ClientConfig`] and the shared HTTP connection pool

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod openai;
pub mod streaming;

pub use config::{
    normalize_base_url, ClientConfig, ConfigValidationError, HttpClientPool, HttpConfig,
    DEFAULT_TIMEOUT,
};
pub use openai::OpenAiClient;
pub use streaming::{StreamAggregator, StreamState};
