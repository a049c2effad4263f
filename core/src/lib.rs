//! probe-bench-core: Core data structures for batch-probing chat models
//!
//! This crate provides the foundational types used by the probe-bench
//! components, including:
//!
//! - Task and request types
//! - The `ProbeClient` trait implemented by HTTP clients
//! - A lock-free result sink with stable success-first ordering
//! - A bounded worker pool and the orchestrator that drives it
//! - Error handling

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod request;
pub mod response;
pub mod sink;
pub mod traits;
pub mod worker;

#[cfg(test)]
mod mock;

pub use channel::{ChannelConfig, ProbeEvent};
pub use config::{BatchConfig, Concurrency, ConfigError, MAX_CONCURRENCY, MIN_CONCURRENCY};
pub use error::*;
pub use orchestrator::{BatchReport, BatchSummary, Orchestrator, OrchestratorBuilder};
pub use request::*;
pub use response::*;
pub use sink::{stable_partition, ResultSink, SinkError, StatusCounts};
pub use traits::*;
pub use worker::{TaskQueue, Worker, WorkerBuilder, WorkerStats};
