//! Orchestrator for batch lifecycle management
//!
//! The Orchestrator coordinates one batch run:
//! - Turning the batch configuration into an ordered task queue
//! - Spawning `min(concurrency, tasks)` worker tasks
//! - Waiting for every worker before reporting
//! - Sorting the final results, successes first
//!
//! # Example
//!
//! ```ignore
//! use probe_bench_core::OrchestratorBuilder;
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .models(["model-a", "model-b"])
//!     .concurrency(2)
//!     .client(client)
//!     .build()?;
//!
//! let report = orchestrator.run().await;
//! ```

mod aggregator;
mod builder;
mod executor;

pub use aggregator::{summarize, BatchSummary};
pub use builder::OrchestratorBuilder;
pub use executor::{BatchReport, Orchestrator, ABORTED_MESSAGE};
