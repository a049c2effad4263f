//! Worker module for executing probes
//!
//! A Worker is the unit of execution in a batch run, responsible for the
//! loop: **claim -> probe -> record -> repeat**.
//!
//! Each Worker is a tokio task that:
//!
//! 1. Claims the next unclaimed task from the shared [`TaskQueue`]
//! 2. Marks it running in the [`ResultSink`](crate::sink::ResultSink)
//! 3. Executes the probe via a [`ProbeClient`](crate::traits::ProbeClient)
//! 4. Records exactly one terminal result, success or failure
//! 5. Repeats until the queue is empty
//!
//! # Example
//!
//! ```ignore
//! use probe_bench_core::worker::{TaskQueue, WorkerBuilder};
//!
//! let worker = WorkerBuilder::new(0)
//!     .client(client)
//!     .queue(queue)
//!     .sink(sink)
//!     .build()?;
//!
//! let stats = worker.run().await;
//! println!("Succeeded: {}", stats.succeeded);
//! ```

mod builder;
mod executor;
mod queue;
mod stats;

pub use builder::WorkerBuilder;
pub use executor::Worker;
pub use queue::TaskQueue;
pub use stats::WorkerStats;
