//! Orchestrator execution logic

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use crate::config::Concurrency;
use crate::response::TaskResult;
use crate::sink::ResultSink;
use crate::traits::ProbeClient;
use crate::worker::{TaskQueue, Worker};

use super::aggregator::{summarize, BatchSummary};

/// Message recorded for tasks left open by a worker that panicked
pub const ABORTED_MESSAGE: &str = "worker aborted before completing task";

/// Outcome of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Results with successes first, each group in submission order
    pub results: Vec<TaskResult>,

    /// Aggregate counts and timing
    pub summary: BatchSummary,
}

/// Orchestrator runs one batch to completion
///
/// Spawns `min(concurrency, tasks)` workers over a shared queue and resolves
/// only after every task holds a terminal result.
pub struct Orchestrator {
    concurrency: Concurrency,
    client: Arc<dyn ProbeClient>,
    queue: Arc<TaskQueue>,
    sink: Arc<ResultSink>,
    workers: Vec<Worker>,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// Use `OrchestratorBuilder` for a more ergonomic construction.
    pub(crate) fn new(
        concurrency: Concurrency,
        client: Arc<dyn ProbeClient>,
        queue: Arc<TaskQueue>,
        sink: Arc<ResultSink>,
        workers: Vec<Worker>,
    ) -> Self {
        Self {
            concurrency,
            client,
            queue,
            sink,
            workers,
        }
    }

    /// Configured concurrency level
    pub fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    /// Number of workers that will be spawned
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Number of queued tasks
    pub fn task_count(&self) -> usize {
        self.queue.len()
    }

    /// Shared handle to the result sink, for polling while the batch runs
    pub fn sink(&self) -> Arc<ResultSink> {
        Arc::clone(&self.sink)
    }

    /// Run the batch
    ///
    /// Waits for every worker, then returns all results sorted with
    /// successes first.
    pub async fn run(self) -> BatchReport {
        let start = Instant::now();
        let total_workers = self.workers.len();

        tracing::info!(
            tasks = self.queue.len(),
            concurrency = %self.concurrency,
            workers = total_workers,
            endpoint = self.client.endpoint(),
            mode = %self.client.mode(),
            "Starting batch"
        );

        let handles: Vec<_> = self
            .workers
            .into_iter()
            .map(|worker| tokio::spawn(worker.run()))
            .collect();

        let mut returned = 0;
        for (idx, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(worker_stats) => {
                    tracing::debug!(
                        worker_id = idx,
                        succeeded = worker_stats.succeeded,
                        failed = worker_stats.failed,
                        "Worker completed"
                    );
                    returned += 1;
                }
                Err(e) => {
                    tracing::error!(worker_id = idx, error = %e, "Worker task panicked");
                }
            }
        }

        let orphaned = self.sink.fail_unfinished(ABORTED_MESSAGE);
        if orphaned > 0 {
            tracing::warn!(orphaned, "Tasks left open by aborted workers marked failed");
        }

        let summary = summarize(
            self.sink.counts(),
            total_workers,
            returned,
            start.elapsed(),
        );
        tracing::info!(
            elapsed_secs = summary.elapsed.as_secs_f64(),
            succeeded = summary.succeeded,
            failed = summary.failed,
            "Batch completed"
        );

        BatchReport {
            results: self.sink.sorted(),
            summary,
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("concurrency", &self.concurrency)
            .field("endpoint", &self.client.endpoint())
            .field("tasks", &self.queue.len())
            .field("workers", &self.workers.len())
            .finish()
    }
}
