//! Worker execution loop

use crate::channel::ProbeEvent;
use crate::request::ProbeTask;
use crate::response::TaskStatus;
use crate::sink::ResultSink;
use crate::traits::ProbeClient;

use super::queue::TaskQueue;
use super::stats::WorkerStats;

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Worker drains the shared queue: claim -> probe -> record -> repeat
///
/// Workers are tokio tasks spawned by the Orchestrator. They share the
/// queue, the sink and the client via Arc, and stop only when the queue is
/// empty. A failed probe is recorded and the worker moves on.
pub struct Worker {
    /// Unique worker identifier
    id: usize,

    /// Probe client (shared across workers via Arc)
    client: Arc<dyn ProbeClient>,

    /// Shared task queue
    queue: Arc<TaskQueue>,

    /// Result store (each slot written by the claiming worker only)
    sink: Arc<ResultSink>,

    /// Optional progress channel
    events: Option<mpsc::Sender<ProbeEvent>>,
}

impl Worker {
    /// Create a new worker
    pub fn new(
        id: usize,
        client: Arc<dyn ProbeClient>,
        queue: Arc<TaskQueue>,
        sink: Arc<ResultSink>,
        events: Option<mpsc::Sender<ProbeEvent>>,
    ) -> Self {
        Self {
            id,
            client,
            queue,
            sink,
            events,
        }
    }

    /// Run the worker loop until the queue is drained
    pub async fn run(self) -> WorkerStats {
        let mut stats = WorkerStats::new();
        stats.start();

        tracing::debug!(worker_id = self.id, "Worker started");

        while let Some(task) = self.queue.claim() {
            match self.execute_one(task).await {
                TaskStatus::Success => stats.record_success(),
                _ => stats.record_failure(),
            }
        }

        stats.stop();
        tracing::debug!(
            worker_id = self.id,
            succeeded = stats.succeeded,
            failed = stats.failed,
            elapsed_ms = ?stats.elapsed().map(|d| d.as_millis()),
            "Worker finished"
        );

        stats
    }

    /// Probe one claimed task and record its terminal result
    async fn execute_one(&self, task: &ProbeTask) -> TaskStatus {
        if let Err(e) = self.sink.mark_running(task.id) {
            tracing::error!(worker_id = self.id, task = %task.id, error = %e, "Claimed task was not pending");
        }
        self.emit(ProbeEvent::Started {
            id: task.id,
            model: task.model.clone(),
            worker_id: self.id,
        })
        .await;

        tracing::debug!(worker_id = self.id, task = %task.id, model = %task.model, "Probe started");

        let start = Instant::now();
        let result = self.client.probe(task).await;
        let elapsed = start.elapsed();

        let recorded = match result {
            Ok(output) => {
                if !output.warnings().is_empty() {
                    tracing::debug!(
                        worker_id = self.id,
                        model = %task.model,
                        warnings = ?output.warnings(),
                        "Probe succeeded with warnings"
                    );
                }
                self.sink.record(task.id, Ok(output), elapsed)
            }
            Err(e) => {
                tracing::warn!(
                    worker_id = self.id,
                    model = %task.model,
                    kind = %e.kind(),
                    error = %e,
                    "Probe failed"
                );
                self.sink
                    .record_failure(task.id, e.kind(), e.to_string(), elapsed)
            }
        };

        let status = recorded.unwrap_or_else(|e| {
            tracing::error!(worker_id = self.id, error = %e, "Failed to record result");
            TaskStatus::Failed
        });

        tracing::debug!(
            worker_id = self.id,
            model = %task.model,
            %status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Probe finished"
        );

        self.emit(ProbeEvent::Finished {
            id: task.id,
            model: task.model.clone(),
            status,
            elapsed,
        })
        .await;

        status
    }

    async fn emit(&self, event: ProbeEvent) {
        if let Some(events) = &self.events {
            // A departed observer must not stop the worker.
            let _ = events.send(event).await;
        }
    }

    /// Get the worker ID
    pub fn id(&self) -> usize {
        self.id
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("id", &self.id)
            .field("endpoint", &self.client.endpoint())
            .field("mode", &self.client.mode())
            .field("remaining", &self.queue.remaining())
            .finish()
    }
}
