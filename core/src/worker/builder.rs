//! Builder pattern for Worker construction

use crate::channel::ProbeEvent;
use crate::error::{BenchError, BenchResult};
use crate::sink::ResultSink;
use crate::traits::ProbeClient;

use super::executor::Worker;
use super::queue::TaskQueue;

use std::sync::Arc;
use tokio::sync::mpsc;

/// Builder for creating Worker instances
///
/// # Example
/// ```ignore
/// let worker = WorkerBuilder::new(0)
///     .client(client)
///     .queue(queue)
///     .sink(sink)
///     .build()?;
/// ```
pub struct WorkerBuilder {
    id: usize,
    client: Option<Arc<dyn ProbeClient>>,
    queue: Option<Arc<TaskQueue>>,
    sink: Option<Arc<ResultSink>>,
    events: Option<mpsc::Sender<ProbeEvent>>,
}

impl WorkerBuilder {
    /// Create a new builder with the given worker ID
    pub fn new(id: usize) -> Self {
        Self {
            id,
            client: None,
            queue: None,
            sink: None,
            events: None,
        }
    }

    /// Set the probe client
    pub fn client(mut self, client: Arc<dyn ProbeClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the shared task queue
    pub fn queue(mut self, queue: Arc<TaskQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Set the result sink
    pub fn sink(mut self, sink: Arc<ResultSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Set the progress event sender
    pub fn events(mut self, tx: Option<mpsc::Sender<ProbeEvent>>) -> Self {
        self.events = tx;
        self
    }

    /// Build the Worker
    ///
    /// # Errors
    /// Returns an error if any required field is missing, or if the queue and
    /// sink disagree on the number of tasks or on which slot a task owns.
    pub fn build(self) -> BenchResult<Worker> {
        let client = self.client.ok_or_else(|| BenchError::missing_config("client"))?;
        let queue = self.queue.ok_or_else(|| BenchError::missing_config("queue"))?;
        let sink = self.sink.ok_or_else(|| BenchError::missing_config("sink"))?;

        if queue.len() != sink.len() {
            return Err(BenchError::config(format!(
                "queue holds {} tasks but sink tracks {}",
                queue.len(),
                sink.len()
            )));
        }

        let misplaced = queue
            .tasks()
            .iter()
            .enumerate()
            .find(|(index, task)| {
                task.id.0 != *index || sink.model(task.id) != Some(task.model.as_str())
            });
        if let Some((index, task)) = misplaced {
            return Err(BenchError::config(format!(
                "task {} ({}) at queue position {index} has no matching sink slot",
                task.id, task.model
            )));
        }

        Ok(Worker::new(self.id, client, queue, sink, self.events))
    }
}
