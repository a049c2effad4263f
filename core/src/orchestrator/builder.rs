//! Builder pattern for Orchestrator construction

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::channel::{ChannelConfig, ProbeEvent};
use crate::config::{BatchConfig, Concurrency};
use crate::error::{BenchError, BenchResult};
use crate::request::{ProbeTask, TaskId};
use crate::sink::ResultSink;
use crate::traits::ProbeClient;
use crate::worker::{TaskQueue, WorkerBuilder};

use super::executor::Orchestrator;

/// Builder for creating an Orchestrator with proper configuration
///
/// # Example
///
/// ```ignore
/// let (orchestrator, events) = OrchestratorBuilder::new()
///     .models(["gpt-4o-mini", "llama-3.1-8b"])
///     .prompt("Say hi")
///     .concurrency(4)
///     .client(client)
///     .build_with_events()?;
/// ```
pub struct OrchestratorBuilder {
    config: BatchConfig,
    tasks: Option<Vec<ProbeTask>>,
    client: Option<Arc<dyn ProbeClient>>,
    channel_config: ChannelConfig,
}

impl OrchestratorBuilder {
    /// Create a new orchestrator builder with default configuration
    pub fn new() -> Self {
        Self {
            config: BatchConfig::default(),
            tasks: None,
            client: None,
            channel_config: ChannelConfig::default(),
        }
    }

    /// Set the full batch configuration
    pub fn config(mut self, config: BatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the models to probe, in submission order
    pub fn models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.models = models.into_iter().map(Into::into).collect();
        self
    }

    /// Set the shared prompt
    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = prompt.into();
        self
    }

    /// Set the concurrency level (clamped to `[1, 20]`)
    pub fn concurrency(mut self, level: usize) -> Self {
        self.config.concurrency = Concurrency::new(level);
        self
    }

    /// Use an explicit task list instead of deriving one from the models
    ///
    /// Ids are reassigned by position.
    pub fn tasks(mut self, tasks: Vec<ProbeTask>) -> Self {
        self.tasks = Some(tasks);
        self
    }

    /// Set the probe client
    pub fn client(mut self, client: Arc<dyn ProbeClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Set the channel configuration
    pub fn channel_config(mut self, config: ChannelConfig) -> Self {
        self.channel_config = config;
        self
    }

    /// Build the orchestrator without a progress channel
    ///
    /// # Errors
    ///
    /// Returns an error if the client is not set or the configuration is invalid.
    pub fn build(self) -> BenchResult<Orchestrator> {
        self.assemble(None)
    }

    /// Build the orchestrator and return it along with the progress receiver
    ///
    /// The channel holds at least two events per task, so workers never wait
    /// on a slow observer.
    pub fn build_with_events(self) -> BenchResult<(Orchestrator, mpsc::Receiver<ProbeEvent>)> {
        let task_count = self
            .tasks
            .as_ref()
            .map_or(self.config.models.len(), Vec::len);
        let buffer = self
            .channel_config
            .events_buffer
            .max(task_count.saturating_mul(2))
            .max(1);
        let (tx, rx) = mpsc::channel(buffer);
        let orchestrator = self.assemble(Some(tx))?;
        Ok((orchestrator, rx))
    }

    fn assemble(self, events: Option<mpsc::Sender<ProbeEvent>>) -> BenchResult<Orchestrator> {
        let client = self
            .client
            .ok_or_else(|| BenchError::missing_config("client"))?;

        let tasks = match self.tasks {
            Some(tasks) => renumber(tasks),
            None => {
                self.config
                    .validate()
                    .map_err(|e| BenchError::config(e.to_string()))?;
                self.config.tasks()
            }
        };

        let concurrency = self.config.concurrency;
        let sink = Arc::new(ResultSink::new(&tasks));
        let queue = Arc::new(TaskQueue::new(tasks));

        let workers = (0..concurrency.workers_for(queue.len()))
            .map(|worker_id| {
                WorkerBuilder::new(worker_id)
                    .client(Arc::clone(&client))
                    .queue(Arc::clone(&queue))
                    .sink(Arc::clone(&sink))
                    .events(events.clone())
                    .build()
            })
            .collect::<BenchResult<Vec<_>>>()?;

        Ok(Orchestrator::new(concurrency, client, queue, sink, workers))
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn renumber(tasks: Vec<ProbeTask>) -> Vec<ProbeTask> {
    tasks
        .into_iter()
        .enumerate()
        .map(|(index, mut task)| {
            task.id = TaskId(index);
            task
        })
        .collect()
}
