//! In-memory result store for one batch run
//!
//! Every task owns one slot. The worker that claimed a task is the only
//! writer of that slot, so slots need no locks: the status is an atomic and
//! the terminal outcome is a write-once cell. Renderers poll [`ResultSink::snapshot`]
//! or subscribe to worker events; the sink itself knows nothing about display.

use crate::error::ErrorKind;
use crate::request::{ProbeTask, TaskId};
use crate::response::{ProbeFailure, TaskResult, TaskStatus};
use crate::traits::ProbeOutput;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

/// Errors raised when a slot is written out of order
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SinkError {
    /// No slot exists for this id
    #[error("unknown task {0}")]
    UnknownTask(TaskId),

    /// The slot was already marked running
    #[error("task {0} was already claimed")]
    AlreadyClaimed(TaskId),

    /// The slot already holds a terminal result
    #[error("task {0} already has a terminal result")]
    AlreadyRecorded(TaskId),
}

#[derive(Debug)]
struct Terminal {
    outcome: Result<ProbeOutput, ProbeFailure>,
    elapsed: Duration,
}

#[derive(Debug)]
struct Slot {
    model: String,
    status: AtomicU8,
    terminal: OnceLock<Terminal>,
}

impl Slot {
    fn view(&self, id: TaskId) -> TaskResult {
        let Some(terminal) = self.terminal.get() else {
            let status = TaskStatus::from_u8(self.status.load(Ordering::Acquire));
            return TaskResult::unfinished(id, self.model.as_str(), status);
        };

        let result = match &terminal.outcome {
            Ok(output) => {
                let mut result = TaskResult::unfinished(id, self.model.as_str(), TaskStatus::Success)
                    .with_output(output.text.as_str());
                result.warnings = output.warnings();
                result
            }
            Err(failure) => {
                let mut result = TaskResult::unfinished(id, self.model.as_str(), TaskStatus::Failed)
                    .with_output(failure.message.as_str());
                result.error_kind = failure.kind;
                result
            }
        };
        result.with_elapsed(terminal.elapsed)
    }
}

/// Per-status task counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Not yet claimed
    pub pending: usize,
    /// In flight
    pub running: usize,
    /// Finished successfully
    pub succeeded: usize,
    /// Finished with an error
    pub failed: usize,
}

impl StatusCounts {
    /// Total number of tasks
    pub fn total(&self) -> usize {
        self.pending + self.running + self.succeeded + self.failed
    }

    /// Number of tasks in a terminal state
    pub fn terminal(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Write-once store of task results
#[derive(Debug)]
pub struct ResultSink {
    slots: Box<[Slot]>,
}

impl ResultSink {
    /// Create a sink with one pending slot per task
    ///
    /// Slots are addressed by position, so task ids must equal their index
    /// in `tasks`. `WorkerBuilder` refuses a queue and sink that disagree.
    pub fn new(tasks: &[ProbeTask]) -> Self {
        let slots = tasks
            .iter()
            .map(|task| Slot {
                model: task.model.clone(),
                status: AtomicU8::new(TaskStatus::Pending as u8),
                terminal: OnceLock::new(),
            })
            .collect();
        Self { slots }
    }

    /// Number of tasks tracked
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the sink tracks no tasks
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Model tracked by the slot for `id`
    pub fn model(&self, id: TaskId) -> Option<&str> {
        self.slots.get(id.0).map(|slot| slot.model.as_str())
    }

    fn slot(&self, id: TaskId) -> Result<&Slot, SinkError> {
        self.slots.get(id.0).ok_or(SinkError::UnknownTask(id))
    }

    /// Move a task from pending to running
    pub fn mark_running(&self, id: TaskId) -> Result<(), SinkError> {
        self.slot(id)?
            .status
            .compare_exchange(
                TaskStatus::Pending as u8,
                TaskStatus::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(|_| SinkError::AlreadyClaimed(id))
    }

    /// Store the terminal outcome of a task
    ///
    /// Returns the terminal status. A second write for the same task is rejected.
    pub fn record(
        &self,
        id: TaskId,
        outcome: Result<ProbeOutput, ProbeFailure>,
        elapsed: Duration,
    ) -> Result<TaskStatus, SinkError> {
        let slot = self.slot(id)?;
        let status = if outcome.is_ok() {
            TaskStatus::Success
        } else {
            TaskStatus::Failed
        };
        slot.terminal
            .set(Terminal { outcome, elapsed })
            .map_err(|_| SinkError::AlreadyRecorded(id))?;
        slot.status.store(status as u8, Ordering::Release);
        Ok(status)
    }

    /// Record a failed probe
    pub fn record_failure(
        &self,
        id: TaskId,
        kind: ErrorKind,
        message: impl Into<String>,
        elapsed: Duration,
    ) -> Result<TaskStatus, SinkError> {
        let failure = ProbeFailure {
            kind: Some(kind),
            message: message.into(),
        };
        self.record(id, Err(failure), elapsed)
    }

    /// Fail every task that never reached a terminal state
    ///
    /// Only called once all workers have stopped, so no slot has a live writer.
    pub(crate) fn fail_unfinished(&self, message: &str) -> usize {
        let mut failed = 0;
        for slot in self.slots.iter() {
            let failure = ProbeFailure {
                kind: None,
                message: message.to_string(),
            };
            let terminal = Terminal {
                outcome: Err(failure),
                elapsed: Duration::ZERO,
            };
            if slot.terminal.set(terminal).is_ok() {
                slot.status.store(TaskStatus::Failed as u8, Ordering::Release);
                failed += 1;
            }
        }
        failed
    }

    /// Current status of a task
    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        self.slot(id).ok().map(|slot| slot.view(id).status)
    }

    /// Current result view of a task
    pub fn result(&self, id: TaskId) -> Option<TaskResult> {
        self.slot(id).ok().map(|slot| slot.view(id))
    }

    /// All results in submission order
    pub fn snapshot(&self) -> Vec<TaskResult> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| slot.view(TaskId(index)))
            .collect()
    }

    /// All results with successes first, each group in submission order
    pub fn sorted(&self) -> Vec<TaskResult> {
        stable_partition(self.snapshot())
    }

    /// Count tasks per status
    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for slot in self.slots.iter() {
            match TaskStatus::from_u8(slot.status.load(Ordering::Acquire)) {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::Running => counts.running += 1,
                TaskStatus::Success => counts.succeeded += 1,
                TaskStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    /// Whether every task has a terminal result
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|slot| slot.terminal.get().is_some())
    }
}

/// Move successful results ahead of all others, keeping relative order in each group
pub fn stable_partition(results: Vec<TaskResult>) -> Vec<TaskResult> {
    let (mut ordered, rest): (Vec<_>, Vec<_>) = results.into_iter().partition(TaskResult::is_success);
    ordered.extend(rest);
    ordered
}
