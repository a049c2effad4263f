//! Shared task queue

use crate::request::ProbeTask;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fixed list of tasks drained by workers through an atomic cursor
///
/// `claim` hands each task to exactly one caller, in submission order.
#[derive(Debug)]
pub struct TaskQueue {
    tasks: Box<[ProbeTask]>,
    cursor: AtomicUsize,
}

impl TaskQueue {
    /// Create a queue over `tasks`
    pub fn new(tasks: Vec<ProbeTask>) -> Self {
        Self {
            tasks: tasks.into_boxed_slice(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Claim the next unclaimed task, or `None` once the queue is drained
    pub fn claim(&self) -> Option<&ProbeTask> {
        let len = self.tasks.len();
        self.cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |next| {
                (next < len).then_some(next + 1)
            })
            .ok()
            .map(|index| &self.tasks[index])
    }

    /// All tasks in submission order
    pub fn tasks(&self) -> &[ProbeTask] {
        &self.tasks
    }

    /// Total number of tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Whether the queue was created empty
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Tasks not yet claimed
    pub fn remaining(&self) -> usize {
        self.tasks.len() - self.cursor.load(Ordering::Acquire)
    }
}
