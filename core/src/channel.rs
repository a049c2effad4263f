//! Progress events and channel configuration for observers of a batch run

use crate::request::TaskId;
use crate::response::TaskStatus;
use std::time::Duration;

/// Progress notification sent by workers
///
/// Observers (progress bars, tables) consume these instead of reaching into
/// worker state. Sending never blocks a worker from finishing its queue: if
/// the receiver is gone, events are dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeEvent {
    /// A worker claimed a task
    Started {
        /// Task id
        id: TaskId,
        /// Model identifier
        model: String,
        /// Worker that claimed it
        worker_id: usize,
    },
    /// A task reached a terminal state
    Finished {
        /// Task id
        id: TaskId,
        /// Model identifier
        model: String,
        /// Terminal status
        status: TaskStatus,
        /// Time spent probing
        elapsed: Duration,
    },
}

impl ProbeEvent {
    /// Task the event refers to
    pub fn task_id(&self) -> TaskId {
        match self {
            ProbeEvent::Started { id, .. } | ProbeEvent::Finished { id, .. } => *id,
        }
    }
}

/// Channel buffer configuration
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Event channel buffer size (workers -> observer)
    pub events_buffer: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            events_buffer: 1_024,
        }
    }
}

impl ChannelConfig {
    /// Create a new channel config with a custom event buffer size
    pub fn with_events_buffer(mut self, size: usize) -> Self {
        self.events_buffer = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_default() {
        let config = ChannelConfig::default();
        assert_eq!(config.events_buffer, 1_024);
    }

    #[test]
    fn test_channel_config_builder() {
        let config = ChannelConfig::default().with_events_buffer(64);
        assert_eq!(config.events_buffer, 64);

        let config = ChannelConfig::default().with_events_buffer(0);
        assert_eq!(config.events_buffer, 1);
    }

    #[test]
    fn test_event_task_id() {
        let event = ProbeEvent::Finished {
            id: TaskId(4),
            model: "m".into(),
            status: TaskStatus::Success,
            elapsed: Duration::ZERO,
        };
        assert_eq!(event.task_id(), TaskId(4));
    }
}
