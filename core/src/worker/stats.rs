//! Worker statistics tracking

use std::time::{Duration, Instant};

/// Statistics tracked by each worker
#[derive(Debug, Default, Clone)]
pub struct WorkerStats {
    /// Probes that ended in success
    pub succeeded: usize,

    /// Probes that ended in failure
    pub failed: usize,

    /// Worker start time
    pub started_at: Option<Instant>,

    /// Worker end time
    pub ended_at: Option<Instant>,
}

impl WorkerStats {
    /// Create new empty stats
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking (records start time)
    pub fn start(&mut self) {
        self.started_at = Some(Instant::now());
    }

    /// Stop tracking (records end time)
    pub fn stop(&mut self) {
        self.ended_at = Some(Instant::now());
    }

    /// Total probes handled (succeeded + failed)
    pub fn total_probes(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_probes() == 0 {
            0.0
        } else {
            self.succeeded as f64 / self.total_probes() as f64
        }
    }

    /// Elapsed time since start
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|start| {
            self.ended_at
                .map(|end| end.duration_since(start))
                .unwrap_or_else(|| start.elapsed())
        })
    }

    /// Record a successful probe
    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    /// Record a failed probe
    pub fn record_failure(&mut self) {
        self.failed += 1;
    }
}
