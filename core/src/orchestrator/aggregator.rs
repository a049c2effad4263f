//! Result aggregation from multiple workers

use std::time::Duration;

use serde::Serialize;

use crate::sink::StatusCounts;

/// Summary of a finished batch run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSummary {
    /// Tasks submitted
    pub total_tasks: usize,

    /// Workers spawned (`min(concurrency, tasks)`)
    pub total_workers: usize,

    /// Tasks that ended in success
    pub succeeded: usize,

    /// Tasks that ended in failure
    pub failed: usize,

    /// Workers that panicked instead of returning stats
    pub aborted_workers: usize,

    /// Wall-clock duration of the run
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

impl BatchSummary {
    /// Get the success rate (0.0 - 1.0)
    pub fn success_rate(&self) -> f64 {
        if self.total_tasks > 0 {
            self.succeeded as f64 / self.total_tasks as f64
        } else {
            0.0
        }
    }

    /// Probes completed per second of wall-clock time
    pub fn probes_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            (self.succeeded + self.failed) as f64 / secs
        } else {
            0.0
        }
    }
}

/// Combine the sink's final counts with worker bookkeeping into a summary
///
/// Sink counts are authoritative: they include tasks failed on behalf of
/// workers that never returned.
pub fn summarize(
    counts: StatusCounts,
    total_workers: usize,
    returned_workers: usize,
    elapsed: Duration,
) -> BatchSummary {
    BatchSummary {
        total_tasks: counts.total(),
        total_workers,
        succeeded: counts.succeeded,
        failed: counts.failed,
        aborted_workers: total_workers.saturating_sub(returned_workers),
        elapsed,
    }
}
