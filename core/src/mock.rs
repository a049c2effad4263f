//! Scriptable probe client shared by the worker and orchestrator tests

use crate::request::{ProbeMode, ProbeTask};
use crate::traits::{ProbeClient, ProbeError, ProbeOutput};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Mock client that tracks how many probes are in flight
#[derive(Default)]
pub(crate) struct MockClient {
    delay: Duration,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    timing_out: HashSet<String>,
    panicking: HashSet<String>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: AtomicUsize,
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with_model_delay(mut self, model: &str, delay: Duration) -> Self {
        self.delays.insert(model.to_string(), delay);
        self
    }

    pub(crate) fn failing(mut self, model: &str) -> Self {
        self.failing.insert(model.to_string());
        self
    }

    pub(crate) fn timing_out(mut self, model: &str) -> Self {
        self.timing_out.insert(model.to_string());
        self
    }

    pub(crate) fn panicking(mut self, model: &str) -> Self {
        self.panicking.insert(model.to_string());
        self
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProbeClient for MockClient {
    fn endpoint(&self) -> &str {
        "mock://endpoint"
    }

    fn mode(&self) -> ProbeMode {
        ProbeMode::SingleShot
    }

    async fn probe(&self, task: &ProbeTask) -> Result<ProbeOutput, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlightGuard(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self.delays.get(&task.model).copied().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }

        if self.panicking.contains(&task.model) {
            panic!("mock client panicked on {}", task.model);
        }
        if self.timing_out.contains(&task.model) {
            return Err(ProbeError::Timeout(delay));
        }
        if self.failing.contains(&task.model) {
            return Err(ProbeError::Http {
                status: 500,
                message: "simulated failure".to_string(),
            });
        }

        Ok(ProbeOutput::text(format!("reply from {}", task.model)))
    }
}
