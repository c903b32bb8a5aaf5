//! Scheduler layer for the runner
//!
//! Polls the queue and hands claimed jobs to the pipeline, never running more
//! than `max_parallel_jobs` at once.

pub mod poller;

pub use poller::Worker;

use rand::Rng;
use std::time::Duration;

/// Poll cadence and parallelism of a worker
#[derive(Debug, Clone)]
pub struct Scheduler {
    pub interval: Duration,
    /// Random extra delay added to each sleep, up to this bound
    pub jitter: Duration,
    pub max_parallel_jobs: usize,
}

impl Scheduler {
    /// Delay before the next poll
    pub fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.interval;
        }
        self.interval + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}
