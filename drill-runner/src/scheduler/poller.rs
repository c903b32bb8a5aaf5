//! Job poller
//!
//! Claims pending jobs while a parallelism permit is free and runs each in
//! its own task. Empty polls and errors both wait for the next tick.

use anyhow::Result;
use drill_core::domain::job::JobOutcome;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::Scheduler;
use crate::queue::JobQueue;
use crate::service::Pipeline;

pub struct Worker {
    scheduler: Scheduler,
    queue: Arc<dyn JobQueue>,
    pipeline: Arc<Pipeline>,
    semaphore: Arc<Semaphore>,
}

impl Worker {
    pub fn new(scheduler: Scheduler, queue: Arc<dyn JobQueue>, pipeline: Arc<Pipeline>) -> Self {
        let semaphore = Arc::new(Semaphore::new(scheduler.max_parallel_jobs.max(1)));
        Self {
            scheduler,
            queue,
            pipeline,
            semaphore,
        }
    }

    /// Starts the polling loop
    pub async fn run(&self) {
        info!(
            "Starting job poller (interval: {:?}, max parallel jobs: {})",
            self.scheduler.interval, self.scheduler.max_parallel_jobs
        );

        loop {
            match self.poll_once().await {
                Ok(handles) if !handles.is_empty() => {
                    info!("Started {} job(s) this cycle", handles.len());
                }
                Ok(_) => debug!("No pending jobs"),
                Err(e) => error!("Error during poll cycle: {:#}", e),
            }

            tokio::time::sleep(self.scheduler.next_delay()).await;
        }
    }

    /// Claims as many jobs as there are free permits
    ///
    /// A job is only claimed once a permit is held, so nothing sits claimed
    /// but waiting. The returned handles resolve to each job's outcome.
    pub async fn poll_once(&self) -> Result<Vec<JoinHandle<JobOutcome>>> {
        let mut handles = Vec::new();

        loop {
            let Ok(permit) = Arc::clone(&self.semaphore).try_acquire_owned() else {
                debug!("Max parallel jobs reached, not claiming");
                break;
            };

            let claimed = match self.queue.claim_next().await {
                Ok(Some(claimed)) => claimed,
                Ok(None) => break,
                Err(e) if handles.is_empty() => return Err(e),
                Err(e) => {
                    warn!("Claim failed after starting {} job(s): {:#}", handles.len(), e);
                    break;
                }
            };

            info!(
                "Claimed job {} ({})",
                claimed.job.id, claimed.job.definition_name
            );

            let pipeline = Arc::clone(&self.pipeline);
            handles.push(tokio::spawn(async move {
                let outcome = pipeline.run(claimed).await;
                // Permit is released only once the job is fully recorded
                drop(permit);
                outcome
            }));
        }

        Ok(handles)
    }
}
