//! Orchestrator seams
//!
//! The runner reaches the job queue and the target registry only through
//! these traits; `OrchestratorClient` is the production implementation.

use anyhow::{Context, Result};
use async_trait::async_trait;
use drill_client::OrchestratorClient;
use drill_core::domain::job::JobOutcome;
use drill_core::domain::target::{NotificationTarget, StorageTarget};
use drill_core::dto::job::{ClaimedJob, OutcomeReceipt};
use uuid::Uuid;

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Oldest pending job, now marked running; `None` when the queue is empty
    async fn claim_next(&self) -> Result<Option<ClaimedJob>>;

    async fn record_outcome(&self, job_id: Uuid, outcome: &JobOutcome) -> Result<OutcomeReceipt>;
}

/// Targets resolved by id at the point of use
#[async_trait]
pub trait TargetRegistry: Send + Sync {
    async fn storage_targets(&self, ids: &[Uuid]) -> Result<Vec<StorageTarget>>;

    async fn notification_targets(&self, ids: &[Uuid]) -> Result<Vec<NotificationTarget>>;
}

#[async_trait]
impl JobQueue for OrchestratorClient {
    async fn claim_next(&self) -> Result<Option<ClaimedJob>> {
        OrchestratorClient::claim_next(self)
            .await
            .context("Failed to claim next job")
    }

    async fn record_outcome(&self, job_id: Uuid, outcome: &JobOutcome) -> Result<OutcomeReceipt> {
        self.complete_job(job_id, outcome)
            .await
            .with_context(|| format!("Failed to record outcome of job {}", job_id))
    }
}

#[async_trait]
impl TargetRegistry for OrchestratorClient {
    async fn storage_targets(&self, ids: &[Uuid]) -> Result<Vec<StorageTarget>> {
        self.lookup_storage(ids)
            .await
            .context("Failed to look up storage targets")
    }

    async fn notification_targets(&self, ids: &[Uuid]) -> Result<Vec<NotificationTarget>> {
        self.lookup_notifications(ids)
            .await
            .context("Failed to look up notification targets")
    }
}
