//! Job queue endpoints

use crate::error::Result;
use crate::{OrchestratorClient, handle_response};
use drill_core::domain::job::{Job, JobOutcome};
use drill_core::dto::job::{ClaimedJob, OutcomeReceipt};
use reqwest::StatusCode;
use uuid::Uuid;

impl OrchestratorClient {
    // =============================================================================
    // Admission
    // =============================================================================

    /// Queue a run of a test definition
    ///
    /// Fails with a 409 [`ApiError`](crate::ClientError::ApiError) when the
    /// definition already has a pending or running job.
    ///
    /// # Example
    /// ```no_run
    /// # use drill_client::OrchestratorClient;
    /// # use uuid::Uuid;
    /// # async fn example() -> anyhow::Result<()> {
    /// let client = OrchestratorClient::new("http://localhost:8080");
    /// match client.enqueue(Uuid::new_v4()).await {
    ///     Ok(job) => println!("queued {}", job.id),
    ///     Err(e) if e.is_conflict() => println!("already running"),
    ///     Err(e) => return Err(e.into()),
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn enqueue(&self, definition_id: Uuid) -> Result<Job> {
        let url = format!("{}/api/definitions/{}/run", self.base_url, definition_id);
        let response = self.client.post(&url).send().await?;

        handle_response(response).await
    }

    // =============================================================================
    // Queries
    // =============================================================================

    /// Get a job by ID
    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        let url = format!("{}/api/jobs/{}", self.base_url, job_id);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    /// Pending and running jobs, newest first
    pub async fn active_jobs(&self) -> Result<Vec<Job>> {
        let url = format!("{}/api/jobs/active", self.base_url);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    /// Finished jobs, most recently finished first
    ///
    /// The orchestrator clamps `limit` to 1..=500.
    pub async fn job_history(&self, limit: Option<i64>) -> Result<Vec<Job>> {
        let url = format!("{}/api/jobs/history", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        let response = request.send().await?;

        handle_response(response).await
    }

    // =============================================================================
    // Runner Lifecycle
    // =============================================================================

    /// Claim the oldest pending job
    ///
    /// Returns `None` when the queue is empty.
    pub async fn claim_next(&self) -> Result<Option<ClaimedJob>> {
        let url = format!("{}/api/jobs/claim", self.base_url);
        let response = self.client.post(&url).send().await?;

        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        handle_response(response).await.map(Some)
    }

    /// Record the terminal state of a running job
    pub async fn complete_job(&self, job_id: Uuid, outcome: &JobOutcome) -> Result<OutcomeReceipt> {
        let url = format!("{}/api/jobs/{}/complete", self.base_url, job_id);
        let response = self.client.post(&url).json(outcome).send().await?;

        handle_response(response).await
    }
}
