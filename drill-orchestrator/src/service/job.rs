//! Job Service
//!
//! The job queue: admission, claiming and outcome recording.

use drill_core::domain::job::{Job, JobOutcome, JobStatus};
use drill_core::dto::job::{ClaimedJob, OutcomeReceipt};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{definition_repository, job_repository};

pub const DEFAULT_HISTORY_LIMIT: i64 = 20;
pub const MAX_HISTORY_LIMIT: i64 = 500;

/// Service error type
#[derive(Debug)]
pub enum JobError {
    NotFound(Uuid),
    DefinitionNotFound(Uuid),
    /// The definition already has a pending or running job
    Duplicate(Uuid),
    InvalidState(String),
    ValidationError(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for JobError {
    fn from(err: sqlx::Error) -> Self {
        JobError::DatabaseError(err)
    }
}

/// Queue a run of a test definition
///
/// Rejected when the definition already has a pending or running job. The
/// unique index on active jobs backs the pre-check against concurrent enqueues.
pub async fn enqueue(pool: &PgPool, definition_id: Uuid) -> Result<Job, JobError> {
    let definition = definition_repository::find_by_id(pool, definition_id)
        .await?
        .ok_or(JobError::DefinitionNotFound(definition_id))?;

    if job_repository::count_active_for_definition(pool, definition_id).await? > 0 {
        return Err(JobError::Duplicate(definition_id));
    }

    let job = match job_repository::create(pool, definition_id, &definition.name).await {
        Ok(job) => job,
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Err(JobError::Duplicate(definition_id));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(
        "Job {} queued for definition {} ({})",
        job.id,
        definition_id,
        definition.name
    );

    Ok(job)
}

/// Get a job by ID
pub async fn get_job(pool: &PgPool, id: Uuid) -> Result<Job, JobError> {
    let job = job_repository::find_by_id(pool, id)
        .await?
        .ok_or(JobError::NotFound(id))?;

    Ok(job)
}

/// Pending and running jobs, newest first
pub async fn active_jobs(pool: &PgPool) -> Result<Vec<Job>, JobError> {
    let jobs = job_repository::find_active(pool).await?;
    Ok(jobs)
}

/// Finished jobs, most recently finished first
pub async fn job_history(pool: &PgPool, limit: Option<i64>) -> Result<Vec<Job>, JobError> {
    let jobs = job_repository::find_history(pool, clamp_history_limit(limit)).await?;
    Ok(jobs)
}

/// Claim the oldest pending job together with its definition snapshot
pub async fn claim_next(pool: &PgPool) -> Result<Option<ClaimedJob>, JobError> {
    let Some(job) = job_repository::claim_next(pool).await? else {
        return Ok(None);
    };

    let definition = match job.definition_id {
        Some(id) => definition_repository::find_by_id(pool, id).await?,
        None => None,
    };

    if definition.is_none() {
        tracing::warn!("Job {} claimed but its definition no longer exists", job.id);
    } else {
        tracing::info!("Job {} claimed", job.id);
    }

    Ok(Some(ClaimedJob { job, definition }))
}

/// Record the terminal state of a running job
///
/// On success the processed backup id is propagated onto the definition when
/// it still exists.
pub async fn record_outcome(
    pool: &PgPool,
    job_id: Uuid,
    outcome: JobOutcome,
) -> Result<OutcomeReceipt, JobError> {
    validate_outcome_status(outcome.status)?;

    let job = job_repository::find_by_id(pool, job_id)
        .await?
        .ok_or(JobError::NotFound(job_id))?;

    if job_repository::record_outcome(pool, job_id, &outcome).await? {
        tracing::info!("Job {} finished with status: {}", job_id, outcome.status);
    } else if is_replay(&job, &outcome) {
        // The runner retries when the first acknowledgement got lost
        tracing::info!("Job {} outcome already recorded, acknowledging again", job_id);
    } else {
        return Err(JobError::InvalidState(format!(
            "Job {} is not RUNNING (current: {})",
            job_id, job.status
        )));
    }

    let mut definition_updated = false;
    if outcome.status == JobStatus::Success {
        if let (Some(definition_id), Some(backup_id)) =
            (job.definition_id, outcome.last_processed_backup_id.as_deref())
        {
            definition_updated =
                definition_repository::update_last_backup(pool, definition_id, backup_id).await?;
        }

        if !definition_updated {
            tracing::warn!(
                "Job {} succeeded but its definition could not be updated with the processed backup",
                job_id
            );
        }
    }

    Ok(OutcomeReceipt { definition_updated })
}

/// Fail running jobs whose runner stopped reporting
///
/// A job that stays RUNNING blocks every later enqueue of its definition.
/// Returns the number of jobs failed.
pub async fn expire_stale_jobs(pool: &PgPool, timeout_seconds: i64) -> Result<u64, JobError> {
    let expired = job_repository::fail_stale_running(pool, timeout_seconds).await?;
    if expired > 0 {
        tracing::warn!(
            "Failed {} job(s) running for more than {}s",
            expired,
            timeout_seconds
        );
    }
    Ok(expired)
}

// =============================================================================
// Validation
// =============================================================================

fn is_replay(job: &Job, outcome: &JobOutcome) -> bool {
    job.status == outcome.status && job.last_processed_backup_id == outcome.last_processed_backup_id
}

fn validate_outcome_status(status: JobStatus) -> Result<(), JobError> {
    if status.is_terminal() {
        Ok(())
    } else {
        Err(JobError::ValidationError(format!(
            "Invalid completion status: {}",
            status
        )))
    }
}

fn clamp_history_limit(limit: Option<i64>) -> i64 {
    limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_outcome_status_valid() {
        assert!(validate_outcome_status(JobStatus::Success).is_ok());
        assert!(validate_outcome_status(JobStatus::Failed).is_ok());
    }

    #[test]
    fn test_validate_outcome_status_invalid() {
        assert!(validate_outcome_status(JobStatus::Pending).is_err());
        assert!(validate_outcome_status(JobStatus::Running).is_err());
    }

    #[test]
    fn test_history_limit_defaults_and_clamps() {
        assert_eq!(clamp_history_limit(None), 20);
        assert_eq!(clamp_history_limit(Some(0)), 1);
        assert_eq!(clamp_history_limit(Some(-5)), 1);
        assert_eq!(clamp_history_limit(Some(75)), 75);
        assert_eq!(clamp_history_limit(Some(10_000)), 500);
    }
}
