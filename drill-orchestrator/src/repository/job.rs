//! Job Repository
//!
//! Handles all database operations related to jobs.

use drill_core::domain::job::{Job, JobOutcome, JobStatus};
use sqlx::PgPool;
use uuid::Uuid;

const JOB_COLUMNS: &str = r#"
    id, definition_id, definition_name, status, created_at, started_at,
    finished_at, duration_seconds, log_output, last_processed_backup_id
"#;

/// Create a new pending job for a definition
///
/// Fails with a unique violation when the definition already has an active job.
pub async fn create(
    pool: &PgPool,
    definition_id: Uuid,
    definition_name: &str,
) -> Result<Job, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = chrono::Utc::now();

    let job = Job {
        id,
        definition_id: Some(definition_id),
        definition_name: definition_name.to_string(),
        status: JobStatus::Pending,
        created_at: now,
        started_at: None,
        finished_at: None,
        duration_seconds: 0,
        log_output: String::new(),
        last_processed_backup_id: None,
    };

    sqlx::query(
        r#"
        INSERT INTO jobs (id, definition_id, definition_name, status, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(id)
    .bind(definition_id)
    .bind(definition_name)
    .bind(JobStatus::Pending.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(job)
}

/// Find a job by ID
pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Job>, sqlx::Error> {
    let row = sqlx::query_as::<_, JobRow>(&format!(
        "SELECT {} FROM jobs WHERE id = $1",
        JOB_COLUMNS
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|r| r.into()))
}

/// Count pending or running jobs of a definition
pub async fn count_active_for_definition(
    pool: &PgPool,
    definition_id: Uuid,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM jobs
        WHERE definition_id = $1 AND status IN ('PENDING', 'RUNNING')
        "#,
    )
    .bind(definition_id)
    .fetch_one(pool)
    .await
}

/// Pending and running jobs, newest first
pub async fn find_active(pool: &PgPool) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        SELECT {} FROM jobs
        WHERE status IN ('PENDING', 'RUNNING')
        ORDER BY created_at DESC
        "#,
        JOB_COLUMNS
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Finished jobs, most recently finished first
pub async fn find_history(pool: &PgPool, limit: i64) -> Result<Vec<Job>, sqlx::Error> {
    let rows = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        SELECT {} FROM jobs
        WHERE status IN ('SUCCESS', 'FAILED')
        ORDER BY finished_at DESC
        LIMIT $1
        "#,
        JOB_COLUMNS
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(|r| r.into()).collect())
}

/// Atomically take the oldest pending job and mark it running
///
/// Concurrent claimants skip rows locked by each other, so a job is handed out
/// at most once.
pub async fn claim_next(pool: &PgPool) -> Result<Option<Job>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<_, JobRow>(&format!(
        r#"
        SELECT {} FROM jobs
        WHERE status = 'PENDING'
        ORDER BY created_at ASC
        LIMIT 1
        FOR UPDATE SKIP LOCKED
        "#,
        JOB_COLUMNS
    ))
    .fetch_optional(&mut *tx)
    .await?;

    let Some(row) = row else {
        tx.commit().await?;
        return Ok(None);
    };

    let now = chrono::Utc::now();
    sqlx::query("UPDATE jobs SET status = $1, started_at = $2 WHERE id = $3")
        .bind(JobStatus::Running.as_str())
        .bind(now)
        .bind(row.id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let mut job: Job = row.into();
    job.status = JobStatus::Running;
    job.started_at = Some(now);
    Ok(Some(job))
}

/// Write the terminal state of a running job
///
/// Only the outcome columns are touched. Returns `false` when the job was not
/// running, leaving an already finished job untouched.
pub async fn record_outcome(
    pool: &PgPool,
    job_id: Uuid,
    outcome: &JobOutcome,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET status = $1, finished_at = $2, duration_seconds = $3,
            log_output = $4, last_processed_backup_id = $5
        WHERE id = $6 AND status = 'RUNNING'
        "#,
    )
    .bind(outcome.status.as_str())
    .bind(outcome.finished_at)
    .bind(outcome.duration_seconds)
    .bind(&outcome.log_output)
    .bind(&outcome.last_processed_backup_id)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fail RUNNING jobs started before the cutoff, appending a final log line
pub async fn fail_stale_running(pool: &PgPool, timeout_seconds: i64) -> Result<u64, sqlx::Error> {
    let cutoff_time = chrono::Utc::now() - chrono::Duration::seconds(timeout_seconds);
    let note = format!(
        "[{}] ERROR: No outcome reported within {}s, job marked as failed\n",
        chrono::Utc::now().format("%H:%M:%S"),
        timeout_seconds
    );

    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET status = $1, finished_at = NOW(),
            duration_seconds = GREATEST(EXTRACT(EPOCH FROM (NOW() - started_at))::BIGINT, 0),
            log_output = log_output || $2
        WHERE status = $3 AND started_at < $4
        "#,
    )
    .bind(JobStatus::Failed.as_str())
    .bind(note)
    .bind(JobStatus::Running.as_str())
    .bind(cutoff_time)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    definition_id: Option<Uuid>,
    definition_name: String,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
    started_at: Option<chrono::DateTime<chrono::Utc>>,
    finished_at: Option<chrono::DateTime<chrono::Utc>>,
    duration_seconds: i64,
    log_output: String,
    last_processed_backup_id: Option<String>,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        let status = row.status.parse().unwrap_or_else(|e| {
            tracing::warn!("Job {} has {}, treating as FAILED", row.id, e);
            JobStatus::Failed
        });

        Job {
            id: row.id,
            definition_id: row.definition_id,
            definition_name: row.definition_name,
            status,
            created_at: row.created_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
            duration_seconds: row.duration_seconds,
            log_output: row.log_output,
            last_processed_backup_id: row.last_processed_backup_id,
        }
    }
}
