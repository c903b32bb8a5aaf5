//! Restore pipeline
//!
//! Runs one claimed job through the restore stages:
//! - resolve the latest backup and the engine version
//! - provision a sandbox and wait until it accepts connections
//! - run the pre-restore script, trigger the remote restore, wait for data
//! - run the validation script and archive the artifact to every storage target
//!
//! Stages are strictly sequential and fail fast. Whatever happens, the sandbox
//! is torn down once, the outcome is recorded and notifications are attempted.

use anyhow::Result;
use drill_client::{ClientError, RestoreTarget};
use drill_core::domain::backup::Backup;
use drill_core::domain::definition::TestDefinition;
use drill_core::domain::job::{JobOutcome, JobStatus};
use drill_core::dto::job::{ClaimedJob, OutcomeReceipt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::context::JobLog;
use crate::queue::{JobQueue, TargetRegistry};
use crate::service::directory::BackupDirectory;
use crate::service::notify::{Notifier, compose_message, compose_subject};
use crate::service::sandbox::{Sandbox, SandboxError, SandboxManager};
use crate::service::sandbox_db::SandboxDatabase;
use crate::service::upload::{ArtifactUploader, locate_artifact, remote_artifact_name};

const MAX_SETTLE_BACKOFF: Duration = Duration::from_secs(8);
const MAX_RECORD_BACKOFF: Duration = Duration::from_secs(30);

/// Fatal stage failures; the message becomes the job's final log line
#[derive(Debug, Error)]
pub enum StageError {
    #[error("Test definition no longer exists")]
    DefinitionMissing,

    #[error("Failed to fetch backup: {0}")]
    BackupLookup(String),

    #[error("No backups found for this database")]
    NoBackups,

    #[error("Latest backup status is {0} (not COMPLETED)")]
    BackupNotReady(String),

    #[error("Failed to provision sandbox: {0}")]
    Provision(#[from] SandboxError),

    #[error("Timed out waiting for sandbox database")]
    NotReady,

    #[error("Pre-restore script failed: {0}")]
    PreRestore(String),

    #[error("Restore API failed: {0}")]
    Restore(String),

    #[error("VALIDATION FAILED: {0}")]
    Validation(String),

    #[error("Restore succeeded but archive failed: local artifact not found")]
    ArtifactMissing,

    #[error("Restore succeeded but archive failed: {0}")]
    TargetLookup(String),

    #[error("Restore succeeded but upload to {target} failed: {message}")]
    Upload { target: String, message: String },

    #[error("Job exceeded deadline of {}s", .0.as_secs())]
    Deadline(Duration),
}

/// Delays and bounds of the pipeline
#[derive(Debug, Clone)]
pub struct PipelineTimings {
    pub readiness_interval: Duration,
    pub readiness_max_retries: u32,
    /// Upper bound of the wait for restored data
    pub settle_window: Duration,
    pub settle_initial_backoff: Duration,
    /// Deadline of the whole stage sequence
    pub job_timeout: Duration,
    /// First delay between attempts to record the outcome, doubled per retry
    pub record_initial_backoff: Duration,
    pub record_max_attempts: u32,
}

impl Default for PipelineTimings {
    fn default() -> Self {
        Self {
            readiness_interval: Duration::from_secs(2),
            readiness_max_retries: 15,
            settle_window: Duration::from_secs(30),
            settle_initial_backoff: Duration::from_secs(1),
            job_timeout: Duration::from_secs(3600),
            record_initial_backoff: Duration::from_millis(500),
            record_max_attempts: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub default_version: String,
    /// Sandbox host as seen by the backup directory
    pub restore_host: String,
    /// Directory holding the backup artifacts
    pub backup_path: PathBuf,
    pub timings: PipelineTimings,
}

/// Collaborators of the pipeline
#[derive(Clone)]
pub struct PipelineDeps {
    pub queue: Arc<dyn JobQueue>,
    pub registry: Arc<dyn TargetRegistry>,
    pub directory: Arc<dyn BackupDirectory>,
    pub sandboxes: Arc<dyn SandboxManager>,
    pub database: Arc<dyn SandboxDatabase>,
    pub uploader: Arc<dyn ArtifactUploader>,
    pub notifier: Arc<dyn Notifier>,
}

/// What the stages produced so far, kept across a deadline expiry
#[derive(Default)]
struct StageState {
    backup: Option<Backup>,
    /// True only while `provision` is in flight
    provisioning: bool,
    sandbox: Option<Sandbox>,
}

pub struct Pipeline {
    deps: PipelineDeps,
    settings: PipelineSettings,
}

impl Pipeline {
    pub fn new(deps: PipelineDeps, settings: PipelineSettings) -> Self {
        Self { deps, settings }
    }

    /// Executes a claimed job end to end and returns the recorded outcome
    pub async fn run(&self, claimed: ClaimedJob) -> JobOutcome {
        let job = claimed.job;
        let log = JobLog::new(job.id);
        log.info(format!("Starting restore test: {}", job.definition_name));

        let (status, message, backup_id) = match &claimed.definition {
            Some(definition) => self.execute(job.id, definition, &log).await,
            None => {
                let err = StageError::DefinitionMissing;
                log.error(err.to_string());
                (JobStatus::Failed, err.to_string(), None)
            }
        };

        log.info(format!("Process completed with status: {}", status));
        let outcome = JobOutcome::finish(job.started_at, status, log.render(), backup_id);

        match self.record_with_retry(job.id, &outcome).await {
            Ok(receipt) => {
                if status == JobStatus::Success && !receipt.definition_updated {
                    warn!(
                        job_id = %job.id,
                        "Definition was not updated with the processed backup"
                    );
                }
            }
            Err(e) => error!(job_id = %job.id, "{:#}", e),
        }

        if let Some(definition) = &claimed.definition {
            self.notify(job.id, definition, status, &message).await;
        }

        outcome
    }

    /// Records the outcome with bounded exponential backoff
    ///
    /// A job left RUNNING blocks every later enqueue of its definition, so
    /// transient failures are retried; 4xx answers are final.
    async fn record_with_retry(&self, job_id: Uuid, outcome: &JobOutcome) -> Result<OutcomeReceipt> {
        let timings = &self.settings.timings;
        let max_attempts = timings.record_max_attempts.max(1);
        let mut delay = timings.record_initial_backoff;
        let mut attempt = 1;

        loop {
            match self.deps.queue.record_outcome(job_id, outcome).await {
                Ok(receipt) => return Ok(receipt),
                Err(e) => {
                    let rejected = e
                        .chain()
                        .filter_map(|cause| cause.downcast_ref::<ClientError>())
                        .any(ClientError::is_client_error);
                    if rejected || attempt >= max_attempts {
                        return Err(e);
                    }
                    warn!(
                        job_id = %job_id,
                        "Failed to record outcome (attempt {}/{}): {:#}. Retrying in {:?}",
                        attempt, max_attempts, e, delay
                    );
                    sleep(delay).await;
                    delay = (delay * 2).min(MAX_RECORD_BACKOFF);
                    attempt += 1;
                }
            }
        }
    }

    /// Stages under the job deadline, then teardown
    async fn execute(
        &self,
        job_id: Uuid,
        definition: &TestDefinition,
        log: &JobLog,
    ) -> (JobStatus, String, Option<String>) {
        let mut state = StageState::default();
        let deadline = self.settings.timings.job_timeout;

        let result = match tokio::time::timeout(
            deadline,
            self.run_stages(job_id, definition, log, &mut state),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StageError::Deadline(deadline)),
        };

        if let Err(e) = &result {
            log.error(e.to_string());
        }

        match state.sandbox.take() {
            Some(sandbox) => self.teardown(&sandbox, log).await,
            None if state.provisioning => self.discard(job_id, log).await,
            None => {}
        }

        let backup_id = state.backup.map(|b| b.id);
        match result {
            Ok(message) => (JobStatus::Success, message, backup_id),
            Err(e) => (JobStatus::Failed, e.to_string(), backup_id),
        }
    }

    async fn run_stages(
        &self,
        job_id: Uuid,
        definition: &TestDefinition,
        log: &JobLog,
        state: &mut StageState,
    ) -> Result<String, StageError> {
        let directory = &self.deps.directory;

        log.info(format!(
            "Fetching latest backup for database {}...",
            definition.source_database_name
        ));
        let backup = directory
            .latest_backup(&definition.source_database_id)
            .await
            .map_err(|e| StageError::BackupLookup(format!("{:#}", e)))?
            .ok_or(StageError::NoBackups)?;
        log.info(format!(
            "Found backup ID: {} (Status: {})",
            backup.id, backup.status
        ));
        let backup = state.backup.insert(backup).clone();
        if !backup.is_completed() {
            return Err(StageError::BackupNotReady(backup.status));
        }

        let version = self.resolve_version(definition, log).await;
        log.info(format!("Target PostgreSQL version: {}", version));

        log.info(format!(
            "Spawning temporary Postgres {} container...",
            version
        ));
        state.provisioning = true;
        let provisioned = self.deps.sandboxes.provision(job_id, &version).await;
        state.provisioning = false;
        let sandbox = provisioned?;
        log.info(format!(
            "Container created. Port {}, database {}",
            sandbox.port, sandbox.database
        ));
        let sandbox = state.sandbox.insert(sandbox).clone();

        self.await_ready(&sandbox, log).await?;

        if let Some(script) = non_blank(&definition.pre_restore_script) {
            log.info("Running pre-restore script...");
            self.deps
                .database
                .execute_script(&sandbox, script)
                .await
                .map_err(|e| StageError::PreRestore(format!("{:#}", e)))?;
            log.info("Pre-restore script completed.");
        }

        log.info("Triggering restore API...");
        let target = RestoreTarget {
            host: self.settings.restore_host.clone(),
            port: sandbox.port,
            username: sandbox.user.clone(),
            password: sandbox.password.clone(),
            database: sandbox.database.clone(),
        };
        directory
            .trigger_restore(&backup.id, &target)
            .await
            .map_err(|e| StageError::Restore(format!("{:#}", e)))?;
        log.info(format!("Restore triggered for backup {}", backup.id));

        self.await_data(&sandbox, log).await;

        match non_blank(&definition.post_restore_script) {
            Some(script) => {
                log.info("Running post-restore validation...");
                self.deps
                    .database
                    .execute_script(&sandbox, script)
                    .await
                    .map_err(|e| StageError::Validation(format!("{:#}", e)))?;
                log.info("Validation passed.");
            }
            None => log.info("No validation script configured, skipping validation"),
        }

        self.archive(definition, &backup, log).await?;

        Ok(format!("Backup {} validated successfully.", backup.id))
    }

    /// Best effort; falls back to the configured default version
    async fn resolve_version(&self, definition: &TestDefinition, log: &JobLog) -> String {
        let default = &self.settings.default_version;
        match self
            .deps
            .directory
            .database_version(&definition.workspace_id, &definition.source_database_id)
            .await
        {
            Ok(Some(version)) => version,
            Ok(None) => {
                log.warn(format!("Failed to get version, defaulting to {}", default));
                default.clone()
            }
            Err(e) => {
                log.warn(format!(
                    "Failed to get version ({:#}), defaulting to {}",
                    e, default
                ));
                default.clone()
            }
        }
    }

    async fn await_ready(&self, sandbox: &Sandbox, log: &JobLog) -> Result<(), StageError> {
        let timings = &self.settings.timings;
        log.info("Waiting for sandbox database to be ready...");

        for attempt in 1..=timings.readiness_max_retries {
            match self.deps.database.ping(sandbox).await {
                Ok(()) => {
                    log.info("Connected to temporary database.");
                    return Ok(());
                }
                Err(e) => debug!(
                    "Sandbox {} not ready (attempt {}/{}): {:#}",
                    sandbox.container_name, attempt, timings.readiness_max_retries, e
                ),
            }

            if attempt < timings.readiness_max_retries {
                sleep(timings.readiness_interval).await;
            }
        }

        Err(StageError::NotReady)
    }

    /// Waits for the restore to land, never failing the job
    ///
    /// Polls the user table count with exponential backoff until it is
    /// non-zero and unchanged between two polls. When the count cannot be
    /// queried the whole settle window is waited instead.
    async fn await_data(&self, sandbox: &Sandbox, log: &JobLog) {
        let timings = &self.settings.timings;
        let window = timings.settle_window;
        log.info(format!(
            "Waiting for restored data (up to {}s)...",
            window.as_secs()
        ));

        let started = Instant::now();
        let mut backoff = timings.settle_initial_backoff;
        let mut last_count: Option<i64> = None;

        loop {
            match self.deps.database.user_table_count(sandbox).await {
                Ok(count) if count > 0 && last_count == Some(count) => {
                    log.info(format!("Restored data detected ({} tables).", count));
                    return;
                }
                Ok(count) => last_count = Some(count),
                Err(e) => {
                    log.warn(format!(
                        "Cannot observe restored data ({:#}), waiting out the full window",
                        e
                    ));
                    sleep(window.saturating_sub(started.elapsed())).await;
                    return;
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= window {
                log.warn("Restored data not observed within the settle window, continuing");
                return;
            }

            sleep(backoff.min(window - elapsed)).await;
            backoff = (backoff * 2).min(MAX_SETTLE_BACKOFF);
        }
    }

    async fn archive(
        &self,
        definition: &TestDefinition,
        backup: &Backup,
        log: &JobLog,
    ) -> Result<(), StageError> {
        if definition.storage_ids.is_empty() {
            log.info("No storage targets configured, skipping archive");
            return Ok(());
        }

        log.info("Starting upload process...");
        let backup_path = &self.settings.backup_path;
        let local = match locate_artifact(backup_path, &backup.id).await {
            Ok(Some(path)) => path,
            Ok(None) => {
                log.warn(format!(
                    "No file matching {}* in {}; is BACKUP_PATH the directory's backup volume?",
                    backup.id,
                    backup_path.display()
                ));
                return Err(StageError::ArtifactMissing);
            }
            Err(e) => {
                log.warn(format!(
                    "Cannot read backup path {}: {}",
                    backup_path.display(),
                    e
                ));
                return Err(StageError::ArtifactMissing);
            }
        };
        log.info(format!("Found local backup file: {}", local.display()));

        let remote_name = remote_artifact_name(&definition.source_database_name, backup.created_at);
        log.info(format!("Uploading as: {}", remote_name));

        let targets = self
            .deps
            .registry
            .storage_targets(&definition.storage_ids)
            .await
            .map_err(|e| StageError::TargetLookup(format!("{:#}", e)))?;

        let mut first_failure = None;
        for id in &definition.storage_ids {
            let Some(target) = targets.iter().find(|t| t.id == *id) else {
                log.error(format!("Storage target {} no longer exists", id));
                if first_failure.is_none() {
                    first_failure = Some(StageError::Upload {
                        target: id.to_string(),
                        message: "target no longer exists".to_string(),
                    });
                }
                continue;
            };

            log.info(format!("Uploading to {} ({})...", target.name, target.kind));
            match self.deps.uploader.upload(target, &local, &remote_name).await {
                Ok(()) => log.info(format!("Upload to {} succeeded.", target.name)),
                Err(e) => {
                    log.error(format!("Upload to {} failed: {}", target.name, e));
                    if first_failure.is_none() {
                        first_failure = Some(StageError::Upload {
                            target: target.name.clone(),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        match first_failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn teardown(&self, sandbox: &Sandbox, log: &JobLog) {
        log.info(format!(
            "Cleaning up: stopping container {}...",
            sandbox.container_name
        ));
        match self.deps.sandboxes.teardown(sandbox).await {
            Ok(()) => log.info("Container removed."),
            Err(e) => log.warn(format!(
                "Failed to remove container {}: {}",
                sandbox.container_name, e
            )),
        }
    }

    /// Provisioning was cut short, so no sandbox handle exists
    async fn discard(&self, job_id: Uuid, log: &JobLog) {
        log.info("Cleaning up: removing partially provisioned container...");
        match self.deps.sandboxes.discard(job_id).await {
            Ok(()) => log.info("Container removed."),
            Err(e) => log.warn(format!("Failed to remove container: {}", e)),
        }
    }

    /// Sends the result to every notification target; failures are only logged
    async fn notify(
        &self,
        job_id: Uuid,
        definition: &TestDefinition,
        status: JobStatus,
        message: &str,
    ) {
        if definition.notification_ids.is_empty() {
            return;
        }

        let targets = match self
            .deps
            .registry
            .notification_targets(&definition.notification_ids)
            .await
        {
            Ok(targets) => targets,
            Err(e) => {
                warn!(job_id = %job_id, "Skipping notifications: {:#}", e);
                return;
            }
        };

        let subject = compose_subject(status);
        let body = compose_message(status, &definition.name, message);
        let ordered = definition
            .notification_ids
            .iter()
            .filter_map(|id| targets.iter().find(|t| t.id == *id));
        for target in ordered {
            match self.deps.notifier.send(target, &subject, &body).await {
                Ok(()) => debug!(job_id = %job_id, "Notification sent to {}", target.name),
                Err(e) => warn!(
                    job_id = %job_id,
                    "Failed to notify {} ({}): {}", target.name, target.kind, e
                ),
            }
        }
    }
}

fn non_blank(script: &Option<String>) -> Option<&str> {
    script.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(&None), None);
        assert_eq!(non_blank(&Some("  \n".into())), None);
        assert_eq!(non_blank(&Some(" SELECT 1 ".into())), Some("SELECT 1"));
    }

    #[test]
    fn test_stage_error_messages() {
        assert_eq!(
            StageError::Deadline(Duration::from_secs(3600)).to_string(),
            "Job exceeded deadline of 3600s"
        );
        assert_eq!(
            StageError::BackupNotReady("FAILED".into()).to_string(),
            "Latest backup status is FAILED (not COMPLETED)"
        );
        assert_eq!(
            StageError::Upload {
                target: "s3-eu".into(),
                message: "access denied".into()
            }
            .to_string(),
            "Restore succeeded but upload to s3-eu failed: access denied"
        );
    }
}
