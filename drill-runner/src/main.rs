//! Drill Runner
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Queue: HTTP communication with the orchestrator (claims, outcomes, targets)
//! - Services: The restore pipeline and the capabilities it drives
//! - Scheduler: Job polling and parallelism
//!
//! The runner polls the orchestrator for pending jobs, restores each job's
//! latest backup into a throwaway sandbox, validates and archives it, and
//! reports the outcome.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drill_client::{DirectoryClient, DirectoryConfig, OrchestratorClient};
use drill_runner::config::Config;
use drill_runner::podman::ContainerRuntime;
use drill_runner::scheduler::Worker;
use drill_runner::service::{
    ChannelNotifier, ContainerSandboxManager, PgSandboxDatabase, Pipeline, PipelineDeps,
    StorageUploader,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drill_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Drill Runner");

    // Load configuration
    let config = load_config()?;
    info!(
        "Loaded configuration: orchestrator_url={}, directory_url={}, backup_path={}",
        config.orchestrator_url,
        config.directory_url,
        config.backup_path.display()
    );

    let orchestrator = Arc::new(OrchestratorClient::new(config.orchestrator_url.clone()));
    wait_for_orchestrator(&orchestrator).await?;

    let directory = Arc::new(DirectoryClient::new(DirectoryConfig {
        base_url: config.directory_url.clone(),
        email: config.directory_email.clone(),
        password: config.directory_password.clone(),
    }));
    if !directory.health().await {
        warn!(
            "Backup directory at {} is not healthy yet; jobs will fail until it is",
            config.directory_url
        );
    }

    let runtime = ContainerRuntime::new(config.container_runtime.clone());
    runtime
        .check_available()
        .await
        .context("Container runtime is required to provision sandboxes")?;

    let deps = PipelineDeps {
        queue: orchestrator.clone(),
        registry: orchestrator.clone(),
        directory,
        sandboxes: Arc::new(ContainerSandboxManager::new(
            runtime,
            config.sandbox_settings(),
        )),
        database: Arc::new(PgSandboxDatabase::new()),
        uploader: Arc::new(StorageUploader::new(config.upload_timeout)),
        notifier: Arc::new(
            ChannelNotifier::new().context("Failed to build notification HTTP client")?,
        ),
    };
    let pipeline = Arc::new(Pipeline::new(deps, config.pipeline_settings()));

    info!("Services initialized");

    let worker = Worker::new(config.scheduler(), orchestrator, pipeline);
    worker.run().await;

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            info!("Failed to load config from environment ({}), using defaults", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Waits for the orchestrator with exponential backoff
///
/// The orchestrator may not be ready yet when the runner starts (common in
/// container environments).
async fn wait_for_orchestrator(client: &OrchestratorClient) -> Result<()> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match client.health().await {
            Ok(()) => {
                if attempt > 1 {
                    info!("Orchestrator reachable after {} attempt(s)", attempt);
                }
                return Ok(());
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    error!(
                        "Orchestrator unreachable after {} attempts",
                        MAX_RETRIES
                    );
                    return Err(anyhow::anyhow!(
                        "Orchestrator at {} is unreachable: {}",
                        client.base_url(),
                        e
                    ));
                }

                warn!(
                    "Orchestrator not reachable (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                // Exponential backoff with cap
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}
