use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Create test definitions table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS test_definitions (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            workspace_id VARCHAR(255) NOT NULL,
            source_database_id VARCHAR(255) NOT NULL,
            source_database_name VARCHAR(255) NOT NULL,
            pre_restore_script TEXT,
            post_restore_script TEXT,
            storage_ids UUID[] NOT NULL DEFAULT '{}',
            notification_ids UUID[] NOT NULL DEFAULT '{}',
            last_processed_backup_id VARCHAR(255),
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create target tables
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS storage_targets (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            kind VARCHAR(20) NOT NULL,
            config JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notification_targets (
            id UUID PRIMARY KEY,
            name VARCHAR(255) NOT NULL,
            kind VARCHAR(20) NOT NULL,
            config JSONB NOT NULL DEFAULT '{}',
            created_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create jobs table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS jobs (
            id UUID PRIMARY KEY,
            definition_id UUID REFERENCES test_definitions(id) ON DELETE SET NULL,
            definition_name VARCHAR(255) NOT NULL,
            status VARCHAR(20) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            started_at TIMESTAMPTZ,
            finished_at TIMESTAMPTZ,
            duration_seconds BIGINT NOT NULL DEFAULT 0,
            log_output TEXT NOT NULL DEFAULT '',
            last_processed_backup_id VARCHAR(255)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for queue queries
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_status_created ON jobs(status, created_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_jobs_finished_at ON jobs(finished_at DESC)")
        .execute(pool)
        .await?;

    // At most one pending or running job per definition
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_jobs_one_active_per_definition
        ON jobs(definition_id)
        WHERE status IN ('PENDING', 'RUNNING')
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
