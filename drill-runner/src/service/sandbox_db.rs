//! Direct access to a sandbox database
//!
//! Readiness probing, user scripts and the data-landing probe all go through
//! short-lived connections opened per call.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{Connection, Executor};
use std::time::Duration;

use crate::service::sandbox::Sandbox;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait SandboxDatabase: Send + Sync {
    /// Opens a connection and pings the server
    async fn ping(&self, sandbox: &Sandbox) -> Result<()>;

    /// Runs a (possibly multi-statement) SQL script
    async fn execute_script(&self, sandbox: &Sandbox, script: &str) -> Result<()>;

    /// Number of tables outside the system schemas
    async fn user_table_count(&self, sandbox: &Sandbox) -> Result<i64>;
}

/// Postgres implementation over `sqlx`
#[derive(Debug, Default, Clone)]
pub struct PgSandboxDatabase;

impl PgSandboxDatabase {
    pub fn new() -> Self {
        Self
    }

    async fn connect(&self, sandbox: &Sandbox) -> Result<PgConnection> {
        let options = PgConnectOptions::new()
            .host(&sandbox.host)
            .port(sandbox.port)
            .username(&sandbox.user)
            .password(&sandbox.password)
            .database(&sandbox.database)
            .ssl_mode(PgSslMode::Disable);

        tokio::time::timeout(CONNECT_TIMEOUT, PgConnection::connect_with(&options))
            .await
            .context("Timed out connecting to sandbox database")?
            .with_context(|| {
                format!(
                    "Failed to connect to sandbox database at {}:{}",
                    sandbox.host, sandbox.port
                )
            })
    }
}

#[async_trait]
impl SandboxDatabase for PgSandboxDatabase {
    async fn ping(&self, sandbox: &Sandbox) -> Result<()> {
        let mut conn = self.connect(sandbox).await?;
        conn.ping().await.context("Ping failed")?;
        conn.close().await.ok();
        Ok(())
    }

    async fn execute_script(&self, sandbox: &Sandbox, script: &str) -> Result<()> {
        let mut conn = self.connect(sandbox).await?;
        let result = conn.execute(sqlx::raw_sql(script)).await;
        conn.close().await.ok();
        result?;
        Ok(())
    }

    async fn user_table_count(&self, sandbox: &Sandbox) -> Result<i64> {
        let mut conn = self.connect(sandbox).await?;
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM information_schema.tables
            WHERE table_schema NOT IN ('pg_catalog', 'information_schema')
              AND table_type = 'BASE TABLE'
            "#,
        )
        .fetch_one(&mut conn)
        .await
        .context("Failed to count user tables")?;
        conn.close().await.ok();
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_sandbox() -> Sandbox {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|l| l.local_addr())
            .map(|a| a.port())
            .unwrap();
        Sandbox {
            container_id: "abc123".into(),
            container_name: "drill_job_test".into(),
            host: "127.0.0.1".into(),
            port,
            user: "postgres".into(),
            password: "postgres".into(),
            database: "postgres".into(),
            version: "16".into(),
        }
    }

    #[tokio::test]
    async fn test_execute_script_reports_connection_failure() {
        let db = PgSandboxDatabase::new();
        let err = db
            .execute_script(&unreachable_sandbox(), "SELECT 1; SELECT 2;")
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("sandbox database"));
    }

    #[tokio::test]
    async fn test_user_table_count_reports_connection_failure() {
        let db = PgSandboxDatabase::new();
        assert!(db.user_table_count(&unreachable_sandbox()).await.is_err());
    }
}
