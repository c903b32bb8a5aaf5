//! Backup directory seam
//!
//! The pipeline only needs three calls from the directory service.

use anyhow::Result;
use async_trait::async_trait;
use drill_client::{DirectoryClient, RestoreTarget};
use drill_core::domain::backup::Backup;

#[async_trait]
pub trait BackupDirectory: Send + Sync {
    /// Most recent backup of the source database
    async fn latest_backup(&self, database_id: &str) -> Result<Option<Backup>>;

    /// Engine version of the source database, when the directory knows it
    async fn database_version(&self, workspace_id: &str, database_id: &str)
    -> Result<Option<String>>;

    async fn trigger_restore(&self, backup_id: &str, target: &RestoreTarget) -> Result<()>;
}

#[async_trait]
impl BackupDirectory for DirectoryClient {
    async fn latest_backup(&self, database_id: &str) -> Result<Option<Backup>> {
        Ok(DirectoryClient::latest_backup(self, database_id).await?)
    }

    async fn database_version(
        &self,
        workspace_id: &str,
        database_id: &str,
    ) -> Result<Option<String>> {
        Ok(DirectoryClient::database_version(self, workspace_id, database_id).await?)
    }

    async fn trigger_restore(&self, backup_id: &str, target: &RestoreTarget) -> Result<()> {
        Ok(DirectoryClient::trigger_restore(self, backup_id, target).await?)
    }
}
