//! Storage and notification target endpoints

use crate::error::Result;
use crate::{OrchestratorClient, handle_empty_response, handle_response};
use drill_core::domain::target::{NotificationTarget, StorageTarget};
use drill_core::dto::target::{
    ConnectionTestResult, CreateNotificationTarget, CreateStorageTarget,
};
use uuid::Uuid;

impl OrchestratorClient {
    // =============================================================================
    // Storage Targets
    // =============================================================================

    pub async fn create_storage(&self, req: &CreateStorageTarget) -> Result<StorageTarget> {
        let url = format!("{}/api/storage", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        handle_response(response).await
    }

    pub async fn list_storage(&self) -> Result<Vec<StorageTarget>> {
        let url = format!("{}/api/storage", self.base_url);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    /// Resolve storage targets by id
    ///
    /// Unknown ids are silently absent from the result.
    pub async fn lookup_storage(&self, ids: &[Uuid]) -> Result<Vec<StorageTarget>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/storage/lookup", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", join_ids(ids))])
            .send()
            .await?;

        handle_response(response).await
    }

    /// Ask the backup directory to verify a storage target's connection
    pub async fn test_storage(&self, id: Uuid) -> Result<ConnectionTestResult> {
        let url = format!("{}/api/storage/{}/test", self.base_url, id);
        let response = self.client.post(&url).send().await?;

        handle_response(response).await
    }

    pub async fn update_storage(
        &self,
        id: Uuid,
        req: &CreateStorageTarget,
    ) -> Result<StorageTarget> {
        let url = format!("{}/api/storage/{}", self.base_url, id);
        let response = self.client.put(&url).json(req).send().await?;

        handle_response(response).await
    }

    pub async fn delete_storage(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/api/storage/{}", self.base_url, id);
        let response = self.client.delete(&url).send().await?;

        handle_empty_response(response).await
    }

    // =============================================================================
    // Notification Targets
    // =============================================================================

    pub async fn create_notification(
        &self,
        req: &CreateNotificationTarget,
    ) -> Result<NotificationTarget> {
        let url = format!("{}/api/notifications", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        handle_response(response).await
    }

    pub async fn list_notifications(&self) -> Result<Vec<NotificationTarget>> {
        let url = format!("{}/api/notifications", self.base_url);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    /// Resolve notification targets by id
    pub async fn lookup_notifications(&self, ids: &[Uuid]) -> Result<Vec<NotificationTarget>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/api/notifications/lookup", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", join_ids(ids))])
            .send()
            .await?;

        handle_response(response).await
    }

    pub async fn update_notification(
        &self,
        id: Uuid,
        req: &CreateNotificationTarget,
    ) -> Result<NotificationTarget> {
        let url = format!("{}/api/notifications/{}", self.base_url, id);
        let response = self.client.put(&url).json(req).send().await?;

        handle_response(response).await
    }

    /// Send a test message through a notification target
    pub async fn test_notification(&self, id: Uuid) -> Result<ConnectionTestResult> {
        let url = format!("{}/api/notifications/{}/test", self.base_url, id);
        let response = self.client.post(&url).send().await?;

        handle_response(response).await
    }

    pub async fn delete_notification(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/api/notifications/{}", self.base_url, id);
        let response = self.client.delete(&url).send().await?;

        handle_empty_response(response).await
    }
}

fn join_ids(ids: &[Uuid]) -> String {
    ids.iter()
        .map(Uuid::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
