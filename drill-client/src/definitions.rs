//! Test definition endpoints

use crate::error::Result;
use crate::{OrchestratorClient, handle_empty_response, handle_response};
use drill_core::domain::definition::TestDefinition;
use drill_core::dto::definition::CreateDefinition;
use uuid::Uuid;

impl OrchestratorClient {
    /// Register a test definition
    pub async fn create_definition(&self, req: &CreateDefinition) -> Result<TestDefinition> {
        let url = format!("{}/api/definitions", self.base_url);
        let response = self.client.post(&url).json(req).send().await?;

        handle_response(response).await
    }

    pub async fn list_definitions(&self) -> Result<Vec<TestDefinition>> {
        let url = format!("{}/api/definitions", self.base_url);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    pub async fn get_definition(&self, id: Uuid) -> Result<TestDefinition> {
        let url = format!("{}/api/definitions/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;

        handle_response(response).await
    }

    /// Replace a test definition; its id and job history are kept
    pub async fn update_definition(
        &self,
        id: Uuid,
        req: &CreateDefinition,
    ) -> Result<TestDefinition> {
        let url = format!("{}/api/definitions/{}", self.base_url, id);
        let response = self.client.put(&url).json(req).send().await?;

        handle_response(response).await
    }

    /// Delete a test definition
    ///
    /// Existing jobs keep their name snapshot; their reference is cleared.
    pub async fn delete_definition(&self, id: Uuid) -> Result<()> {
        let url = format!("{}/api/definitions/{}", self.base_url, id);
        let response = self.client.delete(&url).send().await?;

        handle_empty_response(response).await
    }
}
