//! Registry Service
//!
//! Test definitions and the storage/notification targets they reference.

use drill_client::DirectoryClient;
use drill_client::notify::{NotifyError, Notifier, TEST_MESSAGE, TEST_SUBJECT};
use drill_core::domain::definition::TestDefinition;
use drill_core::domain::target::{NotificationTarget, StorageTarget};
use drill_core::dto::definition::CreateDefinition;
use drill_core::dto::target::{
    ConnectionTestResult, CreateNotificationTarget, CreateStorageTarget,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::repository::{definition_repository, target_repository};

/// Service error type
#[derive(Debug)]
pub enum RegistryError {
    NotFound(String),
    ValidationError(String),
    /// The backup directory is missing or rejected the request
    Directory(String),
    /// A notification channel rejected the test message
    Channel(String),
    DatabaseError(sqlx::Error),
}

impl From<sqlx::Error> for RegistryError {
    fn from(err: sqlx::Error) -> Self {
        RegistryError::DatabaseError(err)
    }
}

// =============================================================================
// Test Definitions
// =============================================================================

/// Register a test definition after checking its references
pub async fn create_definition(
    pool: &PgPool,
    req: CreateDefinition,
) -> Result<TestDefinition, RegistryError> {
    validate_definition(&req)?;
    check_references(pool, &req).await?;

    let definition = definition_repository::create(pool, req).await?;
    tracing::info!("Test definition created: {} ({})", definition.id, definition.name);

    Ok(definition)
}

/// Replace a test definition, keeping its id and job history
pub async fn update_definition(
    pool: &PgPool,
    id: Uuid,
    req: CreateDefinition,
) -> Result<TestDefinition, RegistryError> {
    validate_definition(&req)?;
    check_references(pool, &req).await?;

    let definition = definition_repository::update(pool, id, req)
        .await?
        .ok_or_else(|| RegistryError::NotFound(format!("Test definition {} not found", id)))?;
    tracing::info!("Test definition updated: {} ({})", definition.id, definition.name);

    Ok(definition)
}

/// Every referenced storage and notification target must exist
async fn check_references(pool: &PgPool, req: &CreateDefinition) -> Result<(), RegistryError> {
    let storage = target_repository::find_storage_by_ids(pool, &req.storage_ids).await?;
    if let Some(missing) = first_missing(&req.storage_ids, storage.iter().map(|t| t.id)) {
        return Err(RegistryError::ValidationError(format!(
            "Storage target {} does not exist",
            missing
        )));
    }

    let notifications =
        target_repository::find_notifications_by_ids(pool, &req.notification_ids).await?;
    if let Some(missing) = first_missing(&req.notification_ids, notifications.iter().map(|t| t.id))
    {
        return Err(RegistryError::ValidationError(format!(
            "Notification target {} does not exist",
            missing
        )));
    }

    Ok(())
}

pub async fn list_definitions(pool: &PgPool) -> Result<Vec<TestDefinition>, RegistryError> {
    Ok(definition_repository::list_all(pool).await?)
}

pub async fn get_definition(pool: &PgPool, id: Uuid) -> Result<TestDefinition, RegistryError> {
    definition_repository::find_by_id(pool, id)
        .await?
        .ok_or_else(|| RegistryError::NotFound(format!("Test definition {} not found", id)))
}

pub async fn delete_definition(pool: &PgPool, id: Uuid) -> Result<(), RegistryError> {
    if !definition_repository::delete(pool, id).await? {
        return Err(RegistryError::NotFound(format!(
            "Test definition {} not found",
            id
        )));
    }

    tracing::info!("Test definition deleted: {}", id);
    Ok(())
}

// =============================================================================
// Storage Targets
// =============================================================================

pub async fn create_storage(
    pool: &PgPool,
    req: CreateStorageTarget,
) -> Result<StorageTarget, RegistryError> {
    validate_name(&req.name)?;

    let target = target_repository::create_storage(pool, req).await?;
    tracing::info!("Storage target created: {} ({})", target.id, target.kind);

    Ok(target)
}

pub async fn list_storage(pool: &PgPool) -> Result<Vec<StorageTarget>, RegistryError> {
    Ok(target_repository::list_storage(pool).await?)
}

pub async fn lookup_storage(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<StorageTarget>, RegistryError> {
    Ok(target_repository::find_storage_by_ids(pool, ids).await?)
}

pub async fn update_storage(
    pool: &PgPool,
    id: Uuid,
    req: CreateStorageTarget,
) -> Result<StorageTarget, RegistryError> {
    validate_name(&req.name)?;

    let target = target_repository::update_storage(pool, id, req)
        .await?
        .ok_or_else(|| RegistryError::NotFound(format!("Storage target {} not found", id)))?;
    tracing::info!("Storage target updated: {} ({})", target.id, target.kind);

    Ok(target)
}

pub async fn delete_storage(pool: &PgPool, id: Uuid) -> Result<(), RegistryError> {
    if !target_repository::delete_storage(pool, id).await? {
        return Err(RegistryError::NotFound(format!(
            "Storage target {} not found",
            id
        )));
    }
    Ok(())
}

/// Verify a storage target through the backup directory
pub async fn test_storage(
    pool: &PgPool,
    directory: Option<&DirectoryClient>,
    id: Uuid,
) -> Result<ConnectionTestResult, RegistryError> {
    let target = target_repository::find_storage_by_id(pool, id)
        .await?
        .ok_or_else(|| RegistryError::NotFound(format!("Storage target {} not found", id)))?;

    let directory = directory.ok_or_else(|| {
        RegistryError::Directory("Backup directory is not configured".to_string())
    })?;

    directory
        .test_storage_connection(&target)
        .await
        .map_err(|e| RegistryError::Directory(format!("Connection test failed: {}", e)))?;

    Ok(ConnectionTestResult {
        success: true,
        message: "Connection successful!".to_string(),
    })
}

// =============================================================================
// Notification Targets
// =============================================================================

pub async fn create_notification(
    pool: &PgPool,
    req: CreateNotificationTarget,
) -> Result<NotificationTarget, RegistryError> {
    validate_name(&req.name)?;

    let target = target_repository::create_notification(pool, req).await?;
    tracing::info!(
        "Notification target created: {} ({})",
        target.id,
        target.kind
    );

    Ok(target)
}

pub async fn list_notifications(pool: &PgPool) -> Result<Vec<NotificationTarget>, RegistryError> {
    Ok(target_repository::list_notifications(pool).await?)
}

pub async fn lookup_notifications(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<NotificationTarget>, RegistryError> {
    Ok(target_repository::find_notifications_by_ids(pool, ids).await?)
}

pub async fn update_notification(
    pool: &PgPool,
    id: Uuid,
    req: CreateNotificationTarget,
) -> Result<NotificationTarget, RegistryError> {
    validate_name(&req.name)?;

    let target = target_repository::update_notification(pool, id, req)
        .await?
        .ok_or_else(|| {
            RegistryError::NotFound(format!("Notification target {} not found", id))
        })?;
    tracing::info!(
        "Notification target updated: {} ({})",
        target.id,
        target.kind
    );

    Ok(target)
}

/// Send a test message through a stored notification target
pub async fn test_notification(
    pool: &PgPool,
    notifier: &dyn Notifier,
    id: Uuid,
) -> Result<ConnectionTestResult, RegistryError> {
    let target = target_repository::find_notification_by_id(pool, id)
        .await?
        .ok_or_else(|| {
            RegistryError::NotFound(format!("Notification target {} not found", id))
        })?;

    send_test_notification(notifier, &target).await
}

async fn send_test_notification(
    notifier: &dyn Notifier,
    target: &NotificationTarget,
) -> Result<ConnectionTestResult, RegistryError> {
    match notifier.send(target, TEST_SUBJECT, TEST_MESSAGE).await {
        Ok(()) => {
            tracing::info!("Test notification sent to {} ({})", target.name, target.kind);
            Ok(ConnectionTestResult {
                success: true,
                message: "Test notification sent successfully!".to_string(),
            })
        }
        Err(NotifyError::MissingConfig(key)) => Err(RegistryError::ValidationError(format!(
            "{} target is missing '{}'",
            target.kind, key
        ))),
        Err(e) => Err(RegistryError::Channel(format!("{} error: {}", target.kind, e))),
    }
}

pub async fn delete_notification(pool: &PgPool, id: Uuid) -> Result<(), RegistryError> {
    if !target_repository::delete_notification(pool, id).await? {
        return Err(RegistryError::NotFound(format!(
            "Notification target {} not found",
            id
        )));
    }
    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::ValidationError(
            "Name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_definition(req: &CreateDefinition) -> Result<(), RegistryError> {
    validate_name(&req.name)?;

    for (field, value) in [
        ("workspace_id", &req.workspace_id),
        ("source_database_id", &req.source_database_id),
        ("source_database_name", &req.source_database_name),
    ] {
        if value.trim().is_empty() {
            return Err(RegistryError::ValidationError(format!(
                "{} cannot be empty",
                field
            )));
        }
    }

    Ok(())
}

fn first_missing(requested: &[Uuid], found: impl Iterator<Item = Uuid>) -> Option<Uuid> {
    let found: Vec<Uuid> = found.collect();
    requested.iter().copied().find(|id| !found.contains(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use drill_core::domain::target::{NotificationKind, TargetConfig};
    use std::sync::Mutex;

    /// Records sends and answers with a canned result
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
        fail_with: fn() -> Option<NotifyError>,
    }

    impl RecordingNotifier {
        fn new(fail_with: fn() -> Option<NotifyError>) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_with,
            }
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(
            &self,
            _target: &NotificationTarget,
            subject: &str,
            body: &str,
        ) -> Result<(), NotifyError> {
            self.sent
                .lock()
                .unwrap()
                .push((subject.to_string(), body.to_string()));
            match (self.fail_with)() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
    }

    fn telegram_target() -> NotificationTarget {
        NotificationTarget {
            id: Uuid::new_v4(),
            name: "ops-telegram".into(),
            kind: NotificationKind::Telegram,
            config: TargetConfig::default(),
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_notification_test_sends_fixed_message() {
        let notifier = RecordingNotifier::new(|| None);

        let result = send_test_notification(&notifier, &telegram_target())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.message, "Test notification sent successfully!");
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(
            *sent,
            vec![(TEST_SUBJECT.to_string(), TEST_MESSAGE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_notification_test_reports_channel_errors() {
        let notifier = RecordingNotifier::new(|| {
            Some(NotifyError::Api {
                status: 400,
                message: "Bad Request: chat not found".into(),
            })
        });
        match send_test_notification(&notifier, &telegram_target()).await {
            Err(RegistryError::Channel(msg)) => {
                assert!(msg.starts_with("TELEGRAM error"));
                assert!(msg.contains("chat not found"));
            }
            other => panic!("unexpected result: {:?}", other),
        }

        let notifier = RecordingNotifier::new(|| Some(NotifyError::MissingConfig("bot_token")));
        match send_test_notification(&notifier, &telegram_target()).await {
            Err(RegistryError::ValidationError(msg)) => assert!(msg.contains("bot_token")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    fn request() -> CreateDefinition {
        CreateDefinition {
            name: "orders nightly".into(),
            workspace_id: "ws-1".into(),
            source_database_id: "db-1".into(),
            source_database_name: "orders".into(),
            pre_restore_script: None,
            post_restore_script: Some("SELECT 1".into()),
            storage_ids: vec![],
            notification_ids: vec![],
        }
    }

    #[test]
    fn test_validate_definition_accepts_complete_request() {
        assert!(validate_definition(&request()).is_ok());
    }

    #[test]
    fn test_validate_definition_rejects_blank_fields() {
        let mut req = request();
        req.name = "  ".into();
        assert!(matches!(
            validate_definition(&req),
            Err(RegistryError::ValidationError(_))
        ));

        let mut req = request();
        req.source_database_id = String::new();
        match validate_definition(&req) {
            Err(RegistryError::ValidationError(msg)) => {
                assert!(msg.contains("source_database_id"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_first_missing() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(first_missing(&[a, b], [b, a].into_iter()), None);
        assert_eq!(first_missing(&[a, b], [a].into_iter()), Some(b));
        assert_eq!(first_missing(&[], std::iter::empty()), None);
    }
}
