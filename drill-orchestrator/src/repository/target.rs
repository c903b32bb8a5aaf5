//! Target Repository
//!
//! Storage and notification targets share one row layout in two tables.

use drill_core::domain::target::{
    NotificationKind, NotificationTarget, StorageKind, StorageTarget, TargetConfig,
};
use drill_core::dto::target::{CreateNotificationTarget, CreateStorageTarget};
use sqlx::PgPool;
use uuid::Uuid;

// =============================================================================
// Storage Targets
// =============================================================================

pub async fn create_storage(
    pool: &PgPool,
    req: CreateStorageTarget,
) -> Result<StorageTarget, sqlx::Error> {
    let target = StorageTarget {
        id: Uuid::new_v4(),
        name: req.name,
        kind: req.kind,
        config: req.config,
        created_at: chrono::Utc::now(),
    };

    insert(
        pool,
        "storage_targets",
        target.id,
        &target.name,
        target.kind.as_str(),
        &target.config,
        target.created_at,
    )
    .await?;

    Ok(target)
}

pub async fn list_storage(pool: &PgPool) -> Result<Vec<StorageTarget>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TargetRow>(
        "SELECT id, name, kind, config, created_at FROM storage_targets ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(TargetRow::into_storage).collect())
}

pub async fn find_storage_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<StorageTarget>, sqlx::Error> {
    let row = sqlx::query_as::<_, TargetRow>(
        "SELECT id, name, kind, config, created_at FROM storage_targets WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(TargetRow::into_storage))
}

/// Storage targets whose id is in `ids`; unknown ids are skipped
pub async fn find_storage_by_ids(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<StorageTarget>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TargetRow>(
        "SELECT id, name, kind, config, created_at FROM storage_targets WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().filter_map(TargetRow::into_storage).collect())
}

/// Replace name, kind and config; `None` when the target does not exist
pub async fn update_storage(
    pool: &PgPool,
    id: Uuid,
    req: CreateStorageTarget,
) -> Result<Option<StorageTarget>, sqlx::Error> {
    let row = update(
        pool,
        "storage_targets",
        id,
        &req.name,
        req.kind.as_str(),
        &req.config,
    )
    .await?;

    Ok(row.and_then(TargetRow::into_storage))
}

pub async fn delete_storage(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM storage_targets WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Notification Targets
// =============================================================================

pub async fn create_notification(
    pool: &PgPool,
    req: CreateNotificationTarget,
) -> Result<NotificationTarget, sqlx::Error> {
    let target = NotificationTarget {
        id: Uuid::new_v4(),
        name: req.name,
        kind: req.kind,
        config: req.config,
        created_at: chrono::Utc::now(),
    };

    insert(
        pool,
        "notification_targets",
        target.id,
        &target.name,
        target.kind.as_str(),
        &target.config,
        target.created_at,
    )
    .await?;

    Ok(target)
}

pub async fn list_notifications(pool: &PgPool) -> Result<Vec<NotificationTarget>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TargetRow>(
        "SELECT id, name, kind, config, created_at FROM notification_targets ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(TargetRow::into_notification)
        .collect())
}

pub async fn find_notification_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<NotificationTarget>, sqlx::Error> {
    let row = sqlx::query_as::<_, TargetRow>(
        "SELECT id, name, kind, config, created_at FROM notification_targets WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(TargetRow::into_notification))
}

/// Notification targets whose id is in `ids`; unknown ids are skipped
pub async fn find_notifications_by_ids(
    pool: &PgPool,
    ids: &[Uuid],
) -> Result<Vec<NotificationTarget>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TargetRow>(
        "SELECT id, name, kind, config, created_at FROM notification_targets WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(TargetRow::into_notification)
        .collect())
}

/// Replace name, kind and config; `None` when the target does not exist
pub async fn update_notification(
    pool: &PgPool,
    id: Uuid,
    req: CreateNotificationTarget,
) -> Result<Option<NotificationTarget>, sqlx::Error> {
    let row = update(
        pool,
        "notification_targets",
        id,
        &req.name,
        req.kind.as_str(),
        &req.config,
    )
    .await?;

    Ok(row.and_then(TargetRow::into_notification))
}

pub async fn delete_notification(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notification_targets WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

// =============================================================================
// Helper Functions
// =============================================================================

async fn insert(
    pool: &PgPool,
    table: &'static str,
    id: Uuid,
    name: &str,
    kind: &str,
    config: &TargetConfig,
    created_at: chrono::DateTime<chrono::Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(&format!(
        "INSERT INTO {} (id, name, kind, config, created_at) VALUES ($1, $2, $3, $4, $5)",
        table
    ))
    .bind(id)
    .bind(name)
    .bind(kind)
    .bind(sqlx::types::Json(config))
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(())
}

async fn update(
    pool: &PgPool,
    table: &'static str,
    id: Uuid,
    name: &str,
    kind: &str,
    config: &TargetConfig,
) -> Result<Option<TargetRow>, sqlx::Error> {
    sqlx::query_as::<_, TargetRow>(&format!(
        "UPDATE {} SET name = $1, kind = $2, config = $3 WHERE id = $4 \
         RETURNING id, name, kind, config, created_at",
        table
    ))
    .bind(name)
    .bind(kind)
    .bind(sqlx::types::Json(config))
    .bind(id)
    .fetch_optional(pool)
    .await
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct TargetRow {
    id: Uuid,
    name: String,
    kind: String,
    config: serde_json::Value,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TargetRow {
    fn config(&mut self) -> TargetConfig {
        serde_json::from_value(self.config.take()).unwrap_or_default()
    }

    fn into_storage(mut self) -> Option<StorageTarget> {
        let kind = match self.kind.parse::<StorageKind>() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!("Skipping storage target {}: {}", self.id, e);
                return None;
            }
        };

        Some(StorageTarget {
            config: self.config(),
            id: self.id,
            name: self.name,
            kind,
            created_at: self.created_at,
        })
    }

    fn into_notification(mut self) -> Option<NotificationTarget> {
        let kind = match self.kind.parse::<NotificationKind>() {
            Ok(kind) => kind,
            Err(e) => {
                tracing::warn!("Skipping notification target {}: {}", self.id, e);
                return None;
            }
        };

        Some(NotificationTarget {
            config: self.config(),
            id: self.id,
            name: self.name,
            kind,
            created_at: self.created_at,
        })
    }
}
