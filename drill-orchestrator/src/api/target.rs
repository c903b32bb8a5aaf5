//! Storage and Notification Target API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use drill_core::domain::target::{NotificationTarget, StorageTarget};
use drill_core::dto::target::{
    ConnectionTestResult, CreateNotificationTarget, CreateStorageTarget,
};
use serde::Deserialize;

use crate::api::AppState;
use crate::api::error::{ApiResult, parse_id, parse_id_list};
use crate::service::registry_service;

/// `?ids=a,b,c`
#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    #[serde(default)]
    pub ids: String,
}

// =============================================================================
// Storage Targets
// =============================================================================

/// POST /api/storage
pub async fn create_storage(
    State(state): State<AppState>,
    Json(req): Json<CreateStorageTarget>,
) -> ApiResult<(StatusCode, Json<StorageTarget>)> {
    tracing::info!("Creating {} storage target: {}", req.kind, req.name);

    let target = registry_service::create_storage(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(target)))
}

/// GET /api/storage
pub async fn list_storage(State(state): State<AppState>) -> ApiResult<Json<Vec<StorageTarget>>> {
    let targets = registry_service::list_storage(&state.pool).await?;
    Ok(Json(targets))
}

/// GET /api/storage/lookup?ids=
pub async fn lookup_storage(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> ApiResult<Json<Vec<StorageTarget>>> {
    let ids = parse_id_list(&query.ids)?;

    let targets = registry_service::lookup_storage(&state.pool, &ids).await?;
    Ok(Json(targets))
}

/// POST /api/storage/{id}/test
pub async fn test_storage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConnectionTestResult>> {
    let id = parse_id(&id, "storage target")?;
    tracing::info!("Testing storage target: {}", id);

    let result = registry_service::test_storage(&state.pool, state.directory.as_ref(), id).await?;
    Ok(Json(result))
}

/// PUT /api/storage/{id}
pub async fn update_storage(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateStorageTarget>,
) -> ApiResult<Json<StorageTarget>> {
    let id = parse_id(&id, "storage target")?;

    let target = registry_service::update_storage(&state.pool, id, req).await?;
    Ok(Json(target))
}

/// DELETE /api/storage/{id}
pub async fn delete_storage(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "storage target")?;

    registry_service::delete_storage(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Notification Targets
// =============================================================================

/// POST /api/notifications
pub async fn create_notification(
    State(state): State<AppState>,
    Json(req): Json<CreateNotificationTarget>,
) -> ApiResult<(StatusCode, Json<NotificationTarget>)> {
    tracing::info!("Creating {} notification target: {}", req.kind, req.name);

    let target = registry_service::create_notification(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(target)))
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<NotificationTarget>>> {
    let targets = registry_service::list_notifications(&state.pool).await?;
    Ok(Json(targets))
}

/// GET /api/notifications/lookup?ids=
pub async fn lookup_notifications(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> ApiResult<Json<Vec<NotificationTarget>>> {
    let ids = parse_id_list(&query.ids)?;

    let targets = registry_service::lookup_notifications(&state.pool, &ids).await?;
    Ok(Json(targets))
}

/// PUT /api/notifications/{id}
pub async fn update_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateNotificationTarget>,
) -> ApiResult<Json<NotificationTarget>> {
    let id = parse_id(&id, "notification target")?;

    let target = registry_service::update_notification(&state.pool, id, req).await?;
    Ok(Json(target))
}

/// POST /api/notifications/{id}/test
pub async fn test_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConnectionTestResult>> {
    let id = parse_id(&id, "notification target")?;
    tracing::info!("Testing notification target: {}", id);

    let result = registry_service::test_notification(&state.pool, &state.notifier, id).await?;
    Ok(Json(result))
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "notification target")?;

    registry_service::delete_notification(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
