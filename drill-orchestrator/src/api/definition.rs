//! Test Definition API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use drill_core::domain::definition::TestDefinition;
use drill_core::dto::definition::CreateDefinition;

use crate::api::AppState;
use crate::api::error::{ApiResult, parse_id};
use crate::service::registry_service;

/// POST /api/definitions
pub async fn create_definition(
    State(state): State<AppState>,
    Json(req): Json<CreateDefinition>,
) -> ApiResult<(StatusCode, Json<TestDefinition>)> {
    tracing::info!("Creating test definition: {}", req.name);

    let definition = registry_service::create_definition(&state.pool, req).await?;
    Ok((StatusCode::CREATED, Json(definition)))
}

/// GET /api/definitions
pub async fn list_definitions(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<TestDefinition>>> {
    let definitions = registry_service::list_definitions(&state.pool).await?;
    Ok(Json(definitions))
}

/// GET /api/definitions/{id}
pub async fn get_definition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TestDefinition>> {
    let id = parse_id(&id, "test definition")?;

    let definition = registry_service::get_definition(&state.pool, id).await?;
    Ok(Json(definition))
}

/// PUT /api/definitions/{id}
///
/// Full replacement; the body has the same shape as for creation.
pub async fn update_definition(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateDefinition>,
) -> ApiResult<Json<TestDefinition>> {
    let id = parse_id(&id, "test definition")?;
    tracing::info!("Updating test definition: {}", id);

    let definition = registry_service::update_definition(&state.pool, id, req).await?;
    Ok(Json(definition))
}

/// DELETE /api/definitions/{id}
pub async fn delete_definition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, "test definition")?;
    tracing::info!("Deleting test definition: {}", id);

    registry_service::delete_definition(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
