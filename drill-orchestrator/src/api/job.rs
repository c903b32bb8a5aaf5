//! Job API Handlers
//!
//! HTTP endpoints for the job queue.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use drill_core::domain::job::{Job, JobOutcome};
use drill_core::dto::job::{HistoryQuery, OutcomeReceipt};

use crate::api::AppState;
use crate::api::error::{ApiResult, parse_id};
use crate::service::job_service;

// =============================================================================
// Admission
// =============================================================================

/// POST /api/definitions/{id}/run
/// Queue a run of a test definition
pub async fn enqueue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    let definition_id = parse_id(&id, "test definition")?;
    tracing::info!("Enqueueing run of definition: {}", definition_id);

    let job = job_service::enqueue(&state.pool, definition_id).await?;

    Ok((StatusCode::CREATED, Json(job)))
}

// =============================================================================
// Queries
// =============================================================================

/// GET /api/jobs/active
pub async fn active_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<Job>>> {
    tracing::debug!("Listing active jobs");

    let jobs = job_service::active_jobs(&state.pool).await?;
    Ok(Json(jobs))
}

/// GET /api/jobs/history?limit=N
pub async fn job_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    tracing::debug!("Listing job history (limit: {:?})", query.limit);

    let jobs = job_service::job_history(&state.pool, query.limit).await?;
    Ok(Json(jobs))
}

/// GET /api/jobs/{id}
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Job>> {
    let id = parse_id(&id, "job")?;
    tracing::debug!("Getting job: {}", id);

    let job = job_service::get_job(&state.pool, id).await?;
    Ok(Json(job))
}

// =============================================================================
// Runner Lifecycle
// =============================================================================

/// POST /api/jobs/claim
/// Claim the oldest pending job; 204 when the queue is empty
pub async fn claim_next(State(state): State<AppState>) -> ApiResult<Response> {
    match job_service::claim_next(&state.pool).await? {
        Some(claimed) => Ok(Json(claimed).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

/// POST /api/jobs/{id}/complete
/// Record the terminal state of a running job
pub async fn complete_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(outcome): Json<JobOutcome>,
) -> ApiResult<Json<OutcomeReceipt>> {
    let id = parse_id(&id, "job")?;
    tracing::info!("Completing job {} with status: {}", id, outcome.status);

    let receipt = job_service::record_outcome(&state.pool, id, outcome).await?;
    Ok(Json(receipt))
}
