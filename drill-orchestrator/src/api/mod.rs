//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod definition;
pub mod error;
pub mod health;
pub mod job;
pub mod target;

use axum::{
    Router,
    routing::{get, post, put},
};
use drill_client::DirectoryClient;
use drill_client::notify::ChannelNotifier;
use sqlx::PgPool;
use tower_http::trace::TraceLayer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// Used to test storage connections; absent when not configured
    pub directory: Option<DirectoryClient>,
    /// Delivers notification test messages
    pub notifier: ChannelNotifier,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job queue endpoints
        .route("/api/definitions/{id}/run", post(job::enqueue))
        .route("/api/jobs/active", get(job::active_jobs))
        .route("/api/jobs/history", get(job::job_history))
        .route("/api/jobs/claim", post(job::claim_next))
        .route("/api/jobs/{id}", get(job::get_job))
        .route("/api/jobs/{id}/complete", post(job::complete_job))
        // Test definition endpoints
        .route(
            "/api/definitions",
            post(definition::create_definition).get(definition::list_definitions),
        )
        .route(
            "/api/definitions/{id}",
            get(definition::get_definition)
                .put(definition::update_definition)
                .delete(definition::delete_definition),
        )
        // Storage target endpoints
        .route(
            "/api/storage",
            post(target::create_storage).get(target::list_storage),
        )
        .route("/api/storage/lookup", get(target::lookup_storage))
        .route("/api/storage/{id}/test", post(target::test_storage))
        .route(
            "/api/storage/{id}",
            put(target::update_storage).delete(target::delete_storage),
        )
        // Notification target endpoints
        .route(
            "/api/notifications",
            post(target::create_notification).get(target::list_notifications),
        )
        .route("/api/notifications/lookup", get(target::lookup_notifications))
        .route("/api/notifications/{id}/test", post(target::test_notification))
        .route(
            "/api/notifications/{id}",
            put(target::update_notification).delete(target::delete_notification),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
