//! API Error Handling
//!
//! Unified error types and conversion for API responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::job_service::JobError;
use crate::service::registry_service::RegistryError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    BadGateway(String),
    DatabaseError(sqlx::Error),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::DatabaseError(err) => {
                tracing::error!("Database error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::DatabaseError(err)
    }
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        match err {
            JobError::NotFound(id) => ApiError::NotFound(format!("Job {} not found", id)),
            JobError::DefinitionNotFound(id) => {
                ApiError::NotFound(format!("Test definition {} not found", id))
            }
            JobError::Duplicate(_) => {
                ApiError::Conflict("this test is already queued or running".to_string())
            }
            JobError::InvalidState(msg) => ApiError::Conflict(msg),
            JobError::ValidationError(msg) => ApiError::BadRequest(msg),
            JobError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(msg) => ApiError::NotFound(msg),
            RegistryError::ValidationError(msg) => ApiError::BadRequest(msg),
            RegistryError::Directory(msg) => ApiError::BadGateway(msg),
            RegistryError::Channel(msg) => ApiError::BadGateway(msg),
            RegistryError::DatabaseError(err) => ApiError::DatabaseError(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Parse a path id, answering 400 on malformed input
pub fn parse_id(raw: &str, what: &str) -> ApiResult<uuid::Uuid> {
    uuid::Uuid::parse_str(raw).map_err(|_| ApiError::BadRequest(format!("Invalid {} id: {}", what, raw)))
}

/// Parse a comma separated id list as used by the lookup endpoints
pub fn parse_id_list(raw: &str) -> ApiResult<Vec<uuid::Uuid>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_id(s, "target"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err: ApiError = JobError::Duplicate(Uuid::new_v4()).into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_unknown_definition_maps_to_not_found() {
        let err: ApiError = JobError::DefinitionNotFound(Uuid::new_v4()).into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_parse_id_rejects_malformed() {
        assert!(parse_id("not-a-uuid", "definition").is_err());
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "definition").unwrap(), id);
    }

    #[test]
    fn test_parse_id_list() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let ids = parse_id_list(&format!("{}, {},", a, b)).unwrap();
        assert_eq!(ids, vec![a, b]);
        assert!(parse_id_list("").unwrap().is_empty());
        assert!(parse_id_list("abc").is_err());
    }
}
