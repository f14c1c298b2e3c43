use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

use crate::dao::storage::StorageError;

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No user could be resolved for an operation that needs one.
    #[error("authentication required")]
    AuthRequired,
    /// Requested group, record or row does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The group already holds `max_participants` participants.
    #[error("group is full")]
    CapacityExceeded,
    /// The group has been deactivated.
    #[error("group is no longer active")]
    GroupInactive,
    /// The caller already participates in the group.
    #[error("already joined this group")]
    AlreadyJoined,
    /// Leaving a group that has no participants.
    #[error("group has no participants")]
    EmptyGroup,
    /// Storage backend is unavailable.
    #[error("storage unavailable")]
    Unavailable(#[source] StorageError),
}

impl ServiceError {
    /// Stable machine-readable identifier of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::AuthRequired => "auth_required",
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::CapacityExceeded => "capacity_exceeded",
            ServiceError::GroupInactive => "group_inactive",
            ServiceError::AlreadyJoined => "already_joined",
            ServiceError::EmptyGroup => "empty_group",
            ServiceError::Unavailable(_) => "unavailable",
        }
    }
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Unavailable(err)
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::BadRequest {
            kind: "invalid_input",
            message: format!("validation failed: {}", err),
        }
    }
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {message}")]
    BadRequest {
        /// Error kind reported to the client.
        kind: &'static str,
        /// Human readable reason.
        message: String,
    },
    /// No session could be resolved.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Error kind reported to the client.
        kind: &'static str,
        /// Human readable reason.
        message: String,
    },
    /// Requested resource not found.
    #[error("not found: {message}")]
    NotFound {
        /// Error kind reported to the client.
        kind: &'static str,
        /// Human readable reason.
        message: String,
    },
    /// Conflict with current group state.
    #[error("conflict: {message}")]
    Conflict {
        /// Error kind reported to the client.
        kind: &'static str,
        /// Human readable reason.
        message: String,
    },
    /// Storage is unavailable.
    #[error("service unavailable: {message}")]
    ServiceUnavailable {
        /// Error kind reported to the client.
        kind: &'static str,
        /// Human readable reason.
        message: String,
    },
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        let kind = err.kind();
        match err {
            ServiceError::AuthRequired => AppError::Unauthorized {
                kind,
                message: err.to_string(),
            },
            ServiceError::NotFound(message) => AppError::NotFound { kind, message },
            ServiceError::InvalidInput(message) => AppError::BadRequest { kind, message },
            ServiceError::CapacityExceeded
            | ServiceError::GroupInactive
            | ServiceError::AlreadyJoined
            | ServiceError::EmptyGroup => AppError::Conflict {
                kind,
                message: err.to_string(),
            },
            ServiceError::Unavailable(source) => AppError::ServiceUnavailable {
                kind,
                message: source.to_string(),
            },
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error kind, e.g. `capacity_exceeded`.
    pub kind: String,
    /// Human readable reason.
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, kind) = match &self {
            AppError::BadRequest { kind, .. } => (StatusCode::BAD_REQUEST, *kind),
            AppError::Unauthorized { kind, .. } => (StatusCode::UNAUTHORIZED, *kind),
            AppError::NotFound { kind, .. } => (StatusCode::NOT_FOUND, *kind),
            AppError::Conflict { kind, .. } => (StatusCode::CONFLICT, *kind),
            AppError::ServiceUnavailable { kind, .. } => (StatusCode::SERVICE_UNAVAILABLE, *kind),
        };

        let payload = Json(ErrorBody {
            kind: kind.to_owned(),
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}
