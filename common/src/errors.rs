//! Application error types.
//!
//! Every failure in the services is expressed as an [`AppError`]. Variants carry
//! plain strings so the type is `Clone`: a single database initialization
//! outcome can be handed to every caller that waited on it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::response::ApiResponse;

/// Result alias used across the workspace.
pub type AppResult<T> = Result<T, AppError>;

/// Unified application error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    /// Connecting to or authenticating against a project database failed.
    #[error("database connection failed: {0}")]
    DatabaseConnection(String),

    /// A project was used before `init_project` succeeded for it.
    #[error("database not initialized for project: {0}")]
    NotInitialized(String),

    /// No configuration exists for the project.
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// No such model is registered (or the project has no connection).
    #[error("model {model} not found for project {project}")]
    ModelNotFound { project: String, model: String },

    /// A record lookup came back empty.
    #[error("{0}")]
    NotFound(String),

    /// Schema synchronization failed.
    #[error("schema sync failed: {0}")]
    Sync(String),

    /// A query against an initialized database failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(String),

    /// Request data failed validation.
    #[error("{0}")]
    Validation(String),

    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// The SMTP transport rejected or failed to deliver a message.
    #[error("mail delivery failed: {0}")]
    Mail(String),

    /// Anything else.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ProjectNotFound(_)
            | AppError::ModelNotFound { .. }
            | AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Mail(_) => StatusCode::BAD_GATEWAY,
            AppError::NotInitialized(_)
            | AppError::Sync(_)
            | AppError::DatabaseQuery(_)
            | AppError::Config(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::DatabaseConnection(_) => "DATABASE_UNAVAILABLE",
            AppError::NotInitialized(_) => "NOT_INITIALIZED",
            AppError::ProjectNotFound(_) => "PROJECT_NOT_FOUND",
            AppError::ModelNotFound { .. } => "MODEL_NOT_FOUND",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Sync(_) => "SYNC_ERROR",
            AppError::DatabaseQuery(_) => "DATABASE_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Mail(_) => "MAIL_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }

        let message = match &self {
            // Internal details stay in the log.
            AppError::DatabaseQuery(_) | AppError::Sync(_) | AppError::Internal(_) => {
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(ApiResponse::err(self.code(), message))).into_response()
    }
}
