use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::inventory::SourceId;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Report persistence failed: {0}")]
    Persistence(String),

    #[error("A comparison run is already in progress")]
    RunInProgress,

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Unknown source: {0}")]
    UnknownSource(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Errors raised while talking to a remote inventory source.
///
/// Every variant is tagged with the source and the endpoint that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{source_id} {endpoint} returned HTTP {status}: {body}")]
    Http {
        source_id: SourceId,
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("network error calling {source_id} {endpoint}: {message}")]
    Network {
        source_id: SourceId,
        endpoint: String,
        message: String,
    },

    #[error("unexpected response from {source_id} {endpoint}: {message}")]
    Parse {
        source_id: SourceId,
        endpoint: String,
        message: String,
    },

    #[error("{source_id} credentials are not configured")]
    MissingCredentials { source_id: SourceId },
}

impl FetchError {
    /// 5xx responses and connection-level failures are worth another attempt.
    /// 4xx means bad credentials or a bad request and is never retried.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Http { status, .. } => *status >= 500,
            FetchError::Network { .. } => true,
            FetchError::Parse { .. } | FetchError::MissingCredentials { .. } => false,
        }
    }

    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            FetchError::Http { status: 401 | 403, .. } | FetchError::MissingCredentials { .. }
        )
    }

    pub fn source_id(&self) -> SourceId {
        match self {
            FetchError::Http { source_id, .. }
            | FetchError::Network { source_id, .. }
            | FetchError::Parse { source_id, .. }
            | FetchError::MissingCredentials { source_id } => *source_id,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// API error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            AppError::Fetch(err) => (
                StatusCode::BAD_GATEWAY,
                "FETCH_FAILED",
                format!("Comparison failed: {}", err),
                Some(serde_json::json!({
                    "source": err.source_id(),
                    "status": err.status(),
                })),
            ),
            AppError::Persistence(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PERSISTENCE_FAILED",
                format!("Report persistence failed: {}", message),
                None,
            ),
            AppError::RunInProgress => (
                StatusCode::CONFLICT,
                "RUN_IN_PROGRESS",
                "A comparison run is already in progress".to_string(),
                None,
            ),
            AppError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Not found: {}", what),
                None,
            ),
            AppError::InvalidInput(message) => (
                StatusCode::BAD_REQUEST,
                "INVALID_INPUT",
                message,
                None,
            ),
            AppError::UnknownSource(source) => (
                StatusCode::BAD_REQUEST,
                "UNKNOWN_SOURCE",
                format!("Unknown source: {}", source),
                Some(serde_json::json!({ "supported": SourceId::all() })),
            ),
            AppError::Config(message) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CONFIGURATION_ERROR",
                message,
                None,
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DATABASE_ERROR",
                "A database error occurred".to_string(),
                None,
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Internal(format!("HTTP client error: {:?}", error))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(error: sqlx::migrate::MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {:?}", error))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(error: config::ConfigError) -> Self {
        AppError::Config(error.to_string())
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
