use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde::Serialize;
use thiserror::Error;
use zk_aggregate::errors::ConfigError;
use zk_aggregate::groth16::ZkError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("internal error")]
    Internal,
}

impl From<ZkError> for ApiError {
    fn from(e: ZkError) -> Self {
        match e {
            // Caller-supplied data (overflowing operands, too many records) is a client error.
            ZkError::Pipeline(inner) => ApiError::BadRequest(inner.to_string()),
            other => {
                tracing::error!(error = %other, "zk operation failed");
                ApiError::Internal
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Config(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };

        (status, Json(ErrorBody { error: msg })).into_response()
    }
}
