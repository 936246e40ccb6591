use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use fhe_policy::provider::FheError;
use fhe_policy::LedgerError;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("internal error")]
    Internal,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let msg = err.to_string();
        match err {
            LedgerError::NotFound { .. } | LedgerError::InvalidPolicy(_) | LedgerError::UnknownRequest(_) => {
                ApiError::NotFound(msg)
            }
            LedgerError::AlreadyRevealed { .. }
            | LedgerError::RevealPending { .. }
            | LedgerError::SimulationSuperseded { .. } => ApiError::Conflict(msg),
            LedgerError::InvalidProof(_) => ApiError::Unauthorized(msg),
            LedgerError::WrongArity { .. } | LedgerError::Fhe(FheError::InvalidCiphertext(_)) => {
                ApiError::BadRequest(msg)
            }
            LedgerError::Fhe(FheError::Oracle(_)) => {
                tracing::warn!(error = %msg, "decryption oracle failure");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match &self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
            ApiError::Unauthorized(m) => (StatusCode::UNAUTHORIZED, m.clone()),
            ApiError::Config(_) | ApiError::Internal => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };

        (status, Json(ErrorBody { error: msg })).into_response()
    }
}
