use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::models::ticket::InvalidTransition;
use crate::ticketing::ledger::CapacityTooSmall;
use crate::ticketing::token::MalformedToken;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Duplicate claim: {0}")]
    DuplicateClaim(String),

    #[error("Capacity exhausted: {0}")]
    CapacityExhausted(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Database error")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Internal server error")]
    InternalServerError(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::DuplicateClaim(_) => StatusCode::BAD_REQUEST,
            AppError::CapacityExhausted(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidTransition(_) => StatusCode::CONFLICT,
            AppError::MalformedToken(_) => StatusCode::BAD_REQUEST,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::ValidationError(_) => "VALIDATION_ERROR",
            AppError::AuthError(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::DuplicateClaim(_) => "DUPLICATE_CLAIM",
            AppError::CapacityExhausted(_) => "CAPACITY_EXHAUSTED",
            AppError::InvalidTransition(_) => "INVALID_TRANSITION",
            AppError::MalformedToken(_) => "MALFORMED_TOKEN",
            AppError::DatabaseError(_) => "DATABASE_ERROR",
            AppError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::DatabaseError(e) => {
                error!(error = ?e, "Database error");
            }
            AppError::InternalServerError(msg) => {
                error!(error = ?self, message = %msg, "Internal error");
            }
            other => {
                // Only infrastructure failures log at error level
                tracing::debug!(error = ?other, "Request rejected");
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level message to the client
        let public_message = match &self {
            AppError::ValidationError(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::DuplicateClaim(msg)
            | AppError::CapacityExhausted(msg)
            | AppError::InvalidTransition(msg)
            | AppError::MalformedToken(msg)
            | AppError::InternalServerError(msg) => msg.clone(),
            AppError::DatabaseError(_) => "A database error occurred".to_string(),
        };

        // Do not expose internal details in the API response
        let details = None;

        error_response(code, public_message, details, status)
    }
}

impl From<InvalidTransition> for AppError {
    fn from(err: InvalidTransition) -> Self {
        AppError::InvalidTransition(err.to_string())
    }
}

impl From<MalformedToken> for AppError {
    fn from(err: MalformedToken) -> Self {
        AppError::MalformedToken(err.to_string())
    }
}

impl From<CapacityTooSmall> for AppError {
    fn from(err: CapacityTooSmall) -> Self {
        AppError::ValidationError(err.to_string())
    }
}
