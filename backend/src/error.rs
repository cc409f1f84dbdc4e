use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::services::{AdminError, AuthError, ErrorKind, LifecycleError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl AppError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            AppError::Lifecycle(LifecycleError::Store(e)) => database_failure(e),
            AppError::Lifecycle(e) => {
                let status = match e.kind() {
                    ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
                    ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    ErrorKind::InvalidState => StatusCode::CONFLICT,
                    ErrorKind::SecretMismatch => StatusCode::UNPROCESSABLE_ENTITY,
                    ErrorKind::Validation => StatusCode::BAD_REQUEST,
                    ErrorKind::Infrastructure => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            AppError::Auth(AuthError::Store(e)) => database_failure(e),
            AppError::Auth(e) => {
                let status = match &e {
                    AuthError::MissingToken
                    | AuthError::InvalidToken
                    | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                    AuthError::WrongRole(_) => StatusCode::FORBIDDEN,
                    AuthError::InvalidOtp | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
                    AuthError::EmailTaken => StatusCode::CONFLICT,
                    AuthError::Delivery(_) => StatusCode::BAD_GATEWAY,
                    AuthError::Token(_) | AuthError::Hash(_) | AuthError::Store(_) => {
                        error!("auth failure: {}", e);
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "Internal server error".to_string(),
                        );
                    }
                };
                (status, e.to_string())
            }
            AppError::Admin(AdminError::Store(e)) => database_failure(e),
            AppError::Admin(AdminError::NotFound) => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            AppError::Admin(AdminError::Conflict(msg)) => (StatusCode::CONFLICT, msg),
            AppError::Admin(e @ AdminError::Validation(_)) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::Admin(e @ AdminError::Hash(_)) => {
                error!("admin failure: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Database(e) => database_failure(e),
        }
    }
}

fn database_failure(e: sqlx::Error) -> (StatusCode, String) {
    error!("database error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Database error occurred".to_string(),
    )
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let body = Json(ErrorResponse {
            error: status.to_string(),
            message: error_message,
        });

        (status, body).into_response()
    }
}
