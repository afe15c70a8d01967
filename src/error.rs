use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;

/// Error type returned by every handler; the only place status codes are chosen.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::Auth(AuthError::DuplicateEmail) => {
                (StatusCode::CONFLICT, "Email already registered".to_string())
            }
            AppError::Auth(AuthError::InvalidInput(msg)) | AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg)
            }
            AppError::Auth(AuthError::InvalidCredentials) => {
                return unauthorized("Incorrect email or password")
            }
            AppError::Auth(AuthError::Internal(e)) | AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Auth(
                AuthError::InvalidToken | AuthError::ExpiredToken | AuthError::Unauthorized,
            ) => return unauthorized("Could not validate credentials"),
            AppError::NotFound(what) => (StatusCode::NOT_FOUND, what.to_string()),
        };

        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

fn unauthorized(detail: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
        Json(json!({ "detail": detail })),
    )
        .into_response()
}
