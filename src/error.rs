// src/error.rs
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    ValidationError(String),
    #[error("bulk adjustment rejected: {message}")]
    BulkRejected { message: String, details: Vec<String> },
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn db(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        AppError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::ValidationError(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::DatabaseError(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) | AppError::BulkRejected { .. } => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            AppError::DatabaseError(e) => {
                tracing::error!(error = %e, "Database error");
                json!({ "error": "Database error occurred" })
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                json!({ "error": "Internal server error" })
            }
            AppError::BulkRejected { message, details } => json!({
                "error": message,
                "details": details,
            }),
            AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::ValidationError(msg) => json!({ "error": msg }),
        };

        (status, Json(body)).into_response()
    }
}

fn map_sqlstate(err: sqlx::Error, sqlstate: &str, message: &str) -> AppError {
    match err {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(sqlstate) => {
            AppError::validation(message)
        }
        other => other.into(),
    }
}

/// Maps a Postgres unique violation (SQLSTATE 23505) to a 400 carrying `message`.
pub fn map_unique_violation(err: sqlx::Error, message: &str) -> AppError {
    map_sqlstate(err, "23505", message)
}

/// Maps a Postgres foreign key violation (SQLSTATE 23503), such as deleting a
/// still-referenced row, to a 400 carrying `message`.
pub fn map_foreign_key_violation(err: sqlx::Error, message: &str) -> AppError {
    map_sqlstate(err, "23503", message)
}
