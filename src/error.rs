//! Error types for Shelfmark server

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Numeric error codes carried in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    DbFailure = 3,
    NoSuchBook = 5,
    BookNotAvailable = 7,
    BadValue = 18,
    NoSuchRoute = 22,
    Busy = 23,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already borrowed: {0}")]
    AlreadyBorrowed(String),

    #[error("No route: {0}")]
    Routing(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl AppError {
    pub fn book_not_found(id: i64) -> Self {
        AppError::NotFound(format!("Book with id {} not found", id))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| match &e.message {
                    Some(msg) => msg.to_string(),
                    None => format!("{} is invalid", field),
                })
            })
            .collect::<Vec<_>>()
            .join(", ");
        AppError::Validation(message)
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg.clone()),
            // Not-found is a client error on this surface, like the other lending failures
            AppError::NotFound(msg) => (StatusCode::BAD_REQUEST, ErrorCode::NoSuchBook, msg.clone()),
            AppError::AlreadyBorrowed(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::BookNotAvailable, msg.clone())
            }
            AppError::Routing(msg) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchRoute, msg.clone()),
            AppError::MethodNotAllowed(msg) => {
                (StatusCode::METHOD_NOT_ALLOWED, ErrorCode::NoSuchRoute, msg.clone())
            }
            AppError::Busy(msg) => (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::Busy, msg.clone()),
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::Migration(e) => {
                tracing::error!("Migration error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
