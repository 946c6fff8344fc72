//! Error handling

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::{Value, json};
use tracing::{info, warn};

/// definitions for the imagegen application.
#[derive(Debug)]
pub enum ImagegenError {
    /// No API key could be resolved
    MissingApiKey,
    /// A required field was missing or empty, or a path was malformed
    BadRequest(String),
    /// The remote API could not be reached or answered with a non-2xx status
    Upstream(String),
    /// The remote API answered, but not with anything we can store
    UnexpectedResponse {
        /// What went wrong
        message: String,
        /// The raw response, kept for diagnosis
        raw: Value,
    },
    /// When a requested resource is not found
    NotFound(String),
    /// The metadata row was removed but the image file could not be
    PartialDelete(String),
    /// When DB operations fail
    DatabaseError(sea_orm::DbErr),
    /// When an internal server error occurs
    InternalServerError(String),
}

impl std::fmt::Display for ImagegenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingApiKey => write!(f, "API key not found"),
            Self::BadRequest(message) => write!(f, "{message}"),
            Self::Upstream(message) => write!(f, "API request failed: {message}"),
            Self::UnexpectedResponse { message, .. } => write!(f, "{message}"),
            Self::NotFound(what) => write!(f, "Not found: {what}"),
            Self::PartialDelete(message) => write!(f, "Partial delete: {message}"),
            Self::DatabaseError(err) => write!(f, "Database error: {err}"),
            Self::InternalServerError(message) => write!(f, "Internal server error: {message}"),
        }
    }
}

impl std::error::Error for ImagegenError {}

impl From<sea_orm::DbErr> for ImagegenError {
    fn from(err: sea_orm::DbErr) -> Self {
        ImagegenError::DatabaseError(err)
    }
}

impl From<std::io::Error> for ImagegenError {
    fn from(err: std::io::Error) -> Self {
        ImagegenError::InternalServerError(err.to_string())
    }
}

impl From<axum::http::Error> for ImagegenError {
    fn from(err: axum::http::Error) -> Self {
        ImagegenError::InternalServerError(err.to_string())
    }
}

impl From<url::ParseError> for ImagegenError {
    fn from(err: url::ParseError) -> Self {
        ImagegenError::InternalServerError(err.to_string())
    }
}

impl From<reqwest::Error> for ImagegenError {
    fn from(err: reqwest::Error) -> Self {
        ImagegenError::Upstream(err.to_string())
    }
}

impl ImagegenError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::MissingApiKey | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) | Self::UnexpectedResponse { .. } => StatusCode::BAD_GATEWAY,
            Self::PartialDelete(_) | Self::DatabaseError(_) | Self::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ImagegenError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let body = match &self {
            ImagegenError::MissingApiKey => {
                info!("No API key configured");
                json!({"success": false, "error": self.to_string()})
            }
            ImagegenError::BadRequest(_) => {
                info!("Bad request: {}", self);
                json!({"success": false, "error": self.to_string()})
            }
            ImagegenError::NotFound(what) => {
                info!("404 {what}");
                json!({"success": false, "error": self.to_string()})
            }
            ImagegenError::Upstream(message) => {
                warn!("Upstream failure: {}", message);
                json!({"success": false, "error": self.to_string()})
            }
            ImagegenError::UnexpectedResponse { message, raw } => {
                warn!("Unexpected upstream response: {} {}", message, raw);
                json!({"success": false, "error": message, "response": raw})
            }
            ImagegenError::PartialDelete(message) => {
                tracing::error!("Partial delete: {}", message);
                json!({"success": false, "error": self.to_string()})
            }
            ImagegenError::DatabaseError(err) => {
                tracing::error!("Database error: {}", err);
                json!({"success": false, "error": "Database error"})
            }
            ImagegenError::InternalServerError(message) => {
                tracing::error!("Internal server error: {}", message);
                json!({"success": false, "error": "Internal server error"})
            }
        };
        (status, Json(body)).into_response()
    }
}
