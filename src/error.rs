use axum::body::Body;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Attributes;

/// Problem `type` used for every error this crate produces.
pub const ABOUT_BLANK: &str = "about:blank";

pub const TITLE_MALFORMED_ENVELOPE: &str = "Malformed Pub/Sub envelope";
pub const TITLE_ENVELOPE_TOO_LARGE: &str = "Pub/Sub envelope too large";
pub const TITLE_ATTRIBUTES_NOT_ALLOWED: &str = "Pub/Sub message attributes are not allowed";
pub const TITLE_REWRITE_FAILED: &str = "Failed to rewrite Pub/Sub request";

/// Application-wide error types for configuration and the demo handlers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self, "Request failed");

        let (status, detail) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            // Never expose internal details to clients
            AppError::ConfigError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred.".to_string(),
            ),
        };

        let title = status.canonical_reason().unwrap_or("Error");
        ProblemDetails::new(status, title, detail).into_response()
    }
}

/// Failures while unwrapping a push envelope.
///
/// Every variant renders as a JSON problem document. The wrapped
/// application is never called once one of these has been produced.
#[derive(Error, Debug)]
pub enum UnwrapError {
    #[error("Invalid Content-Length header: {0}")]
    InvalidContentLength(String),

    #[error("Envelope of {size} bytes exceeds the {limit} byte limit")]
    EnvelopeTooLarge { size: u64, limit: usize },

    #[error("Failed to read request body: {0}")]
    BodyRead(String),

    #[error("Malformed envelope JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("message.data is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Message attributes are not allowed: {}", .0.describe())]
    AttributesDisallowed(Attributes),

    #[error("Failed to rewrite request: {0}")]
    Rewrite(String),
}

impl UnwrapError {
    pub fn status(&self) -> StatusCode {
        match self {
            UnwrapError::EnvelopeTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UnwrapError::Rewrite(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            UnwrapError::EnvelopeTooLarge { .. } => TITLE_ENVELOPE_TOO_LARGE,
            UnwrapError::AttributesDisallowed(_) => TITLE_ATTRIBUTES_NOT_ALLOWED,
            UnwrapError::Rewrite(_) => TITLE_REWRITE_FAILED,
            _ => TITLE_MALFORMED_ENVELOPE,
        }
    }

    /// Client-facing detail string.
    pub fn detail(&self) -> String {
        match self {
            UnwrapError::MalformedJson(e) => sanitize_serde_error(e),
            UnwrapError::InvalidBase64(_) => "message.data is not valid base64".to_string(),
            UnwrapError::AttributesDisallowed(attributes) => attributes.describe(),
            UnwrapError::BodyRead(_) => "Request body could not be read".to_string(),
            UnwrapError::Rewrite(_) => "The unwrapped request could not be built".to_string(),
            other => other.to_string(),
        }
    }

    pub fn to_problem(&self) -> ProblemDetails {
        ProblemDetails::new(self.status(), self.title(), self.detail())
    }
}

impl IntoResponse for UnwrapError {
    fn into_response(self) -> Response {
        match &self {
            UnwrapError::Rewrite(_) => tracing::error!(error = %self, "Push request rewrite failed"),
            _ => tracing::warn!(error = %self, "Rejected push request"),
        }
        self.to_problem().into_response()
    }
}

/// JSON problem document (`status`, `type`, `title`, `detail`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemDetails {
    pub status: u16,
    #[serde(rename = "type")]
    pub problem_type: String,
    pub title: String,
    pub detail: String,
}

impl ProblemDetails {
    pub fn new(status: StatusCode, title: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            problem_type: ABOUT_BLANK.to_string(),
            title: title.into(),
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ProblemDetails {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_REQUEST);
        let body = match serde_json::to_vec(&self) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize problem document");
                return status.into_response();
            }
        };

        let content_length = HeaderValue::from(body.len());
        let mut response = Response::new(Body::from(body));
        *response.status_mut() = status;
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_LENGTH, content_length);
        response
    }
}

/// Sanitize serde error messages to avoid leaking internal type information.
///
/// Serde errors can contain internal struct/field names which shouldn't be
/// exposed to external clients. This function extracts the useful parts.
fn sanitize_serde_error(e: &serde_json::Error) -> String {
    let msg = e.to_string();

    if msg.contains("missing field")
        && let Some(start) = msg.find('`')
        && let Some(end) = msg[start + 1..].find('`')
    {
        let field = &msg[start + 1..start + 1 + end];
        return format!("Missing required field: {field}");
    }

    if msg.contains("invalid type") {
        return "Invalid data type in envelope".to_string();
    }

    if e.is_eof() {
        return "Request body is empty or truncated".to_string();
    }

    if e.is_syntax() {
        return "Request body is not valid JSON".to_string();
    }

    "Invalid envelope format".to_string()
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
