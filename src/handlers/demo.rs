//! Demo endpoints standing in for the wrapped application.
//!
//! Neither handler parses push envelopes; they only ever see the
//! unwrapped request.

use axum::Json;
use axum::body::to_bytes;
use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderName};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::{AppError, AppResult};
use crate::models::{EchoResponse, PushMetadata};

/// `POST /greeting` - return the published JSON payload as-is.
#[instrument(skip_all)]
pub async fn greeting(Json(payload): Json<Value>) -> Json<Value> {
    debug!("Greeting received");
    Json(payload)
}

/// `POST /echo` - describe the request as the wrapped application sees it.
#[instrument(skip_all)]
pub async fn echo(request: Request) -> AppResult<Json<EchoResponse>> {
    let (parts, body) = request.into_parts();
    let header = |name: HeaderName| {
        parts
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };

    let content_type = header(CONTENT_TYPE);
    let content_length = header(CONTENT_LENGTH).and_then(|v| v.parse().ok());
    let query = parts.uri.query().map(str::to_string);
    let push = parts.extensions.get::<PushMetadata>().cloned();

    let body = to_bytes(body, usize::MAX)
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read body: {e}")))?;

    Ok(Json(EchoResponse {
        content_type,
        content_length,
        query,
        push,
        body: String::from_utf8_lossy(&body).into_owned(),
    }))
}
