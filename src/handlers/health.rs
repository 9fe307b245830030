//! Health endpoint.
//!
//! `GET /health` is never unwrapped, which makes it a convenient check that
//! non-POST traffic passes through the middleware untouched.

use axum::Json;
use chrono::Utc;
use tracing::instrument;

use crate::models::HealthResponse;

/// Health check endpoint.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "timestamp": "2024-01-15T10:30:00Z"
/// }
/// ```
#[instrument]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    })
}
