use chrono::{DateTime, Utc};
use serde::Serialize;

use super::PushMetadata;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service health status
    pub status: String,
    /// Service version
    pub version: String,
    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// What the wrapped application received after unwrapping.
#[derive(Debug, Serialize)]
pub struct EchoResponse {
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub query: Option<String>,
    /// Envelope metadata, absent when the request was not unwrapped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub push: Option<PushMetadata>,
    /// Body decoded as UTF-8 (lossy)
    pub body: String,
}
