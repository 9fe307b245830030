//! Demo application router with the unwrap middleware in front.
//!
//! # Middleware Stack (outermost first)
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Sets and propagates X-Request-Id
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          │
//!          ▼
//! ┌──────────────────┐
//! │  Pub/Sub Unwrap  │ ← 400/413 on bad envelopes (POST only)
//! └────────┬─────────┘
//!          │
//!          ▼
//!      Handler
//! ```
//!
//! # Routes
//!
//! - `GET /health` - Health check (passes through unchanged)
//! - `POST /greeting` - Returns the published JSON payload
//! - `POST /echo` - Describes the unwrapped request

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::error::AppResult;
use crate::handlers;
use crate::middleware::PubsubUnwrapLayer;

/// Build the demo router with all routes and middleware configured.
///
/// # Errors
///
/// Returns `AppError::ConfigError` if the unwrap configuration is invalid.
pub fn build_router(config: &Config) -> AppResult<Router> {
    let unwrap_config = config.unwrap_config()?;
    info!(
        content_type = ?unwrap_config.content_type,
        allow_attributes = unwrap_config.allow_attributes,
        attributes_to_query = unwrap_config.attributes_to_query,
        max_envelope_size = unwrap_config.max_envelope_size,
        "Pub/Sub unwrap middleware configured"
    );

    let router = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/greeting", post(handlers::greeting))
        .route("/echo", post(handlers::echo))
        // Applied bottom to top: the last layer sees the request first
        .layer(DefaultBodyLimit::max(config.max_envelope_size))
        .layer(PubsubUnwrapLayer::new(unwrap_config))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    Ok(router)
}
