//! # Pub/Sub Push Unwrap
//!
//! Tower/Axum middleware that turns Pub/Sub push deliveries back into plain
//! HTTP requests. A push subscription POSTs every message wrapped in a JSON
//! envelope with a base64 `data` field; the wrapped application behind
//! [`PubsubUnwrapLayer`] receives the decoded payload instead, with the
//! configured content type.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Push subscription (POST)                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  PubsubUnwrapLayer (parse → decode → attribute policy)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Wrapped application (any tower Service)                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use axum::Router;
//! use axum::routing::post;
//! use pubsub_unwrap::{PubsubUnwrapLayer, UnwrapConfig};
//!
//! async fn handle(body: String) -> String {
//!     body
//! }
//!
//! let config = UnwrapConfig::default()
//!     .with_allow_attributes(true)
//!     .with_attributes_to_query(true);
//! let app: Router = Router::new()
//!     .route("/", post(handle))
//!     .layer(PubsubUnwrapLayer::new(config));
//! ```
//!
//! ## Configuration
//!
//! The demo server reads its settings from the environment:
//! ```bash
//! PUBSUB_ALLOW_ATTRIBUTES=false PUBSUB_CONTENT_TYPE=text/plain cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod utils;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult, ProblemDetails, UnwrapError};
pub use middleware::{PubsubUnwrapLayer, PushMetadataExt, UnwrapConfig};
pub use models::{Attributes, PushEnvelope, PushMetadata};
pub use routes::build_router;
