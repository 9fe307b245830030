//! HTTP middleware.
//!
//! - **Pub/Sub unwrap**: Rewrites push-envelope POSTs into the request the
//!   publisher meant to send (see [`pubsub`])
//!
//! # Architecture
//!
//! ```text
//! Request → Request ID → Trace → Pub/Sub Unwrap → Handler → Response
//!                                    ↓
//!                          400/413 problem document
//! ```

pub mod pubsub;

pub use pubsub::{
    DEFAULT_CONTENT_TYPE, DEFAULT_MAX_ENVELOPE_SIZE, PubsubUnwrapLayer, PubsubUnwrapService,
    PushMetadataExt, UnwrapConfig, rewrite_request, unwrap_push_request,
};
