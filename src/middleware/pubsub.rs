//! Pub/Sub push envelope unwrapping middleware.
//!
//! Push subscriptions deliver every message as a POST whose JSON body wraps
//! the real payload in base64. This layer turns such a request back into the
//! request the publisher meant to send, so the wrapped application never has
//! to know it sits behind a push subscription.
//!
//! # Request Flow
//!
//! ```text
//! POST {"message":{"data":"eyJo..."}}          GET /health
//!          │                                       │
//!          ▼                                       │
//!   parse + decode envelope ── 400/413 problem     │
//!          │                                       │
//!          ▼                                       │
//!   attribute policy ─────── 400 problem           │
//!          │                                       │
//!          ▼                                       ▼
//!   rewritten request ──────────► inner service ◄──┘
//! ```
//!
//! The rewritten request has:
//!
//! - body = base64-decoded `message.data`
//! - `Content-Length` = decoded byte length
//! - `Content-Type` = [`UnwrapConfig::content_type`]
//! - query string = encoded attributes, when [`UnwrapConfig::attributes_to_query`] is set
//! - a [`PushMetadata`] extension with the envelope metadata
//!
//! Non-POST requests are forwarded untouched and their body is never read.

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{Body, Bytes, to_bytes};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE, InvalidHeaderValue, TRANSFER_ENCODING};
use axum::http::request::Parts;
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, Uri};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::debug;

use crate::error::UnwrapError;
use crate::metrics::{self, outcome};
use crate::models::{PushEnvelope, PushMetadata};

/// Default content type of the unwrapped request.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Default upper bound on the envelope body (10MB).
pub const DEFAULT_MAX_ENVELOPE_SIZE: usize = 10 * 1024 * 1024;

/// Per-layer unwrapping configuration. Immutable once the layer is built.
#[derive(Debug, Clone)]
pub struct UnwrapConfig {
    /// Content type given to the unwrapped request (default: `application/json`)
    pub content_type: HeaderValue,
    /// When false, envelopes carrying any attribute are rejected with 400
    pub allow_attributes: bool,
    /// When true (and attributes are allowed), attributes replace the request's query string
    pub attributes_to_query: bool,
    /// Largest accepted envelope body in bytes
    pub max_envelope_size: usize,
}

impl Default for UnwrapConfig {
    fn default() -> Self {
        Self {
            content_type: HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
            allow_attributes: true,
            attributes_to_query: false,
            max_envelope_size: DEFAULT_MAX_ENVELOPE_SIZE,
        }
    }
}

impl UnwrapConfig {
    /// Set the forwarded content type.
    ///
    /// # Errors
    ///
    /// Returns `InvalidHeaderValue` if `content_type` is not a valid header value.
    pub fn with_content_type(mut self, content_type: &str) -> Result<Self, InvalidHeaderValue> {
        self.content_type = HeaderValue::from_str(content_type)?;
        Ok(self)
    }

    /// Accept or reject envelopes that carry attributes.
    pub fn with_allow_attributes(mut self, allow: bool) -> Self {
        self.allow_attributes = allow;
        self
    }

    /// Replace the query string with the encoded attributes (only when attributes are allowed).
    pub fn with_attributes_to_query(mut self, enabled: bool) -> Self {
        self.attributes_to_query = enabled;
        self
    }

    /// Set the largest accepted envelope body in bytes.
    pub fn with_max_envelope_size(mut self, max: usize) -> Self {
        self.max_envelope_size = max;
        self
    }
}

/// Layer that unwraps Pub/Sub push envelopes before the inner service sees them.
#[derive(Clone, Default)]
pub struct PubsubUnwrapLayer {
    config: Arc<UnwrapConfig>,
}

impl PubsubUnwrapLayer {
    pub fn new(config: UnwrapConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &UnwrapConfig {
        &self.config
    }
}

impl<S> Layer<S> for PubsubUnwrapLayer {
    type Service = PubsubUnwrapService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PubsubUnwrapService {
            inner,
            config: self.config.clone(),
        }
    }
}

/// Service produced by [`PubsubUnwrapLayer`].
#[derive(Clone)]
pub struct PubsubUnwrapService<S> {
    inner: S,
    config: Arc<UnwrapConfig>,
}

impl<S> Service<Request<Body>> for PubsubUnwrapService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let config = self.config.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if req.method() != Method::POST {
                debug!(method = %req.method(), path = %req.uri().path(), "Passing request through");
                metrics::record_unwrap_outcome(outcome::PASSED_THROUGH);
                return inner.call(req).await;
            }

            match unwrap_push_request(req, &config).await {
                Ok(rewritten) => {
                    metrics::record_unwrap_outcome(outcome::FORWARDED);
                    inner.call(rewritten).await
                }
                Err(err) => {
                    metrics::record_unwrap_outcome(match &err {
                        UnwrapError::AttributesDisallowed(_) => outcome::REJECTED,
                        _ => outcome::MALFORMED,
                    });
                    Ok(err.into_response())
                }
            }
        })
    }
}

/// Read the envelope from `req` and build the unwrapped request.
///
/// The body is read up to the declared `Content-Length`. A missing or zero
/// length is read as an empty body, which then fails to parse.
///
/// # Errors
///
/// See [`rewrite_request`]; additionally fails on an unparseable
/// `Content-Length`, an oversize envelope, or a body read error.
pub async fn unwrap_push_request(
    req: Request<Body>,
    config: &UnwrapConfig,
) -> Result<Request<Body>, UnwrapError> {
    let (parts, body) = req.into_parts();

    let declared = declared_content_length(&parts.headers)?;
    let limit = usize::try_from(declared)
        .ok()
        .filter(|len| *len <= config.max_envelope_size)
        .ok_or(UnwrapError::EnvelopeTooLarge {
            size: declared,
            limit: config.max_envelope_size,
        })?;

    let envelope = if limit == 0 {
        Bytes::new()
    } else {
        to_bytes(body, limit)
            .await
            .map_err(|e| UnwrapError::BodyRead(e.to_string()))?
    };

    rewrite_request(parts, &envelope, config)
}

/// Build the unwrapped request from already-read envelope bytes.
///
/// Consumes the original request parts; the result is a new request value.
///
/// # Errors
///
/// - `MalformedJson` if the envelope is not JSON or lacks `message.data`
/// - `InvalidBase64` if `message.data` does not decode
/// - `AttributesDisallowed` if attributes are present and not allowed
/// - `Rewrite` if the new URI cannot be assembled
pub fn rewrite_request(
    mut parts: Parts,
    envelope: &[u8],
    config: &UnwrapConfig,
) -> Result<Request<Body>, UnwrapError> {
    let PushEnvelope {
        message,
        subscription,
    } = serde_json::from_slice(envelope)?;
    let payload = message.decode_data()?;

    // Query rewriting only applies when attributes are allowed.
    let rewrite_query = if !config.allow_attributes {
        if !message.attributes.is_empty() {
            return Err(UnwrapError::AttributesDisallowed(message.attributes));
        }
        false
    } else {
        config.attributes_to_query
    };

    debug!(
        subscription = subscription.as_deref().unwrap_or("-"),
        message_id = message.message_id.as_deref().unwrap_or("-"),
        attributes = message.attributes.len(),
        payload_bytes = payload.len(),
        "Unwrapped push envelope"
    );
    metrics::record_payload_size(payload.len());

    parts
        .headers
        .insert(CONTENT_LENGTH, HeaderValue::from(payload.len()));
    parts
        .headers
        .insert(CONTENT_TYPE, config.content_type.clone());
    parts.headers.remove(TRANSFER_ENCODING);

    if rewrite_query {
        parts.uri = replace_query(&parts.uri, &message.attributes.to_query_string())?;
    }

    parts
        .extensions
        .insert(PushMetadata::from_parts(subscription, message));

    Ok(Request::from_parts(parts, Body::from(payload)))
}

/// Declared body length; absent means zero.
fn declared_content_length(headers: &HeaderMap) -> Result<u64, UnwrapError> {
    let Some(value) = headers.get(CONTENT_LENGTH) else {
        return Ok(0);
    };

    value
        .to_str()
        .ok()
        .and_then(|s| s.trim().parse::<u64>().ok())
        .ok_or_else(|| UnwrapError::InvalidContentLength(format!("{value:?}")))
}

/// Replace the query of `uri`, discarding any existing one.
fn replace_query(uri: &Uri, query: &str) -> Result<Uri, UnwrapError> {
    let path_and_query = if query.is_empty() {
        uri.path().to_string()
    } else {
        format!("{}?{query}", uri.path())
    };

    let mut uri_parts = uri.clone().into_parts();
    uri_parts.path_and_query = Some(
        PathAndQuery::try_from(path_and_query).map_err(|e| UnwrapError::Rewrite(e.to_string()))?,
    );
    Uri::from_parts(uri_parts).map_err(|e| UnwrapError::Rewrite(e.to_string()))
}

/// Extension trait for reading push metadata from an unwrapped request.
pub trait PushMetadataExt {
    /// Envelope metadata, if the request was unwrapped by [`PubsubUnwrapLayer`].
    fn push_metadata(&self) -> Option<&PushMetadata>;
}

impl<B> PushMetadataExt for Request<B> {
    fn push_metadata(&self) -> Option<&PushMetadata> {
        self.extensions().get::<PushMetadata>()
    }
}
