mod api;
mod envelope;

pub use api::{EchoResponse, HealthResponse};
pub use envelope::{Attributes, PushEnvelope, PushMessage, PushMetadata};
