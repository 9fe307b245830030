//! Pub/Sub push envelope types.
//!
//! A push subscription delivers each message as a JSON POST body:
//!
//! ```json
//! {
//!   "message": {
//!     "data": "eyJoZWxsbyI6IndvcmxkIn0=",
//!     "attributes": {"origin": "billing"},
//!     "messageId": "2070443601311540",
//!     "publishTime": "2021-02-26T19:13:55.749Z"
//!   },
//!   "subscription": "projects/my-project/subscriptions/my-subscription"
//! }
//! ```
//!
//! Only `message.data` is required. Everything else is optional metadata.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The JSON wrapper placed around a published message by push delivery.
#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    /// The wrapped message
    pub message: PushMessage,
    /// Full subscription name (`projects/{project}/subscriptions/{name}`)
    #[serde(default)]
    pub subscription: Option<String>,
}

/// The published message inside a push envelope.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    /// Base64 (standard alphabet, padded) encoding of the real payload
    pub data: String,
    /// Optional string-keyed metadata attached by the publisher
    #[serde(default)]
    pub attributes: Attributes,
    /// Server-assigned message ID
    #[serde(default)]
    pub message_id: Option<String>,
    /// Publish timestamp as sent by the service (RFC 3339)
    #[serde(default)]
    pub publish_time: Option<String>,
    /// Ordering key, present only for ordered delivery
    #[serde(default)]
    pub ordering_key: Option<String>,
}

impl PushMessage {
    /// Decode `data` into the original payload bytes.
    pub fn decode_data(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(self.data.as_bytes())
    }
}

/// Message attributes, kept in the order they appear in the envelope.
///
/// Serialized as a JSON object. A JSON `null` deserializes to an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<(String, String)>);

impl Attributes {
    /// Create an empty attribute set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute, replacing the value of an existing key in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encode as an `application/x-www-form-urlencoded` query string.
    ///
    /// Reserved characters are percent-escaped and spaces become `+`,
    /// so `{"a": "1 2", "b": "x/y"}` encodes to `a=1+2&b=x%2Fy`.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.iter())
            .finish()
    }

    /// Human-readable listing used in problem responses: `"k1"="v1", "k2"="v2"`.
    pub fn describe(&self) -> String {
        self.iter()
            .map(|(k, v)| format!("{k:?}={v:?}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl<K, V> FromIterator<(K, V)> for Attributes
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (k, v) in iter {
            attributes.insert(k, v);
        }
        attributes
    }
}

impl Serialize for Attributes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Attributes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(AttributesVisitor)
    }
}

struct AttributesVisitor;

impl<'de> Visitor<'de> for AttributesVisitor {
    type Value = Attributes;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of string attribute values")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut attributes = Attributes::new();
        while let Some((key, value)) = access.next_entry::<String, String>()? {
            attributes.insert(key, value);
        }
        Ok(attributes)
    }

    fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(Attributes::new())
    }

    fn visit_none<E: serde::de::Error>(self) -> Result<Self::Value, E> {
        Ok(Attributes::new())
    }
}

/// Envelope metadata attached to the rewritten request's extensions.
///
/// Lets downstream handlers see where a message came from even when its
/// attributes were not turned into query parameters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PushMetadata {
    pub subscription: Option<String>,
    pub message_id: Option<String>,
    pub publish_time: Option<String>,
    pub ordering_key: Option<String>,
    pub attributes: Attributes,
}

impl PushMetadata {
    pub(crate) fn from_parts(subscription: Option<String>, message: PushMessage) -> Self {
        Self {
            subscription,
            message_id: message.message_id,
            publish_time: message.publish_time,
            ordering_key: message.ordering_key,
            attributes: message.attributes,
        }
    }
}
