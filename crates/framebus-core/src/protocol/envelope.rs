//! The wire envelope and its JSON codec.
//!
//! The channel only carries strings, so every message is wrapped in an
//! [`Envelope`] and serialized to one JSON text:
//!
//! ```json
//! {"type":"init.dfp","data":{"slot":"top"},"options":{"targetOrigin":"*"}}
//! ```
//!
//! # Field names
//!
//! The JSON keys (`type`, `targetOrigin`) are fixed by the peers on the other
//! side of the channel, so the Rust fields are renamed with `#[serde(rename)]`
//! rather than changing the wire format.
//!
//! # Unknown option keys
//!
//! `options` may carry keys this crate does not know about.  They are kept
//! in [`PostOptions::extra`] via `#[serde(flatten)]`, so a proxied envelope
//! reaches its next hop with the same shape it arrived with.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::origin::WILDCARD_ORIGIN;

/// Errors produced while decoding an inbound payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The payload is not JSON, or not an object with a string `type`.
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Delivery hints carried alongside a message.
///
/// # Example
///
/// ```rust
/// use framebus_core::PostOptions;
///
/// let options = PostOptions::to_origin("https://www.example.com");
/// assert_eq!(options.target_origin(), "https://www.example.com");
///
/// // Unset fields fall back to the documented defaults.
/// assert_eq!(PostOptions::default().target_origin(), "*");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostOptions {
    /// Origin the receiving context must have for the channel to deliver.
    ///
    /// `None` means "not supplied by the caller"; it is filled with `"*"`
    /// before the envelope goes on the wire.
    #[serde(
        rename = "targetOrigin",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub target_origin: Option<String>,

    /// Any other keys, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PostOptions {
    /// Options restricting delivery to `origin`.
    pub fn to_origin(origin: impl Into<String>) -> Self {
        Self {
            target_origin: Some(origin.into()),
            extra: Map::new(),
        }
    }

    /// Adds an extra key, keeping any value the caller already set.
    pub fn with(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.entry(key).or_insert(value);
        self
    }

    /// The effective target origin (`"*"` when unset).
    pub fn target_origin(&self) -> &str {
        self.target_origin.as_deref().unwrap_or(WILDCARD_ORIGIN)
    }

    /// Fills every unset field with its default, leaving caller values alone.
    pub fn with_defaults(mut self) -> Self {
        if self.target_origin.is_none() {
            self.target_origin = Some(WILDCARD_ORIGIN.to_string());
        }
        self
    }
}

/// The unit sent over the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Namespace-qualified message type, e.g. `"init.dfp"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Arbitrary payload.  Absent on the wire decodes as `null`.
    #[serde(default)]
    pub data: Value,

    /// Delivery hints.  Absent or `null` on the wire decodes as defaults.
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: PostOptions,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, data: Value, options: PostOptions) -> Self {
        Self {
            kind: kind.into(),
            data,
            options,
        }
    }
}

/// Serializes an envelope to the single string the channel carries.
///
/// # Errors
///
/// Returns the `serde_json` error if serialization fails.
pub fn encode_envelope(envelope: &Envelope) -> Result<String, serde_json::Error> {
    serde_json::to_string(envelope)
}

/// Parses a raw inbound string into an envelope.
///
/// # Errors
///
/// Returns [`DecodeError::Malformed`] for anything that is not a JSON object
/// with a string `type` field.
pub fn decode_envelope(raw: &str) -> Result<Envelope, DecodeError> {
    let value: Value = serde_json::from_str(raw)?;
    // serde would also accept a struct written as a JSON array.
    if !value.is_object() {
        return Err(DecodeError::Malformed(de::Error::custom(
            "envelope must be a JSON object",
        )));
    }
    Ok(serde_json::from_value(value)?)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
