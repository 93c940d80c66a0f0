//! Codec for chat frames.
//!
//! Outbound envelopes are encoded as JSON text. Inbound frames are decoded
//! once into an [`Inbound`] variant: a JSON object carrying a `text` field,
//! or anything else taken verbatim as raw text.

use serde_json::Value;
use thiserror::Error;

use crate::envelope::Envelope;

/// Protocol errors that can occur during encoding/decoding.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// JSON encoding error.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Binary frame that is not valid UTF-8.
    #[error("Invalid UTF-8 in frame: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Encode an envelope to a JSON text frame.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn encode(envelope: &Envelope) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(envelope)?)
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A JSON object. `text` is `None` when the field is missing, null,
    /// or an empty value such as `false`, `0`, `[]` or `{}`.
    Structured { text: Option<String> },
    /// Any payload that is not a JSON object, or whose `text` field is a
    /// non-empty value that is not a string.
    Raw(String),
}

impl Inbound {
    /// Decode a text frame.
    ///
    /// Never fails: a payload that does not parse as an object with a
    /// string `text` field degrades to [`Inbound::Raw`].
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(mut fields)) => match fields.remove("text") {
                Some(Value::String(text)) => Inbound::Structured { text: Some(text) },
                Some(value) if !is_empty_value(&value) => Inbound::Raw(raw.to_string()),
                _ => Inbound::Structured { text: None },
            },
            _ => Inbound::Raw(raw.to_string()),
        }
    }

    /// Decode a binary frame as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not valid UTF-8.
    pub fn from_bytes(data: &[u8]) -> Result<Self, ProtocolError> {
        Ok(Self::parse(std::str::from_utf8(data)?))
    }

    /// The candidate text before trimming.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Inbound::Structured { text } => text.as_deref().unwrap_or_default(),
            Inbound::Raw(raw) => raw,
        }
    }

    /// The trimmed text, or `None` if nothing but whitespace remains.
    #[must_use]
    pub fn into_text(self) -> Option<String> {
        let trimmed = self.text().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Null, `false`, zero, and empty arrays or objects carry no text.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
    }
}
