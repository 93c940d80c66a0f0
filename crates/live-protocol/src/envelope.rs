//! Envelope types for the chat protocol.
//!
//! Envelopes are the only frames the server writes to a chat connection.
//! Each one is serialized as a JSON text frame tagged by `type`.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier of a chat participant (a marketplace user id).
pub type ParticipantId = i64;

/// Envelope kind identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    System,
    Message,
}

impl EnvelopeKind {
    /// The wire name of this kind.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeKind::System => "system",
            EnvelopeKind::Message => "message",
        }
    }
}

/// A normalized outbound frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Envelope {
    /// Server notice addressed to a single connection.
    #[serde(rename = "system")]
    System {
        /// Notice text.
        text: String,
        /// Server timestamp in epoch seconds.
        ts: f64,
    },

    /// A chat line broadcast to every member of a room.
    #[serde(rename = "message")]
    Message {
        /// Participant that sent the line.
        from: ParticipantId,
        /// Counterpart the sender addressed.
        to: ParticipantId,
        /// Trimmed, non-empty text.
        text: String,
        /// Server timestamp in epoch seconds.
        ts: f64,
    },
}

impl Envelope {
    /// Get the envelope kind.
    #[must_use]
    pub fn kind(&self) -> EnvelopeKind {
        match self {
            Envelope::System { .. } => EnvelopeKind::System,
            Envelope::Message { .. } => EnvelopeKind::Message,
        }
    }

    /// Create a system envelope stamped with the current time.
    #[must_use]
    pub fn system(text: impl Into<String>) -> Self {
        Envelope::System {
            text: text.into(),
            ts: now_seconds(),
        }
    }

    /// Create a message envelope stamped with the current time.
    ///
    /// Callers are responsible for trimming and rejecting empty text;
    /// see [`crate::Inbound::into_text`].
    #[must_use]
    pub fn message(from: ParticipantId, to: ParticipantId, text: impl Into<String>) -> Self {
        Envelope::Message {
            from,
            to,
            text: text.into(),
            ts: now_seconds(),
        }
    }

    /// The text carried by this envelope.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Envelope::System { text, .. } | Envelope::Message { text, .. } => text,
        }
    }
}

/// Current wall-clock time in fractional epoch seconds.
///
/// A clock set before the epoch yields `0.0`.
#[must_use]
pub fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_kind() {
        assert_eq!(Envelope::system("hi").kind(), EnvelopeKind::System);
        assert_eq!(Envelope::message(1, 2, "hi").kind(), EnvelopeKind::Message);
        assert_eq!(EnvelopeKind::Message.as_str(), "message");
    }

    #[test]
    fn test_message_wire_shape() {
        let envelope = Envelope::Message {
            from: 1,
            to: 2,
            text: "Hola".to_string(),
            ts: 1_700_000_000.5,
        };

        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "message");
        assert_eq!(value["from"], 1);
        assert_eq!(value["to"], 2);
        assert_eq!(value["text"], "Hola");
        assert_eq!(value["ts"], 1_700_000_000.5);
    }

    #[test]
    fn test_system_wire_shape() {
        let value = serde_json::to_value(Envelope::system("Conectado al chat")).unwrap();
        assert_eq!(value["type"], "system");
        assert_eq!(value["text"], "Conectado al chat");
        assert!(value.get("from").is_none());
        assert!(value["ts"].as_f64().unwrap() > 0.0);
    }
}
