//! Room identity for two-party chats.

use live_protocol::ParticipantId;
use std::fmt;

/// Canonical identity of a two-party room.
///
/// The pair is always stored as `(min, max)`, so the key is the same no
/// matter which participant opened the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomKey {
    low: ParticipantId,
    high: ParticipantId,
}

impl RoomKey {
    /// Derive the room key for two participants.
    #[must_use]
    pub fn derive(a: ParticipantId, b: ParticipantId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    /// The smaller participant id.
    #[must_use]
    pub fn low(&self) -> ParticipantId {
        self.low
    }

    /// The larger participant id.
    #[must_use]
    pub fn high(&self) -> ParticipantId {
        self.high
    }

    /// Whether both sides are the same participant.
    #[must_use]
    pub fn is_self_room(&self) -> bool {
        self.low == self.high
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.low, self.high)
    }
}
