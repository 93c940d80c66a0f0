//! Connection registry for chat rooms.
//!
//! The registry maps a [`RoomKey`] to the connections currently open in
//! that room. It is the only state shared between connection tasks. All
//! operations on one room run under that room's map shard lock, and a room
//! entry is removed in the same locked step that empties it.

use crate::room::RoomKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use live_protocol::Envelope;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Counter for process-unique connection ids.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for an open connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Allocate a new connection id.
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn_{}", self.0)
    }
}

/// Reasons a single delivery attempt can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The connection's writer is gone.
    #[error("Connection closed")]
    Closed,

    /// The connection's outbound queue is full.
    #[error("Outbound queue full")]
    Full,
}

/// Handle to one open connection.
///
/// Wraps the sending half of the connection's bounded outbound queue.
/// Equality is by connection id.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<Arc<Envelope>>,
}

impl ConnectionHandle {
    /// Create a handle with a fresh connection id.
    #[must_use]
    pub fn new(outbound: mpsc::Sender<Arc<Envelope>>) -> Self {
        Self {
            id: ConnectionId::generate(),
            outbound,
        }
    }

    /// Get the connection id.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Enqueue an envelope without waiting.
    ///
    /// # Errors
    ///
    /// Returns an error if the queue is closed or full.
    pub fn deliver(&self, envelope: &Arc<Envelope>) -> Result<(), DeliveryError> {
        self.outbound
            .try_send(Arc::clone(envelope))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => DeliveryError::Full,
                mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
            })
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnectionHandle {}

/// Outcome of a broadcast pass.
///
/// Delivery is at-most-once and best-effort: failed members are counted
/// here and nothing is retried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Members found in the room snapshot.
    pub attempted: usize,
    /// Members whose queue accepted the envelope.
    pub delivered: usize,
    /// Members whose delivery failed.
    pub failed: usize,
}

/// The room registry.
#[derive(Debug, Default)]
pub struct Registry {
    rooms: DashMap<RoomKey, HashMap<ConnectionId, ConnectionHandle>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room, creating the room if absent.
    ///
    /// Registering the same connection twice keeps a single membership.
    pub fn register(&self, key: RoomKey, conn: ConnectionHandle) {
        let mut room = self.rooms.entry(key).or_insert_with(|| {
            debug!(room = %key, "Creating room");
            HashMap::new()
        });
        let id = conn.id();
        room.insert(id, conn);

        debug!(room = %key, connection = %id, members = room.len(), "Registered");
    }

    /// Remove a connection from a room.
    ///
    /// The room entry is deleted when its last member leaves. Returns
    /// `true` if the connection was a member.
    pub fn unregister(&self, key: RoomKey, conn: &ConnectionHandle) -> bool {
        match self.rooms.entry(key) {
            Entry::Occupied(mut room) => {
                let removed = room.get_mut().remove(&conn.id()).is_some();
                if removed {
                    debug!(room = %key, connection = %conn.id(), members = room.get().len(), "Unregistered");
                }
                if room.get().is_empty() {
                    room.remove();
                    debug!(room = %key, "Deleted empty room");
                }
                removed
            }
            Entry::Vacant(_) => false,
        }
    }

    /// Point-in-time copy of a room's members.
    ///
    /// Returns an empty list if the room does not exist.
    #[must_use]
    pub fn snapshot(&self, key: RoomKey) -> Vec<ConnectionHandle> {
        self.rooms
            .get(&key)
            .map(|room| room.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Deliver an envelope to every current member of a room.
    ///
    /// Each member is tried independently against a snapshot taken before
    /// the first attempt. A failed member stays registered; it leaves the
    /// room only when its own connection closes.
    pub fn broadcast(&self, key: RoomKey, envelope: Envelope) -> DeliveryReport {
        let envelope = Arc::new(envelope);
        let members = self.snapshot(key);
        let mut report = DeliveryReport {
            attempted: members.len(),
            ..DeliveryReport::default()
        };

        for member in &members {
            match member.deliver(&envelope) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    debug!(room = %key, connection = %member.id(), error = %e, "Delivery failed");
                }
            }
        }

        trace!(
            room = %key,
            attempted = report.attempted,
            delivered = report.delivered,
            "Broadcast"
        );
        report
    }

    /// Check if a room exists.
    #[must_use]
    pub fn contains_room(&self, key: RoomKey) -> bool {
        self.rooms.contains_key(&key)
    }

    /// Get the member count for a room.
    #[must_use]
    pub fn member_count(&self, key: RoomKey) -> usize {
        self.rooms.get(&key).map(|room| room.len()).unwrap_or(0)
    }

    /// Get the number of rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Get registry statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            room_count: self.rooms.len(),
            connection_count: self.rooms.iter().map(|room| room.len()).sum(),
        }
    }
}

/// Registry statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of live rooms.
    pub room_count: usize,
    /// Number of registered connections.
    pub connection_count: usize,
}
