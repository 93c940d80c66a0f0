//! Fixtures shared by the Ofrezco Live benchmarks.

use live_protocol::Envelope;
use ofrezco_live_core::{ConnectionHandle, Registry, RoomKey};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Register `members` connections in one room.
///
/// Returns the receivers; dropping one turns its member stale.
pub fn fill_room(
    registry: &Registry,
    key: RoomKey,
    members: usize,
    capacity: usize,
) -> Vec<mpsc::Receiver<Arc<Envelope>>> {
    (0..members)
        .map(|_| {
            let (tx, rx) = mpsc::channel(capacity);
            registry.register(key, ConnectionHandle::new(tx));
            rx
        })
        .collect()
}

/// Discard everything queued on the given receivers.
pub fn drain(receivers: &mut [mpsc::Receiver<Arc<Envelope>>]) {
    for rx in receivers {
        while rx.try_recv().is_ok() {}
    }
}
