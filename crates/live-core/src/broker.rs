//! Chat broker and per-connection sessions.
//!
//! A connection moves through `CONNECTING -> OPEN -> CLOSED`. [`Broker::open`]
//! performs the first transition and hands back a [`Session`]; the session
//! exists exactly while the connection is open. Dropping it is the only way
//! to close, and the drop unregisters the connection on every exit path.

use crate::registry::{ConnectionHandle, ConnectionId, DeliveryReport, Registry};
use crate::room::RoomKey;
use live_protocol::{Envelope, Inbound, ParticipantId};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// Default welcome notice.
pub const DEFAULT_WELCOME_TEXT: &str = "Conectado al chat";

/// Default outbound queue capacity per connection.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Broker configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Capacity of each connection's outbound queue.
    pub outbound_capacity: usize,
    /// Text of the system envelope sent on connect.
    pub welcome_text: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            welcome_text: DEFAULT_WELCOME_TEXT.to_string(),
        }
    }
}

/// Receiving half of a connection's outbound queue.
pub type Outbound = mpsc::Receiver<Arc<Envelope>>;

/// The chat broker.
///
/// Built once at startup and shared with every connection handler.
#[derive(Debug)]
pub struct Broker {
    registry: Arc<Registry>,
    config: BrokerConfig,
}

impl Broker {
    /// Create a new broker with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(BrokerConfig::default())
    }

    /// Create a new broker with custom configuration.
    #[must_use]
    pub fn with_config(config: BrokerConfig) -> Self {
        info!("Creating broker with config: {:?}", config);
        Self {
            registry: Arc::new(Registry::new()),
            config,
        }
    }

    /// Get the room registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Open a connection between `me` and `other`.
    ///
    /// The welcome envelope is queued before registration, so it is always
    /// the first frame this connection sees and no other member receives it.
    pub fn open(&self, me: ParticipantId, other: ParticipantId) -> (Session, Outbound) {
        let (tx, rx) = mpsc::channel(self.config.outbound_capacity.max(1));
        let handle = ConnectionHandle::new(tx);
        let key = RoomKey::derive(me, other);

        if let Err(e) = handle.deliver(&Arc::new(Envelope::system(&self.config.welcome_text))) {
            warn!(connection = %handle.id(), error = %e, "Failed to queue welcome");
        }
        self.registry.register(key, handle.clone());

        debug!(connection = %handle.id(), room = %key, me, other, "Session opened");

        let session = Session {
            registry: Arc::clone(&self.registry),
            key,
            handle,
            me,
            other,
        };
        (session, rx)
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

/// An open chat connection.
#[derive(Debug)]
pub struct Session {
    registry: Arc<Registry>,
    key: RoomKey,
    handle: ConnectionHandle,
    me: ParticipantId,
    other: ParticipantId,
}

impl Session {
    /// Get the connection id.
    #[must_use]
    pub fn id(&self) -> ConnectionId {
        self.handle.id()
    }

    /// Get the room key.
    #[must_use]
    pub fn key(&self) -> RoomKey {
        self.key
    }

    /// The participant this connection speaks for.
    #[must_use]
    pub fn me(&self) -> ParticipantId {
        self.me
    }

    /// The counterpart this connection addresses.
    #[must_use]
    pub fn other(&self) -> ParticipantId {
        self.other
    }

    /// Handle one inbound frame.
    ///
    /// Returns `None` when the frame carried no text after trimming; such
    /// frames are dropped without a broadcast or an error.
    pub fn receive(&self, inbound: Inbound) -> Option<DeliveryReport> {
        let Some(text) = inbound.into_text() else {
            trace!(connection = %self.id(), "Discarded empty frame");
            return None;
        };

        let envelope = Envelope::message(self.me, self.other, text);
        Some(self.registry.broadcast(self.key, envelope))
    }

    /// Decode and handle one inbound text frame.
    pub fn receive_text(&self, raw: &str) -> Option<DeliveryReport> {
        self.receive(Inbound::parse(raw))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.registry.unregister(self.key, &self.handle);
        debug!(connection = %self.handle.id(), room = %self.key, "Session closed");
    }
}
