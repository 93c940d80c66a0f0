//! # ofrezco-live-core
//!
//! Room registry, chat broker, and interest notification cursor for
//! Ofrezco Live.
//!
//! This crate provides the building blocks the server wires together:
//!
//! - **RoomKey** - Order-independent identity of a two-party room
//! - **Registry** - Live connections per room, the only shared state
//! - **Broker** - Connection lifecycle, decode and best-effort broadcast
//! - **CursorQuery** - Stateless "anything new since id N?" reads
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Session   │────▶│   Broker    │────▶│  Registry   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!
//! ┌─────────────┐     ┌───────────────┐
//! │ CursorQuery │────▶│ InterestStore │
//! └─────────────┘     └───────────────┘
//! ```

pub mod broker;
pub mod cursor;
pub mod registry;
pub mod room;
pub mod store;

pub use broker::{Broker, BrokerConfig, Outbound, Session};
pub use cursor::{CursorQuery, NotifyError};
pub use registry::{
    ConnectionHandle, ConnectionId, DeliveryError, DeliveryReport, Registry, RegistryStats,
};
pub use room::RoomKey;
pub use store::{
    InterestId, InterestRecord, InterestStatus, InterestStore, Listing, ListingId, MemoryStore,
    ProfileId, StoreError, UserId,
};
