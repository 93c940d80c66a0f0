//! # live-protocol
//!
//! Wire types for Ofrezco Live.
//!
//! This crate defines what travels over a chat connection and what the
//! interest notification endpoints return.
//!
//! ## Chat frames
//!
//! - `system` - Server notice sent to one connection (the welcome)
//! - `message` - Chat line broadcast to every member of a room
//!
//! Inbound frames are either `{"text": "..."}` or raw text.
//!
//! ## Example
//!
//! ```rust
//! use live_protocol::{codec, Envelope, Inbound};
//!
//! let inbound = Inbound::parse(r#"{"text": " Hola "}"#);
//! let text = inbound.into_text().unwrap();
//!
//! let envelope = Envelope::message(1, 2, text);
//! let encoded = codec::encode(&envelope).unwrap();
//! assert!(encoded.contains(r#""text":"Hola""#));
//! ```

pub mod codec;
pub mod envelope;
pub mod notify;

pub use codec::{encode, Inbound, ProtocolError};
pub use envelope::{now_seconds, Envelope, EnvelopeKind, ParticipantId};
pub use notify::{InterestSummary, PollResponse};
