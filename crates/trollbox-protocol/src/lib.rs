//! Wire protocol for Trollbox.
//!
//! This crate defines the "language" the chat server speaks:
//!
//! - **Types** ([`EnginePacket`], [`SocketPacket`], [`OpenInfo`]): the
//!   packets that travel on the WebSocket.
//! - **Codec** ([`codec::decode`], [`codec::encode`]): how those packets
//!   are converted to and from text frames.
//! - **Events** ([`events`]): the fixed chat event vocabulary.
//! - **Errors** ([`ProtocolError`]): what can go wrong while framing.
//!
//! # Architecture
//!
//! The server is a Socket.IO 2.x endpoint. Every WebSocket text frame is an
//! Engine.IO packet; Engine.IO `message` packets carry Socket.IO packets;
//! Socket.IO `EVENT` packets carry a JSON array `[name, ...args]`.
//!
//! ```text
//! "42[\"message\",\"hi\"]"
//!  │└─ Socket.IO EVENT
//!  └── Engine.IO MESSAGE
//! ```
//!
//! This crate knows nothing about connections or chat semantics. It only
//! knows how to frame and unframe packets.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

pub mod codec;
mod error;
pub mod events;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use error::ProtocolError;
pub use types::{EnginePacket, OpenInfo, SocketPacket, ENGINE_IO_VERSION};
