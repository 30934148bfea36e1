//! Packet types for the two framing layers the chat server speaks.
//!
//! The outer layer is Engine.IO: it owns the connection (open, ping/pong,
//! close). The inner layer is Socket.IO: it carries named events. Both are
//! plain enums here; [`crate::codec`] turns them into text frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Engine.IO protocol revision requested in the WebSocket URL (`EIO=3`).
///
/// Revision 3 is what Socket.IO 2.x servers speak. In this revision the
/// *client* sends pings and the server answers with pongs.
pub const ENGINE_IO_VERSION: u8 = 3;

// ---------------------------------------------------------------------------
// OpenInfo: the Engine.IO handshake
// ---------------------------------------------------------------------------

/// Payload of the Engine.IO `open` packet, sent by the server as the very
/// first frame of a connection.
///
/// `#[serde(rename_all = "camelCase")]` maps `ping_interval` to the
/// `pingInterval` key the server sends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenInfo {
    /// Session id assigned by the server.
    pub sid: String,

    /// Transports the server would let us upgrade to. We already run on
    /// WebSocket, so this is informational only.
    #[serde(default)]
    pub upgrades: Vec<String>,

    /// How often (ms) the client must ping to keep the session alive.
    pub ping_interval: u64,

    /// How long (ms) the server waits for a ping before dropping us.
    pub ping_timeout: u64,
}

// ---------------------------------------------------------------------------
// EnginePacket: outer framing
// ---------------------------------------------------------------------------

/// One Engine.IO packet. The leading digit of a text frame selects the
/// variant:
///
/// ```text
/// 0 open   1 close   2 ping   3 pong   4 message   5 upgrade   6 noop
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum EnginePacket {
    /// Server → client handshake.
    Open(OpenInfo),

    /// Either side is closing the Engine.IO session.
    Close,

    /// Keep-alive probe. The string is an optional probe payload.
    Ping(String),

    /// Answer to a ping, echoing its payload.
    Pong(String),

    /// A Socket.IO packet riding on Engine.IO.
    Message(SocketPacket),

    /// Transport upgrade confirmation (polling → websocket).
    Upgrade,

    /// No-op, used by the server to flush a polling cycle.
    Noop,
}

// ---------------------------------------------------------------------------
// SocketPacket: inner framing
// ---------------------------------------------------------------------------

/// One Socket.IO packet (the part after the Engine.IO `4`).
///
/// Only the default namespace `/` is used by the chat, so namespaces are
/// parsed past but not kept.
#[derive(Debug, Clone, PartialEq)]
pub enum SocketPacket {
    /// `0`: the namespace is connected.
    Connect,

    /// `1`: the namespace was disconnected by the server.
    Disconnect,

    /// `2`: a named event with positional JSON arguments.
    Event {
        /// Acknowledgement id the sender expects an answer for, if any.
        ack: Option<u64>,
        /// Event name, e.g. `"message"` or `"user joined"`.
        name: String,
        /// Positional arguments following the name.
        args: Vec<Value>,
    },

    /// `3`: acknowledgement of an event we emitted with an ack id.
    Ack { id: u64, args: Vec<Value> },

    /// `4`: the server rejected something. Carries the raw error payload
    /// rendered as text.
    Error(String),
}

impl SocketPacket {
    /// Convenience constructor for an outbound event without an ack id.
    pub fn event(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self::Event {
            ack: None,
            name: name.into(),
            args,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
