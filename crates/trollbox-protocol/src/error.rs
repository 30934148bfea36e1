//! Error types for the protocol layer.
//!
//! Each crate in Trollbox defines its own error enum. When you see a
//! `ProtocolError`, the problem is in packet framing, not in networking or
//! in chat payload decoding.

/// Errors that can occur while decoding or encoding packets.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame was empty. Engine.IO packets always start with a type digit.
    #[error("empty packet")]
    Empty,

    /// The leading type digit is not a known Engine.IO or Socket.IO type.
    ///
    /// `layer` is `"engine"` or `"socket"` so logs show which framing
    /// level rejected the byte.
    #[error("unknown {layer} packet type {kind:?}")]
    UnknownType { layer: &'static str, kind: char },

    /// The JSON part of a packet failed to parse.
    #[error("invalid packet json: {0}")]
    Json(#[from] serde_json::Error),

    /// The packet parsed but violates the framing rules, e.g. an `EVENT`
    /// whose payload is not an array starting with a string name.
    #[error("invalid packet: {0}")]
    InvalidPacket(String),

    /// A packet type this client does not speak (binary events and acks).
    #[error("unsupported packet: {0}")]
    Unsupported(&'static str),
}
