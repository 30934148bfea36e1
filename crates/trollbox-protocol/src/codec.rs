//! Text framing for Engine.IO and Socket.IO packets.
//!
//! A WebSocket text frame holds exactly one Engine.IO packet:
//!
//! ```text
//! <engine type digit>[<engine payload>]
//! ```
//!
//! When the Engine.IO type is `4` (message), the payload is a Socket.IO
//! packet:
//!
//! ```text
//! <socket type digit>[/<namespace>,][<ack id>][<json>]
//! ```
//!
//! ## Example
//!
//! ```rust
//! use trollbox_protocol::{codec, EnginePacket, SocketPacket};
//!
//! let packet = codec::decode(r#"42["message","hi"]"#).unwrap();
//! assert_eq!(
//!     packet,
//!     EnginePacket::Message(SocketPacket::event("message", vec!["hi".into()])),
//! );
//!
//! let frame = codec::encode_event("message", vec!["hi".into()]);
//! assert_eq!(frame, r#"42["message","hi"]"#);
//! ```

use serde_json::Value;

use crate::{EnginePacket, ProtocolError, SocketPacket};

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Parses one text frame into an [`EnginePacket`].
///
/// # Errors
/// - [`ProtocolError::Empty`] for an empty frame
/// - [`ProtocolError::UnknownType`] for an unknown type digit
/// - [`ProtocolError::Json`] when a JSON payload is malformed
/// - [`ProtocolError::InvalidPacket`] / [`ProtocolError::Unsupported`] for
///   Socket.IO packets this client cannot interpret
pub fn decode(text: &str) -> Result<EnginePacket, ProtocolError> {
    let (kind, body) = split_type(text)?;

    match kind {
        '0' => Ok(EnginePacket::Open(serde_json::from_str(body)?)),
        '1' => Ok(EnginePacket::Close),
        '2' => Ok(EnginePacket::Ping(body.to_owned())),
        '3' => Ok(EnginePacket::Pong(body.to_owned())),
        '4' => Ok(EnginePacket::Message(decode_socket(body)?)),
        '5' => Ok(EnginePacket::Upgrade),
        '6' => Ok(EnginePacket::Noop),
        other => Err(ProtocolError::UnknownType {
            layer: "engine",
            kind: other,
        }),
    }
}

/// Parses the Socket.IO part of an Engine.IO message.
fn decode_socket(text: &str) -> Result<SocketPacket, ProtocolError> {
    let (kind, rest) = split_type(text)?;

    match kind {
        '0'..='4' => {}
        '5' | '6' => return Err(ProtocolError::Unsupported("binary packet")),
        other => {
            return Err(ProtocolError::UnknownType {
                layer: "socket",
                kind: other,
            });
        }
    }

    let rest = skip_namespace(rest);
    let (ack, body) = split_ack(rest);

    match kind {
        '0' => Ok(SocketPacket::Connect),
        '1' => Ok(SocketPacket::Disconnect),
        '2' => {
            let (name, args) = split_event(serde_json::from_str(body)?)?;
            Ok(SocketPacket::Event { ack, name, args })
        }
        '3' => {
            let id = ack.ok_or_else(|| {
                ProtocolError::InvalidPacket("ack without id".into())
            })?;
            let args = match serde_json::from_str(body)? {
                Value::Array(args) => args,
                _ => {
                    return Err(ProtocolError::InvalidPacket(
                        "ack payload is not an array".into(),
                    ));
                }
            };
            Ok(SocketPacket::Ack { id, args })
        }
        _ => {
            // The error payload is usually a JSON string; fall back to the
            // raw text when it is something else.
            let message = match serde_json::from_str::<Value>(body) {
                Ok(Value::String(s)) => s,
                _ => body.to_owned(),
            };
            Ok(SocketPacket::Error(message))
        }
    }
}

/// Splits the leading type digit from the rest of the frame.
fn split_type(text: &str) -> Result<(char, &str), ProtocolError> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or(ProtocolError::Empty)?;
    Ok((kind, chars.as_str()))
}

/// Drops a `/namespace,` prefix if present.
fn skip_namespace(rest: &str) -> &str {
    if !rest.starts_with('/') {
        return rest;
    }
    match rest.find(',') {
        Some(i) => &rest[i + 1..],
        None => "",
    }
}

/// Splits a leading decimal ack id from the JSON body.
fn split_ack(rest: &str) -> (Option<u64>, &str) {
    let digits = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits == 0 {
        return (None, rest);
    }
    (rest[..digits].parse().ok(), &rest[digits..])
}

/// Splits an event array `[name, ...args]` into its name and arguments.
fn split_event(value: Value) -> Result<(String, Vec<Value>), ProtocolError> {
    let Value::Array(mut items) = value else {
        return Err(ProtocolError::InvalidPacket(
            "event payload is not an array".into(),
        ));
    };
    if items.is_empty() {
        return Err(ProtocolError::InvalidPacket("event without a name".into()));
    }
    match items.remove(0) {
        Value::String(name) => Ok((name, items)),
        _ => Err(ProtocolError::InvalidPacket(
            "event name is not a string".into(),
        )),
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Renders an [`EnginePacket`] as a text frame.
///
/// # Errors
/// Returns [`ProtocolError::Json`] if the open handshake cannot be
/// serialized.
pub fn encode(packet: &EnginePacket) -> Result<String, ProtocolError> {
    let frame = match packet {
        EnginePacket::Open(info) => format!("0{}", serde_json::to_string(info)?),
        EnginePacket::Close => "1".to_owned(),
        EnginePacket::Ping(probe) => format!("2{probe}"),
        EnginePacket::Pong(probe) => format!("3{probe}"),
        EnginePacket::Message(socket) => format!("4{}", encode_socket(socket)),
        EnginePacket::Upgrade => "5".to_owned(),
        EnginePacket::Noop => "6".to_owned(),
    };
    Ok(frame)
}

/// Renders an outbound chat event: `42["name",arg1,arg2,...]`.
pub fn encode_event(name: &str, args: Vec<Value>) -> String {
    format!("4{}", encode_socket_event(None, name, args))
}

fn encode_socket(packet: &SocketPacket) -> String {
    match packet {
        SocketPacket::Connect => "0".to_owned(),
        SocketPacket::Disconnect => "1".to_owned(),
        SocketPacket::Event { ack, name, args } => {
            encode_socket_event(*ack, name, args.clone())
        }
        SocketPacket::Ack { id, args } => {
            format!("3{id}{}", Value::Array(args.clone()))
        }
        SocketPacket::Error(message) => {
            format!("4{}", Value::String(message.clone()))
        }
    }
}

fn encode_socket_event(ack: Option<u64>, name: &str, args: Vec<Value>) -> String {
    let mut items = Vec::with_capacity(args.len() + 1);
    items.push(Value::String(name.to_owned()));
    items.extend(args);

    let array = Value::Array(items);
    match ack {
        Some(id) => format!("2{id}{array}"),
        None => format!("2{array}"),
    }
}

// =========================================================================
// Tests
// =========================================================================
