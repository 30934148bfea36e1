//! Error types for the session layer.

use trollbox_transport::TransportError;

/// An inbound payload whose shape cannot be turned into entities.
///
/// Wrong-typed *fields* are never an error (they fall back to defaults);
/// these cover payloads that are not even records.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The event arrived with fewer positional arguments than it needs.
    #[error("{event}: missing argument {index}")]
    MissingArgument { event: &'static str, index: usize },

    /// A user record (or the user mapping) is not a JSON object.
    #[error("{event}: expected a record, got {found}")]
    NotARecord {
        event: &'static str,
        found: &'static str,
    },
}

/// Errors reported by a [`Trollbox`](crate::Trollbox) session.
///
/// Inbound failures (`Decode`, `HandlerPanicked`) are delivered to the
/// error handlers. Outbound calls return `Transport` failures directly.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// An inbound event could not be decoded.
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// A user handler panicked while handling an event.
    #[error("handler for {event:?} panicked: {message}")]
    HandlerPanicked {
        event: &'static str,
        message: String,
    },

    /// The transport refused an operation.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
