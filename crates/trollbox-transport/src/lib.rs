//! Transport abstraction layer for Trollbox.
//!
//! Provides the [`EventTransport`] trait: a bidirectional event channel that
//! can `emit` named events with positional JSON arguments and deliver
//! inbound named events to registered listeners.
//!
//! Two implementations ship with the crate:
//!
//! - [`SocketIoTransport`]: Socket.IO 2.x over WebSocket via
//!   `tokio-tungstenite`, with keep-alive pings and automatic reconnects.
//! - [`MemoryTransport`]: an in-process channel that records emitted
//!   events and lets the caller inject inbound ones.

#![allow(async_fn_in_trait)]

mod config;
mod error;
mod memory;
mod socketio;

pub use config::{
    ReconnectPolicy, TransportConfig, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_SERVER, USER_AGENT,
};
pub use error::TransportError;
pub use memory::{EmittedEvent, MemoryTransport};
pub use socketio::SocketIoTransport;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

/// A callback invoked with the positional arguments of an inbound event.
///
/// `Arc` rather than `Box` so the registry can hand out a snapshot of the
/// listener list and release its lock before any listener runs.
pub type Listener = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// A bidirectional named-event channel.
pub trait EventTransport: Send + Sync + 'static {
    /// Registers a listener for the named inbound event.
    ///
    /// Listeners for the same event run in registration order.
    fn on(&self, event: &str, listener: Listener);

    /// Fires an outbound event. Fire-and-forget: success means the event
    /// was handed to the connection, not that the server received it.
    fn emit(&self, event: &str, args: Vec<Value>) -> Result<(), TransportError>;

    /// Starts the connection. No inbound event is delivered before this.
    async fn open(&self) -> Result<(), TransportError>;

    /// Stops the connection and any reconnect attempts.
    async fn close(&self) -> Result<(), TransportError>;
}

// ---------------------------------------------------------------------------
// Listeners
// ---------------------------------------------------------------------------

/// Event name → ordered listener list.
///
/// Shared by every transport implementation. Dispatch iterates a snapshot,
/// so a listener may register further listeners without deadlocking.
#[derive(Default)]
pub struct Listeners {
    by_event: Mutex<HashMap<String, Vec<Listener>>>,
}

impl Listeners {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a listener for `event`.
    pub fn register(&self, event: &str, listener: Listener) {
        self.by_event
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event.to_owned())
            .or_default()
            .push(listener);
    }

    /// Invokes every listener registered for `event` and returns how many
    /// ran.
    pub fn dispatch(&self, event: &str, args: &[Value]) -> usize {
        let snapshot = self
            .by_event
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .cloned()
            .unwrap_or_default();

        if snapshot.is_empty() {
            tracing::trace!(%event, "no listener for event");
        }
        for listener in &snapshot {
            listener(args);
        }
        snapshot.len()
    }

    /// Number of listeners registered for `event`.
    pub fn count(&self, event: &str) -> usize {
        self.by_event
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event)
            .map_or(0, Vec::len)
    }
}
