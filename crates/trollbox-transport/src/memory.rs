//! In-process transport: no network, inbound events injected by the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::{EventTransport, Listener, Listeners, TransportError};

/// One event handed to [`MemoryTransport::emit`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedEvent {
    /// Event name.
    pub name: String,
    /// Positional arguments.
    pub args: Vec<Value>,
}

#[derive(Default)]
struct Inner {
    listeners: Listeners,
    emitted: Mutex<Vec<EmittedEvent>>,
    open: AtomicBool,
}

/// An [`EventTransport`] that lives entirely in memory.
///
/// Cloning yields another handle to the same transport, so a test can give
/// one handle to the session and keep another to drive and inspect it.
///
/// ```rust
/// use trollbox_transport::{EventTransport, MemoryTransport};
///
/// let transport = MemoryTransport::new();
/// transport.emit("message", vec!["hi".into()]).unwrap();
/// assert_eq!(transport.emitted()[0].name, "message");
/// ```
#[derive(Clone, Default)]
pub struct MemoryTransport {
    inner: Arc<Inner>,
}

impl MemoryTransport {
    /// Creates a closed transport with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates the server firing `event` with `args`.
    ///
    /// Returns how many listeners ran.
    pub fn deliver(&self, event: &str, args: Vec<Value>) -> usize {
        self.inner.listeners.dispatch(event, &args)
    }

    /// Everything emitted so far, oldest first.
    pub fn emitted(&self) -> Vec<EmittedEvent> {
        self.inner
            .emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drains and returns everything emitted so far.
    pub fn take_emitted(&self) -> Vec<EmittedEvent> {
        std::mem::take(
            &mut *self
                .inner
                .emitted
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    /// Number of listeners registered for `event`.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner.listeners.count(event)
    }

    /// Whether [`EventTransport::open`] has been called (and not closed).
    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }
}

impl EventTransport for MemoryTransport {
    fn on(&self, event: &str, listener: Listener) {
        self.inner.listeners.register(event, listener);
    }

    fn emit(&self, event: &str, args: Vec<Value>) -> Result<(), TransportError> {
        self.inner
            .emitted
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EmittedEvent {
                name: event.to_owned(),
                args,
            });
        Ok(())
    }

    async fn open(&self) -> Result<(), TransportError> {
        if self.inner.open.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyOpen);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner.open.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;

    #[test]
    fn test_emit_records_in_order() {
        let transport = MemoryTransport::new();
        transport.emit("user joined", vec![json!("bob")]).unwrap();
        transport.emit("message", vec![json!("hi")]).unwrap();

        let names: Vec<_> = transport.emitted().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["user joined", "message"]);
    }

    #[test]
    fn test_take_emitted_drains() {
        let transport = MemoryTransport::new();
        transport.emit("message", vec![json!("hi")]).unwrap();
        assert_eq!(transport.take_emitted().len(), 1);
        assert!(transport.emitted().is_empty());
    }

    #[test]
    fn test_clone_shares_state() {
        let transport = MemoryTransport::new();
        let handle = transport.clone();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        transport.on(
            "user left",
            Arc::new(move |_args: &[Value]| {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
        );

        assert_eq!(handle.listener_count("user left"), 1);
        assert_eq!(handle.deliver("user left", vec![json!({})]), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_twice_is_error() {
        let transport = MemoryTransport::new();
        transport.open().await.unwrap();
        assert!(transport.is_open());
        assert!(matches!(
            transport.open().await,
            Err(TransportError::AlreadyOpen)
        ));

        transport.close().await.unwrap();
        assert!(!transport.is_open());
    }
}
