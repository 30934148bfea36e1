/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The configured server address cannot be turned into a WebSocket URL
    /// or a valid handshake header.
    #[error("invalid server address: {0}")]
    InvalidAddress(String),

    /// The WebSocket handshake with the server failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// The server did not open an Engine.IO session.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The server went silent for longer than its own ping interval plus
    /// ping timeout.
    #[error("no packet from server within {0:?}")]
    PingTimeout(std::time::Duration),

    /// An event was emitted while no connection is live.
    #[error("not connected")]
    NotConnected,

    /// `open` was called on a transport that was already opened.
    #[error("transport already opened")]
    AlreadyOpen,

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
