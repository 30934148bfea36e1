//! Unified error type for the Trollbox client.

use trollbox_protocol::ProtocolError;
use trollbox_session::SessionError;
use trollbox_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `trollbox` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant lets `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum TrollboxError {
    /// A transport-level error (address, connect, send).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (packet framing).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (decode, handler panic, refused emit).
    #[error(transparent)]
    Session(#[from] SessionError),
}
