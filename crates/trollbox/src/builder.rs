//! `TrollboxBuilder`: configures and creates a networked chat session.
//!
//! This is the entry point for joining a live chat room. It ties together
//! the layers: transport → protocol → session.

use std::time::Duration;

use trollbox_session::{Profile, Trollbox};
use trollbox_transport::{ReconnectPolicy, SocketIoTransport, TransportConfig};

use crate::TrollboxError;

/// Builder for a [`Trollbox`] session over Socket.IO.
///
/// # Example
///
/// ```rust,no_run
/// use trollbox::prelude::*;
///
/// # async fn run() -> Result<(), TrollboxError> {
/// let trollbox = TrollboxBuilder::new()
///     .server("http://localhost:8081")
///     .nick("bob")
///     .connect()
///     .await?;
/// trollbox.send("hi")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct TrollboxBuilder {
    config: TransportConfig,
    profile: Profile,
}

impl TrollboxBuilder {
    /// Creates a builder for the default server with an anonymous profile.
    pub fn new() -> Self {
        Self {
            config: TransportConfig::default(),
            profile: Profile::default(),
        }
    }

    /// Sets the server address, e.g. `http://www.windows93.net:8081`.
    pub fn server(mut self, url: impl Into<String>) -> Self {
        self.config.server = url.into();
        self
    }

    /// Sets the profile announced on connect.
    pub fn profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets only the nick of the profile announced on connect.
    pub fn nick(mut self, nick: impl Into<String>) -> Self {
        self.profile.nick = nick.into();
        self
    }

    /// Sets the reconnect policy.
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.config.reconnect = policy;
        self
    }

    /// Sets the `User-Agent` sent with the WebSocket upgrade.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Sets how long one connection attempt may take before it fails.
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.config.handshake_timeout = timeout;
        self
    }

    /// Creates the session without touching the network.
    ///
    /// Register handlers on the result, then call
    /// [`open`](Trollbox::open) and [`connect`](Trollbox::connect).
    pub fn build(self) -> Result<Trollbox<SocketIoTransport>, TrollboxError> {
        let transport = SocketIoTransport::new(self.config)?;
        Ok(Trollbox::new(transport, self.profile))
    }

    /// Creates the session, opens the connection, and announces the
    /// profile.
    ///
    /// Events that arrive between opening and the first handler
    /// registration are not seen by any handler; use
    /// [`build`](Self::build) to register handlers first.
    pub async fn connect(self) -> Result<Trollbox<SocketIoTransport>, TrollboxError> {
        let server = self.config.server.clone();
        let mut trollbox = self.build()?;
        trollbox.open().await?;
        trollbox.connect()?;
        tracing::info!(%server, nick = %trollbox.profile(), "trollbox session ready");
        Ok(trollbox)
    }
}

impl Default for TrollboxBuilder {
    fn default() -> Self {
        Self::new()
    }
}
