//! # Trollbox
//!
//! Async client for trollbox-style chat rooms: a public chat widget served
//! over Socket.IO 2.x.
//!
//! The client joins the room under a [`Profile`](prelude::Profile), sends
//! chat lines, and delivers what happens in the room (messages, users
//! joining, leaving, and renaming, full user lists) to typed handlers.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trollbox::prelude::*;
//!
//! # async fn run() -> Result<(), TrollboxError> {
//! let mut trollbox = TrollboxBuilder::new()
//!     .profile(Profile::new("bob").with_color("#f0f"))
//!     .build()?;
//!
//! trollbox.on_message(|message| {
//!     let nick = message.author.as_ref().map_or("?", |a| a.nick.as_str());
//!     println!("<{nick}> {message}");
//! });
//!
//! trollbox.open().await?;
//! trollbox.connect()?;
//! trollbox.send("hello")?;
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;

pub use builder::TrollboxBuilder;
pub use error::TrollboxError;

/// Everything needed to run a chat client.
pub mod prelude {
    pub use crate::{TrollboxBuilder, TrollboxError};
    pub use trollbox_protocol::{events, ProtocolError};
    pub use trollbox_session::{
        ChatMessage, DecodeError, Profile, ProfileUpdate, SessionError, SessionState, Trollbox,
    };
    pub use trollbox_transport::{
        EventTransport, MemoryTransport, ReconnectPolicy, SocketIoTransport, TransportConfig,
        TransportError, DEFAULT_SERVER,
    };
}
