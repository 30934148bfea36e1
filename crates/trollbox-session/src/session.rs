//! The chat session: one transport, one local profile, typed events.
//!
//! ```text
//!   transport ── "message" ──→ decode::message ──→ on_message handlers
//!             ── "user joined" ─→ decode::profile ─→ on_user_joined handlers
//!             ...                    │
//!                                    └─ DecodeError ─→ on_error handlers
//!
//!   connect / update_profile ──→ emit "user joined" (nick, color, style, home)
//!   send                     ──→ emit "message" (text)
//! ```

use std::sync::Arc;

use serde_json::Value;
use trollbox_protocol::events;
use trollbox_transport::EventTransport;

use crate::subscribers::Subscribers;
use crate::{decode, ChatMessage, DecodeError, Profile, SessionError};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Where the session is in its lifecycle.
///
/// ```text
///   Disconnected ──(open)──→ Connecting ──(connect)──→ Connected
///        ↑                                                  │
///        └──────────────────────(close)─────────────────────┘
/// ```
///
/// Connection health after `open` (drops, reconnects) is the transport's
/// business and is not reflected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Listeners are registered; no connection has been opened.
    Disconnected,
    /// The transport is open; presence has not been announced yet.
    Connecting,
    /// Presence has been announced.
    Connected,
}

// ---------------------------------------------------------------------------
// ProfileUpdate
// ---------------------------------------------------------------------------

/// The argument of [`Trollbox::update_profile`].
///
/// Built implicitly from a [`Profile`] (replace everything) or a string
/// (change the nick only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileUpdate {
    /// Replace the whole local profile.
    Replace(Profile),
    /// Change only the nick, keeping color, style, and home.
    Nick(String),
}

impl From<Profile> for ProfileUpdate {
    fn from(profile: Profile) -> Self {
        Self::Replace(profile)
    }
}

impl From<&str> for ProfileUpdate {
    fn from(nick: &str) -> Self {
        Self::Nick(nick.to_owned())
    }
}

impl From<String> for ProfileUpdate {
    fn from(nick: String) -> Self {
        Self::Nick(nick)
    }
}

// ---------------------------------------------------------------------------
// Trollbox
// ---------------------------------------------------------------------------

/// A session in the chat room.
///
/// Creating a session registers its transport listeners and does nothing
/// else; the network side effects happen in [`open`](Self::open) and
/// [`connect`](Self::connect). Since the listeners exist before the
/// transport is opened, no inbound event can be missed by them.
///
/// ```rust
/// use trollbox_session::{Profile, Trollbox};
/// use trollbox_transport::MemoryTransport;
///
/// let transport = MemoryTransport::new();
/// let mut trollbox = Trollbox::new(transport.clone(), Profile::new("bob"));
/// trollbox.on_message(|message| println!("{message}"));
///
/// trollbox.connect().unwrap();
/// trollbox.send("hello").unwrap();
/// assert_eq!(transport.emitted().len(), 2);
/// ```
pub struct Trollbox<T: EventTransport> {
    transport: T,
    profile: Profile,
    state: SessionState,
    subscribers: Arc<Subscribers>,
}

impl<T: EventTransport> Trollbox<T> {
    /// Creates a session over `transport` with `profile` as the local
    /// identity, and registers a listener for every inbound chat event.
    pub fn new(transport: T, profile: impl Into<Profile>) -> Self {
        let subscribers = Arc::new(Subscribers::default());

        listen(&transport, &subscribers, events::MESSAGE, |subs, args| {
            let payload = decode::argument(events::MESSAGE, args, 0)?;
            let Some(message) = decode::message(payload)? else {
                tracing::debug!("ignoring message without text or nick");
                return Ok(());
            };
            subs.notify(events::MESSAGE, &subs.message, |handler| handler(&message));
            Ok(())
        });

        listen(&transport, &subscribers, events::USER_JOINED, |subs, args| {
            let payload = decode::argument(events::USER_JOINED, args, 0)?;
            let profile = decode::profile(events::USER_JOINED, payload)?;
            subs.notify(events::USER_JOINED, &subs.user_joined, |handler| {
                handler(&profile)
            });
            Ok(())
        });

        listen(&transport, &subscribers, events::USER_LEFT, |subs, args| {
            let payload = decode::argument(events::USER_LEFT, args, 0)?;
            let profile = decode::profile(events::USER_LEFT, payload)?;
            subs.notify(events::USER_LEFT, &subs.user_left, |handler| handler(&profile));
            Ok(())
        });

        listen(&transport, &subscribers, events::USER_CHANGE_NICK, |subs, args| {
            let previous = decode::argument(events::USER_CHANGE_NICK, args, 0)?;
            let current = decode::argument(events::USER_CHANGE_NICK, args, 1)?;
            let (previous, current) = decode::nick_change(previous, current)?;
            subs.notify(events::USER_CHANGE_NICK, &subs.user_changed_nick, |handler| {
                handler(&previous, &current)
            });
            Ok(())
        });

        listen(&transport, &subscribers, events::UPDATE_USERS, |subs, args| {
            let payload = decode::argument(events::UPDATE_USERS, args, 0)?;
            let users = decode::user_list(payload)?;
            subs.notify(events::UPDATE_USERS, &subs.users_updated, |handler| {
                handler(&users)
            });
            Ok(())
        });

        Self {
            transport,
            profile: profile.into(),
            state: SessionState::Disconnected,
            subscribers,
        }
    }

    // -- Lifecycle --

    /// Opens the transport. Inbound events start flowing after this.
    pub async fn open(&mut self) -> Result<(), SessionError> {
        self.transport.open().await?;
        self.state = SessionState::Connecting;
        tracing::debug!("transport opened");
        Ok(())
    }

    /// Announces the local profile to the room (`user joined`).
    pub fn connect(&mut self) -> Result<(), SessionError> {
        announce(&self.transport, &self.profile)?;
        self.state = SessionState::Connected;
        tracing::info!(nick = %self.profile, "joined trollbox");
        Ok(())
    }

    /// Closes the transport. Registered handlers stay registered.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        self.transport.close().await?;
        self.state = SessionState::Disconnected;
        tracing::info!(nick = %self.profile, "left trollbox");
        Ok(())
    }

    // -- Outbound --

    /// Changes the local profile and re-announces presence.
    ///
    /// A [`Profile`] replaces the whole local profile; a string changes only
    /// the nick. The local profile is updated even if the announcement
    /// fails, so a later [`connect`](Self::connect) announces it.
    pub fn update_profile(&mut self, update: impl Into<ProfileUpdate>) -> Result<(), SessionError> {
        match update.into() {
            ProfileUpdate::Replace(profile) => self.profile = profile,
            ProfileUpdate::Nick(nick) => self.profile.nick = nick,
        }
        announce(&self.transport, &self.profile)
    }

    /// Sends a chat line. Accepts text or a [`ChatMessage`] (its content is
    /// sent; timestamp and author are not part of the wire format).
    pub fn send(&self, message: impl AsRef<str>) -> Result<(), SessionError> {
        self.transport
            .emit(events::MESSAGE, vec![Value::from(message.as_ref())])?;
        Ok(())
    }

    // -- Subscriptions --

    /// Adds a handler for chat lines.
    pub fn on_message(&self, handler: impl Fn(&ChatMessage) + Send + Sync + 'static) {
        self.subscribers.message.push(Arc::new(handler));
    }

    /// Adds a handler for users entering the room.
    pub fn on_user_joined(&self, handler: impl Fn(&Profile) + Send + Sync + 'static) {
        self.subscribers.user_joined.push(Arc::new(handler));
    }

    /// Adds a handler for users leaving the room.
    pub fn on_user_left(&self, handler: impl Fn(&Profile) + Send + Sync + 'static) {
        self.subscribers.user_left.push(Arc::new(handler));
    }

    /// Adds a handler for nick changes, called with (previous, current).
    pub fn on_user_changed_nick(
        &self,
        handler: impl Fn(&Profile, &Profile) + Send + Sync + 'static,
    ) {
        self.subscribers.user_changed_nick.push(Arc::new(handler));
    }

    /// Adds a handler for the full user list broadcast.
    pub fn on_users_updated(&self, handler: impl Fn(&[Profile]) + Send + Sync + 'static) {
        self.subscribers.users_updated.push(Arc::new(handler));
    }

    /// Adds a handler for inbound failures. With no error handler
    /// registered, failures are logged with `tracing::error!`.
    pub fn on_error(&self, handler: impl Fn(&SessionError) + Send + Sync + 'static) {
        self.subscribers.error.push(Arc::new(handler));
    }

    // -- Accessors --

    /// The local profile.
    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// The lifecycle state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Registers a transport listener that runs `dispatch` and routes decode
/// failures to the error handlers.
fn listen<T, F>(transport: &T, subscribers: &Arc<Subscribers>, event: &'static str, dispatch: F)
where
    T: EventTransport,
    F: Fn(&Subscribers, &[Value]) -> Result<(), DecodeError> + Send + Sync + 'static,
{
    let subscribers = Arc::clone(subscribers);
    transport.on(
        event,
        Arc::new(move |args: &[Value]| {
            if let Err(e) = dispatch(&subscribers, args) {
                tracing::debug!(%event, error = %e, "failed to decode event");
                subscribers.report(SessionError::Decode(e));
            }
        }),
    );
}

/// Emits the presence event for `profile`.
fn announce<T: EventTransport>(transport: &T, profile: &Profile) -> Result<(), SessionError> {
    transport.emit(
        events::USER_JOINED,
        vec![
            Value::from(profile.nick.as_str()),
            Value::from(profile.color.as_str()),
            Value::from(profile.style.as_str()),
            Value::from(profile.home.as_str()),
        ],
    )?;
    Ok(())
}
