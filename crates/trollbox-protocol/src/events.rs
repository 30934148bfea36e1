//! Chat event names, bit exact as the server emits and expects them.

/// A chat line. Inbound: `{msg, date, nick, color, style, home}`.
/// Outbound: the message text as a single string.
pub const MESSAGE: &str = "message";

/// Presence. Inbound: a user record. Outbound: nick, color, style, home as
/// four positional arguments.
pub const USER_JOINED: &str = "user joined";

/// A user record for someone who left the room.
pub const USER_LEFT: &str = "user left";

/// Two positional records: previous identity, current identity.
pub const USER_CHANGE_NICK: &str = "user change nick";

/// A mapping of opaque keys to user records.
pub const UPDATE_USERS: &str = "update users";

/// Every inbound event the client listens for.
pub const INBOUND: [&str; 5] = [MESSAGE, USER_JOINED, USER_LEFT, USER_CHANGE_NICK, UPDATE_USERS];
