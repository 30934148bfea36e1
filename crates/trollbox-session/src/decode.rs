//! Inbound payload decoding: raw event arguments → entities.
//!
//! The server HTML-escapes user-supplied display text before broadcasting
//! it. Decoding reverses that for `nick`, `color`, `style`, and message
//! text. `home` is an identifier, not display text, and is passed through
//! untouched.
//!
//! Every function here is pure and total over its input: a payload either
//! becomes entities or a [`DecodeError`], never a panic.

use html_escape::decode_html_entities;
use serde_json::{Map, Value};
use trollbox_protocol::events;

use crate::{ChatMessage, DecodeError, Profile};

static NULL: Value = Value::Null;

/// Positional argument `index` of `event`.
pub fn argument<'a>(
    event: &'static str,
    args: &'a [Value],
    index: usize,
) -> Result<&'a Value, DecodeError> {
    args.get(index)
        .ok_or(DecodeError::MissingArgument { event, index })
}

/// A single user record, as sent with `user joined` and `user left`.
pub fn profile(event: &'static str, value: &Value) -> Result<Profile, DecodeError> {
    let record = record(event, value)?;
    Ok(profile_from(record, field(record, "home")))
}

/// A `message` payload.
///
/// Returns `Ok(None)` for a record without a string `msg` or `nick`: such
/// lines are not chat and are dropped without reporting an error.
pub fn message(value: &Value) -> Result<Option<ChatMessage>, DecodeError> {
    let record = record(events::MESSAGE, value)?;
    if !field(record, "msg").is_string() || !field(record, "nick").is_string() {
        return Ok(None);
    }

    let author = profile_from(record, field(record, "home"));
    Ok(Some(ChatMessage::from_fields(
        &unescape(field(record, "msg")),
        field(record, "date"),
        Some(author),
    )))
}

/// A `user change nick` payload: previous and current identity.
///
/// Both profiles take `home` from the *current* record; the previous
/// record's `home` is ignored. Existing consumers of this event depend on
/// that, so it stays even though it looks asymmetric.
pub fn nick_change(previous: &Value, current: &Value) -> Result<(Profile, Profile), DecodeError> {
    let event = events::USER_CHANGE_NICK;
    let previous = record(event, previous)?;
    let current = record(event, current)?;
    let home = field(current, "home");

    Ok((profile_from(previous, home), profile_from(current, home)))
}

/// An `update users` payload: a mapping of opaque keys to user records.
///
/// Keys are discarded; profiles come back in the order the server sent
/// them.
pub fn user_list(value: &Value) -> Result<Vec<Profile>, DecodeError> {
    let event = events::UPDATE_USERS;
    record(event, value)?
        .values()
        .map(|entry| profile(event, entry))
        .collect()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn record<'a>(
    event: &'static str,
    value: &'a Value,
) -> Result<&'a Map<String, Value>, DecodeError> {
    value.as_object().ok_or(DecodeError::NotARecord {
        event,
        found: kind_of(value),
    })
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn field<'a>(record: &'a Map<String, Value>, key: &str) -> &'a Value {
    record.get(key).unwrap_or(&NULL)
}

/// HTML-unescapes strings; leaves other values for the entity constructors
/// to default.
///
/// Only `;`-terminated references to valid code points are decoded. Legacy
/// forms such as `&amp` and invalid numeric references such as `&#0;` are
/// kept verbatim rather than guessed at.
fn unescape(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(decode_html_entities(s).into_owned()),
        other => other.clone(),
    }
}

fn profile_from(record: &Map<String, Value>, home: &Value) -> Profile {
    Profile::from_fields(
        &unescape(field(record, "nick")),
        &unescape(field(record, "color")),
        &unescape(field(record, "style")),
        home,
    )
}
