//! Chat entities: who is talking ([`Profile`]) and what they said
//! ([`ChatMessage`]).
//!
//! Both types have total smart constructors over loosely typed JSON
//! (`from_fields`). Whatever the server sends, the result is a fully valid
//! value: wrong-typed or missing fields fall back to their defaults instead
//! of producing an error or a half-built object.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A chat participant's identity and presentation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Profile {
    /// Display name. `"anonymous"` when none was given.
    pub nick: String,
    /// CSS color of the nick. Empty when unset.
    pub color: String,
    /// Extra CSS style of the nick. Empty when unset.
    pub style: String,
    /// Opaque identifier of the user's origin. Not display text.
    pub home: String,
}

impl Profile {
    /// Nick used when none (or a non-string) is supplied.
    pub const ANONYMOUS: &'static str = "anonymous";

    /// A profile with the given nick and empty color, style, and home.
    pub fn new(nick: impl Into<String>) -> Self {
        Self {
            nick: nick.into(),
            ..Self::default()
        }
    }

    /// Sets the nick color.
    #[must_use]
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Sets the nick style.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    /// Sets the home identifier.
    #[must_use]
    pub fn with_home(mut self, home: impl Into<String>) -> Self {
        self.home = home.into();
        self
    }

    /// Builds a profile from untyped values. Never fails: a non-string nick
    /// becomes `"anonymous"`, any other non-string field becomes `""`.
    pub fn from_fields(nick: &Value, color: &Value, style: &Value, home: &Value) -> Self {
        Self {
            nick: string_or(nick, Self::ANONYMOUS),
            color: string_or(color, ""),
            style: string_or(style, ""),
            home: string_or(home, ""),
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            nick: Self::ANONYMOUS.to_owned(),
            color: String::new(),
            style: String::new(),
            home: String::new(),
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nick)
    }
}

impl From<&str> for Profile {
    fn from(nick: &str) -> Self {
        Self::new(nick)
    }
}

impl From<String> for Profile {
    fn from(nick: String) -> Self {
        Self::new(nick)
    }
}

fn string_or(value: &Value, default: &str) -> String {
    match value {
        Value::String(s) => s.clone(),
        _ => default.to_owned(),
    }
}

// ---------------------------------------------------------------------------
// ChatMessage
// ---------------------------------------------------------------------------

/// One line of chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// The message text.
    pub content: String,
    /// When the server stamped the message, if it sent a usable time.
    pub timestamp: Option<DateTime<Utc>>,
    /// Who sent it, if known.
    pub author: Option<Profile>,
}

impl ChatMessage {
    /// A message with the given text and no timestamp or author.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            timestamp: None,
            author: None,
        }
    }

    /// Sets the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the author.
    #[must_use]
    pub fn with_author(mut self, author: Profile) -> Self {
        self.author = Some(author);
        self
    }

    /// Builds a message from untyped values. Never fails.
    ///
    /// - `content` that is not a string becomes `""`.
    /// - `date` is kept only when it is an integral number of milliseconds
    ///   since the Unix epoch that fits a [`DateTime<Utc>`].
    pub fn from_fields(content: &Value, date: &Value, author: Option<Profile>) -> Self {
        Self {
            content: string_or(content, ""),
            timestamp: timestamp_from(date),
            author,
        }
    }
}

impl fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

impl AsRef<str> for ChatMessage {
    fn as_ref(&self) -> &str {
        &self.content
    }
}

/// Epoch milliseconds → timestamp, for integral JSON numbers only.
///
/// `1000` and `1000.0` are both integral; `1000.5`, strings, and `null` are
/// not.
fn timestamp_from(value: &Value) -> Option<DateTime<Utc>> {
    let Value::Number(number) = value else {
        return None;
    };

    let millis = if let Some(i) = number.as_i64() {
        i
    } else if let Some(f) = number.as_f64() {
        if !f.is_finite() || f.fract() != 0.0 || f.abs() > i64::MAX as f64 {
            return None;
        }
        f as i64
    } else {
        return None;
    };

    DateTime::from_timestamp_millis(millis)
}
