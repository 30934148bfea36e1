//! Chat session layer for Trollbox.
//!
//! This crate turns the raw named events of an
//! [`EventTransport`](trollbox_transport::EventTransport) into a typed chat
//! API:
//!
//! 1. **Entities**: [`Profile`] (who) and [`ChatMessage`] (what)
//! 2. **Decoding**: untyped event payloads → entities ([`decode`])
//! 3. **Session**: [`Trollbox`], which announces presence, sends chat
//!    lines, and fans inbound events out to typed handlers
//!
//! # How it fits in the stack
//!
//! ```text
//! Application (above)  ← registers handlers, calls send / update_profile
//!     ↕
//! Session Layer (this crate)  ← entities, decoding, handler fan-out
//!     ↕
//! Transport Layer (below)  ← named events with JSON arguments
//! ```

pub mod decode;
mod entity;
mod error;
mod session;
mod subscribers;

pub use entity::{ChatMessage, Profile};
pub use error::{DecodeError, SessionError};
pub use session::{ProfileUpdate, SessionState, Trollbox};
