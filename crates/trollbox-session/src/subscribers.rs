//! Per-event handler lists.
//!
//! Each event kind keeps an ordered list of handlers; every registered
//! handler runs for every event, in registration order. A panicking handler
//! is caught and reported as [`SessionError::HandlerPanicked`] so one bad
//! handler never takes down the transport task or starves the handlers
//! after it.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{ChatMessage, Profile, SessionError};

pub(crate) type MessageHandler = dyn Fn(&ChatMessage) + Send + Sync;
pub(crate) type ProfileHandler = dyn Fn(&Profile) + Send + Sync;
pub(crate) type NickChangeHandler = dyn Fn(&Profile, &Profile) + Send + Sync;
pub(crate) type UserListHandler = dyn Fn(&[Profile]) + Send + Sync;
pub(crate) type ErrorHandler = dyn Fn(&SessionError) + Send + Sync;

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// The handlers for one event kind.
pub(crate) struct Slot<F: ?Sized> {
    handlers: Mutex<Vec<Arc<F>>>,
}

impl<F: ?Sized> Default for Slot<F> {
    fn default() -> Self {
        Self {
            handlers: Mutex::new(Vec::new()),
        }
    }
}

impl<F: ?Sized> Slot<F> {
    pub(crate) fn push(&self, handler: Arc<F>) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// A copy of the list, so handlers run without the lock held and may
    /// register more handlers.
    pub(crate) fn snapshot(&self) -> Vec<Arc<F>> {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

// ---------------------------------------------------------------------------
// Subscribers
// ---------------------------------------------------------------------------

#[derive(Default)]
pub(crate) struct Subscribers {
    pub(crate) message: Slot<MessageHandler>,
    pub(crate) user_joined: Slot<ProfileHandler>,
    pub(crate) user_left: Slot<ProfileHandler>,
    pub(crate) user_changed_nick: Slot<NickChangeHandler>,
    pub(crate) users_updated: Slot<UserListHandler>,
    pub(crate) error: Slot<ErrorHandler>,
}

impl Subscribers {
    /// Runs every handler of `slot` through `call`. Panics are reported to
    /// the error handlers and do not stop the remaining handlers.
    pub(crate) fn notify<F: ?Sized>(
        &self,
        event: &'static str,
        slot: &Slot<F>,
        call: impl Fn(&F),
    ) {
        for handler in slot.snapshot() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| call(&*handler))) {
                self.report(SessionError::HandlerPanicked {
                    event,
                    message: panic_message(payload.as_ref()),
                });
            }
        }
    }

    /// Delivers an error to the error handlers, or logs it when there are
    /// none.
    pub(crate) fn report(&self, error: SessionError) {
        let handlers = self.error.snapshot();
        if handlers.is_empty() {
            tracing::error!(error = %error, "trollbox event failed");
            return;
        }
        for handler in handlers {
            if panic::catch_unwind(AssertUnwindSafe(|| handler(&error))).is_err() {
                tracing::error!(error = %error, "error handler panicked");
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
