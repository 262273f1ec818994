//! The handle returned by `receive` / `receive_once`.
//!
//! A [`Subscription`] owns exactly one listener registration on the local
//! event sink.  Calling [`Subscription::off`] removes that registration and
//! nothing else; calling it again is a no-op.  `off` is safe to call from
//! inside the very callback it guards, which is how `receive_once`
//! deregisters itself.
//!
//! Dropping a `Subscription` does **not** deregister the listener.  Callers
//! that never need to cancel can simply ignore the handle.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::application::ports::EventSink;
use crate::domain::context::Context;
use crate::protocol::sequence::ListenerId;

/// Cancellation handle for one local listener.
pub struct Subscription<C: Context> {
    sink: Arc<dyn EventSink<C>>,
    name: String,
    id: ListenerId,
    /// Shared with the wrapped listener, which checks it before every call so
    /// that an event already in flight is not delivered after `off()`.
    active: Arc<AtomicBool>,
}

impl<C: Context> Subscription<C> {
    pub(crate) fn new(
        sink: Arc<dyn EventSink<C>>,
        name: String,
        id: ListenerId,
        active: Arc<AtomicBool>,
    ) -> Self {
        Self {
            sink,
            name,
            id,
            active,
        }
    }

    /// Deregisters this listener.  Idempotent.
    pub fn off(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            self.sink.unsubscribe(&self.name, self.id);
        }
    }

    /// `true` until [`off`](Self::off) has been called.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// The namespace-qualified event name this listener is registered for.
    pub fn event_name(&self) -> &str {
        &self.name
    }

    /// The sink-side registration id.
    pub fn id(&self) -> ListenerId {
        self.id
    }
}

impl<C: Context> Clone for Subscription<C> {
    fn clone(&self) -> Self {
        Self {
            sink: Arc::clone(&self.sink),
            name: self.name.clone(),
            id: self.id,
            active: Arc::clone(&self.active),
        }
    }
}

impl<C: Context> fmt::Debug for Subscription<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
