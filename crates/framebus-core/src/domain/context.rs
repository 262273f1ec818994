//! Addressable execution contexts.
//!
//! A *context* is anything the channel can deliver a string to and anything
//! it can name as the sender of an inbound message: a top-level window, an
//! embedded frame, a worker.  The bus never looks inside a context; it only
//! needs to clone it, compare it, and ask whether a handle *embeds* another
//! context.
//!
//! # Why "embedded"?
//!
//! A parent document usually holds a handle to the frame *element*, but
//! inbound messages name the frame's inner *window* as their sender.  A
//! source filter given as the element must still match messages sent by the
//! window inside it, so [`Context::embedded`] maps the outer handle to the
//! context it hosts.

use std::fmt::Debug;

/// A handle to an execution context the bus can address or recognise.
pub trait Context: Clone + PartialEq + Debug + Send + Sync + 'static {
    /// Returns the context hosted by this handle, if any.
    ///
    /// The default implementation returns `None`, which is correct for
    /// handles that already name the context itself.
    fn embedded(&self) -> Option<Self> {
        None
    }

    /// Returns `true` when a message sent by `sender` counts as coming from
    /// this handle: either the handle *is* the sender, or it embeds it.
    fn is_sender(&self, sender: &Self) -> bool {
        self == sender || self.embedded().as_ref() == Some(sender)
    }
}
