//! Port traits: the two host capabilities the bus depends on.
//!
//! The bus never talks to a concrete host API.  It is handed one
//! [`Channel`] (cross-context string delivery) and one [`EventSink`]
//! (in-context named events) at construction time.  Production hosts wrap
//! their own primitives; tests and the diagnostic CLI use the in-process
//! adapters in [`crate::infrastructure`].
//!
//! # Listener identity
//!
//! Closures have no identity in Rust, so both `subscribe` methods return a
//! [`ListenerId`] that the caller later passes to `unsubscribe`.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::domain::context::Context;
use crate::protocol::sequence::ListenerId;

/// Errors a channel may report when posting.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The target context is not known to the channel.
    #[error("unknown target context: {0}")]
    UnknownTarget(String),

    /// The channel has been shut down.
    #[error("channel closed")]
    Closed,
}

/// One raw inbound notification from the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage<C> {
    /// The raw string payload, exactly as posted.
    pub data: String,
    /// The sender's origin, as reported by the host (never by the sender).
    pub origin: String,
    /// The sender's context, when the host exposes one.
    pub source: Option<C>,
}

impl<C> InboundMessage<C> {
    pub fn new(data: impl Into<String>, origin: impl Into<String>, source: Option<C>) -> Self {
        Self {
            data: data.into(),
            origin: origin.into(),
            source,
        }
    }
}

/// A validated message re-emitted as a local, named event.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent<C> {
    /// Event name: the envelope's namespace-qualified type.
    pub name: String,
    /// The envelope's `data`.
    pub detail: Value,
    /// The context that sent the original message.
    pub source: Option<C>,
}

/// Callback invoked by a channel for every inbound notification.
pub type InboundHandler<C> = Arc<dyn Fn(&InboundMessage<C>) + Send + Sync>;

/// Callback invoked by an event sink for every dispatched event.
pub type LocalListener<C> = Arc<dyn Fn(&MessageEvent<C>) + Send + Sync>;

/// The host's cross-context delivery primitive.
///
/// Delivery is fire-and-forget: a successful `post` only means the host
/// accepted the string, not that anybody received it.
#[cfg_attr(test, mockall::automock)]
pub trait Channel<C: Context>: Send + Sync {
    /// Posts `payload` to `target`.  The host must drop the message unless
    /// `target_origin` is `"*"` or equals the target's origin.
    fn post(&self, target: &C, payload: &str, target_origin: &str) -> Result<(), ChannelError>;

    /// Registers a handler for inbound notifications.
    fn subscribe(&self, handler: InboundHandler<C>) -> ListenerId;

    /// Removes a handler previously returned by [`Channel::subscribe`].
    fn unsubscribe(&self, id: ListenerId);
}

/// The host's in-context event dispatch.
pub trait EventSink<C: Context>: Send + Sync {
    /// Delivers `event` synchronously to every listener of `event.name`.
    fn dispatch(&self, event: &MessageEvent<C>);

    /// Registers a listener for events named `name`.
    fn subscribe(&self, name: &str, listener: LocalListener<C>) -> ListenerId;

    /// Removes one listener.  Unknown ids are ignored.
    fn unsubscribe(&self, name: &str, id: ListenerId);
}
