//! # framebus-core
//!
//! A small pub/sub layer that lets isolated execution contexts (a parent
//! document and its embedded frames, for example) exchange structured
//! messages over a single untyped, string-only, origin-tagged channel.
//!
//! # Architecture overview (for beginners)
//!
//! The host environment gives us exactly one primitive: "deliver this string
//! to that context, and tell the receiver which origin sent it".  Everything
//! else is built on top of it here:
//!
//! - **`domain`** – Pure types with no I/O: the origin allow-list, the set of
//!   registered namespaces, proxy routes, and the [`Context`] trait that
//!   describes an addressable execution context.
//!
//! - **`protocol`** – How a message looks on the wire.  Every send carries a
//!   JSON [`Envelope`] (`{"type", "data", "options"}`) serialized to a single
//!   string.
//!
//! - **`application`** – The [`MessageBus`] itself, the port traits it talks
//!   through ([`Channel`] and [`EventSink`]), and the screening pipeline that
//!   decides whether an inbound string becomes a local event.
//!
//! - **`infrastructure`** – In-process adapters for the ports (a queued
//!   frame router and a local event dispatcher) plus TOML configuration.
//!
//! ```text
//!   sender context                         receiving context
//!   ──────────────                         ─────────────────
//!   bus.send(target, "init.dfp", data)
//!        │  Envelope → JSON string
//!        ▼
//!   Channel::post ──────────────────────►  inbound handler
//!                                            1. origin allowed?
//!                                            2. valid envelope?
//!                                            3. namespace registered?
//!                                            4. proxy to routes
//!                                            5. EventSink::dispatch("init.dfp")
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `framebus_core::MessageBus` instead of the full module path.
pub use application::bus::{BusError, MessageBus};
pub use application::ports::{
    Channel, ChannelError, EventSink, InboundHandler, InboundMessage, LocalListener, MessageEvent,
};
pub use application::screen::{Admitted, Rejection};
pub use application::subscription::Subscription;
pub use domain::config::BusConfig;
pub use domain::context::Context;
pub use domain::namespace::{qualify_type, NamespaceSet, DEFAULT_NAMESPACE};
pub use domain::origin::{OriginAllowList, NULL_ORIGIN, WILDCARD_ORIGIN};
pub use protocol::envelope::{Envelope, PostOptions};
pub use protocol::sequence::ListenerId;
