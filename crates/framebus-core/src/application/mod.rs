//! Application layer for framebus.
//!
//! The application layer owns the bus behaviour: it decides *what* happens
//! to every send and every inbound string, but delegates *how* strings move
//! between contexts to the [`ports::Channel`] and [`ports::EventSink`]
//! implementations it is given.
//!
//! # Responsibilities
//!
//! - Wrapping outgoing data in an envelope and posting it
//! - Screening inbound strings (origin, envelope shape, namespace)
//! - Fanning admitted messages out to proxy targets, then dispatching locally
//! - Tracking whether the bus is attached to the channel
//!
//! # What does NOT belong here?
//!
//! - Routing strings between frames (that is infrastructure)
//! - Reading configuration files (that is infrastructure)

pub mod bus;
pub mod ports;
pub mod screen;
pub mod subscription;

// Re-export so callers can write `application::MessageBus`.
pub use bus::{BusError, MessageBus};
pub use ports::{Channel, ChannelError, EventSink, InboundMessage, MessageEvent};
pub use screen::{Admitted, Rejection, ScreenPolicy};
pub use subscription::Subscription;
