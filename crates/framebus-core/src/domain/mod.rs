//! Domain layer for framebus.
//!
//! The domain layer contains the pure policy of the bus: which origins are
//! trusted, which namespaces are routed, and where proxied messages go.  None
//! of it performs I/O or knows how the host environment delivers strings.
//!
//! # What belongs in the domain layer?
//!
//! - The [`context::Context`] trait describing an addressable execution context
//! - The origin allow-list and its compiled matcher
//! - The namespace set and its compiled suffix matcher
//! - The proxy route table
//! - The startup [`config::BusConfig`]
//!
//! # What does NOT belong here?
//!
//! - Calls into the channel or the local event sink (that is the application layer)
//! - JSON encoding (that is the protocol layer)

pub mod config;
pub mod context;
pub mod namespace;
pub mod origin;
pub mod proxy;

pub use config::BusConfig;
pub use context::Context;
pub use namespace::{qualify_type, NamespaceSet, DEFAULT_NAMESPACE};
pub use origin::{OriginAllowList, NULL_ORIGIN, WILDCARD_ORIGIN};
pub use proxy::ProxyTable;
