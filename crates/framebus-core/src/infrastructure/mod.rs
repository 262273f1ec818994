//! Infrastructure layer for framebus.
//!
//! In-process implementations of the application ports, plus configuration
//! file loading.
//!
//! # Responsibilities
//!
//! - Routing strings between frames with origin tagging ([`frame_hub`])
//! - Dispatching named events to local listeners ([`local_events`])
//! - Reading [`crate::domain::BusConfig`] from TOML ([`config`])
//!
//! # What does NOT belong here?
//!
//! - Screening or proxy decisions (that is the application layer)
//! - Envelope encoding (that is the protocol layer)

pub mod config;
pub mod frame_hub;
pub mod local_events;

// Re-export the adapters so tests and the CLI can write
// `infrastructure::FrameHub`.
pub use config::{load_config, load_config_or_default, parse_config, ConfigError};
pub use frame_hub::{FrameEndpoint, FrameHandle, FrameHub, FrameId};
pub use local_events::LocalEventBus;
