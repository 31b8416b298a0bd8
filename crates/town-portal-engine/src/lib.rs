//! Town portal engine.
//!
//! Linked field/base portal pairs, safe landing search, chunk-load waiting
//! with keep-alive leases, companion carry-over and the per-tick scanner,
//! all owned by a single [`PortalService`] driven by the host's tick.

mod chunk_wait;
pub mod clock;
pub mod companions;
pub mod config;
pub mod error;
pub mod leases;
pub mod registry;
pub mod safe_location;
mod scanner;
pub mod service;
pub mod spatial;
pub mod teleport;

pub use config::PortalConfig;
pub use error::PortalError;
pub use registry::{LinkEntry, LinkId, PortalId, PortalRecord, PortalRole};
pub use service::{field_spawn_point, PortalService, VERSION};
pub use teleport::TeleportPhase;
