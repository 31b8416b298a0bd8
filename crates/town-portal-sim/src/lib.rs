//! In-memory world used by the console server and the engine tests.
//!
//! Terrain is generated on demand, chunks stream in a configurable number
//! of ticks after something starts wanting them, and every observable side
//! effect (messages, sounds, particles, teleports) is recorded.

pub mod terrain;
pub mod world;

pub use terrain::{SimSettings, Terrain};
pub use world::{SimEffect, SimWorld};
