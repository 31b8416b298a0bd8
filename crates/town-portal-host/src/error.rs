//! Faults reported by host calls.

use thiserror::Error;

use crate::types::{BlockPos, Dimension, EntityId};

#[derive(Debug, Error)]
pub enum HostError {
    #[error("chunk at {pos} in {dimension} is not loaded")]
    ChunkNotLoaded { dimension: Dimension, pos: BlockPos },

    #[error("entity {0} no longer exists")]
    EntityGone(EntityId),

    #[error("player {0} is not online")]
    PlayerOffline(EntityId),

    #[error("unknown snapshot: {0}")]
    UnknownSnapshot(String),

    #[error("host rejected the request: {0}")]
    Rejected(String),
}

impl HostError {
    /// Whether this fault means "the region is not streamed in yet".
    pub fn is_not_loaded(&self) -> bool {
        matches!(self, HostError::ChunkNotLoaded { .. })
    }
}
