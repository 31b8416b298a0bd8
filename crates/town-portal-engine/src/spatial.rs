//! Block occupancy and chunk residency queries.

use std::collections::HashSet;

use town_portal_host::{BlockInfo, BlockPos, Dimension, Vec3, WorldHost};

/// Read-only view over the host's block queries.
pub struct Spatial<'a, H: WorldHost> {
    host: &'a H,
    non_solid: &'a HashSet<String>,
}

impl<'a, H: WorldHost> Spatial<'a, H> {
    pub fn new(host: &'a H, non_solid: &'a HashSet<String>) -> Self {
        Self { host, non_solid }
    }

    /// Whether the chunk holding `coord` answers block queries.
    ///
    /// Any host fault counts as "not resident".
    pub fn is_chunk_resident(&self, dimension: Dimension, coord: Vec3) -> bool {
        self.host
            .block(dimension, BlockPos::from_vec3(&coord))
            .is_ok()
    }

    pub fn block(&self, dimension: Dimension, pos: BlockPos) -> Option<BlockInfo> {
        self.host.block(dimension, pos).ok()
    }

    pub fn is_air(&self, dimension: Dimension, pos: BlockPos) -> bool {
        self.block(dimension, pos).is_some_and(|b| b.is_air)
    }

    /// Whether a player can stand on this block.
    pub fn is_solid_standable(&self, block: &BlockInfo) -> bool {
        !block.is_air
            && !block.is_liquid
            && !block.breaks_in_liquid
            && !self.non_solid.contains(&block.type_id)
    }

    pub fn is_standable_at(&self, dimension: Dimension, pos: BlockPos) -> bool {
        self.block(dimension, pos)
            .is_some_and(|b| self.is_solid_standable(&b))
    }
}
