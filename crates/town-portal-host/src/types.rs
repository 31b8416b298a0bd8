//! Value types shared between the host and the portal engine.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Dimension
// ---------------------------------------------------------------------------

/// A world region that portals can live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Overworld,
    Nether,
    TheEnd,
}

impl Dimension {
    /// All dimensions, in id order.
    pub const ALL: [Dimension; 3] = [Dimension::Overworld, Dimension::Nether, Dimension::TheEnd];

    /// Numeric dimension id (0 = overworld, 1 = nether, 2 = end).
    pub fn id(self) -> i32 {
        match self {
            Dimension::Overworld => 0,
            Dimension::Nether => 1,
            Dimension::TheEnd => 2,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            0 => Some(Dimension::Overworld),
            1 => Some(Dimension::Nether),
            2 => Some(Dimension::TheEnd),
            _ => None,
        }
    }

    /// Parse a dimension name as used in commands (`overworld`, `nether`, `the_end`).
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim_start_matches("minecraft:") {
            "overworld" | "0" => Some(Dimension::Overworld),
            "nether" | "1" => Some(Dimension::Nether),
            "the_end" | "end" | "2" => Some(Dimension::TheEnd),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Dimension::Overworld => "overworld",
            Dimension::Nether => "nether",
            Dimension::TheEnd => "the_end",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Vec3 (f32 x, y, z)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        (*self - *other).length()
    }

    pub fn distance_sq(&self, other: &Vec3) -> f32 {
        let d = *self - *other;
        d.x * d.x + d.y * d.y + d.z * d.z
    }
}

impl Add for Vec3 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// BlockPos / ChunkPos
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Convert to the chunk position that contains this block.
    pub fn chunk_pos(&self) -> ChunkPos {
        ChunkPos::new(self.x >> 4, self.z >> 4)
    }

    /// Convert a floating-point position to a block position (floor).
    pub fn from_vec3(v: &Vec3) -> Self {
        Self {
            x: v.x.floor() as i32,
            y: v.y.floor() as i32,
            z: v.z.floor() as i32,
        }
    }

    pub fn offset(&self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// Centre of the block's floor, i.e. where an entity standing in it would be.
    pub fn bottom_center(&self) -> Vec3 {
        Vec3::new(self.x as f32 + 0.5, self.y as f32, self.z as f32 + 0.5)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

// ---------------------------------------------------------------------------
// Entities and players
// ---------------------------------------------------------------------------

/// Host-assigned entity identifier. Players are entities too; their id is
/// stable for the length of their session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Players are addressed by their entity id.
pub type PlayerId = EntityId;

/// One occupant of a rideable entity's seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rider {
    pub id: EntityId,
    pub is_player: bool,
}

/// Read-only view of a non-player entity.
#[derive(Debug, Clone)]
pub struct EntityState {
    pub id: EntityId,
    pub type_id: String,
    pub dimension: Dimension,
    pub position: Vec3,
    /// Entity (usually a player) holding this entity's leash, if any.
    pub leash_holder: Option<EntityId>,
    /// Riders in seat order. Empty for non-rideable entities.
    pub riders: Vec<Rider>,
    pub tags: Vec<String>,
}

impl EntityState {
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

/// Read-only view of an online player.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub dimension: Dimension,
    pub position: Vec3,
    /// Unit look vector.
    pub view_direction: Vec3,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Stored respawn point (bed or anchor), if the player has one.
    pub spawn_point: Option<(Dimension, BlockPos)>,
    pub sneaking: bool,
    pub creative: bool,
}

// ---------------------------------------------------------------------------
// Blocks and items
// ---------------------------------------------------------------------------

/// Properties of a single block as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub type_id: String,
    pub is_air: bool,
    pub is_liquid: bool,
    /// Whether flowing water would wash this block away.
    pub breaks_in_liquid: bool,
}

impl BlockInfo {
    pub fn air() -> Self {
        Self {
            type_id: "minecraft:air".into(),
            is_air: true,
            is_liquid: false,
            breaks_in_liquid: false,
        }
    }

    pub fn solid(type_id: impl Into<String>) -> Self {
        Self {
            type_id: type_id.into(),
            is_air: false,
            is_liquid: false,
            breaks_in_liquid: false,
        }
    }

    /// Bed of any colour.
    pub fn is_bed(&self) -> bool {
        self.type_id == "minecraft:bed" || self.type_id.ends_with("_bed")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub type_id: String,
    pub amount: u32,
}

impl ItemStack {
    pub fn new(type_id: impl Into<String>, amount: u32) -> Self {
        Self {
            type_id: type_id.into(),
            amount,
        }
    }
}

/// Options for [`crate::WorldHost::teleport`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeleportOptions {
    pub dimension: Dimension,
    pub keep_velocity: bool,
    pub check_for_blocks: bool,
}

impl TeleportOptions {
    /// Plain relocation into `dimension`: velocity dropped, no collision check.
    pub fn into_dimension(dimension: Dimension) -> Self {
        Self {
            dimension,
            keep_velocity: false,
            check_for_blocks: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_pos_floors_negative_coordinates() {
        let pos = BlockPos::from_vec3(&Vec3::new(-0.5, 64.9, 15.99));
        assert_eq!(pos, BlockPos::new(-1, 64, 15));
        assert_eq!(pos.chunk_pos(), ChunkPos::new(-1, 0));
    }

    #[test]
    fn dimension_ids_roundtrip() {
        for dim in Dimension::ALL {
            assert_eq!(Dimension::from_id(dim.id()), Some(dim));
            assert_eq!(Dimension::parse(dim.name()), Some(dim));
        }
        assert_eq!(Dimension::parse("minecraft:nether"), Some(Dimension::Nether));
        assert_eq!(Dimension::parse("moon"), None);
    }

    #[test]
    fn bed_detection_ignores_bedrock() {
        assert!(BlockInfo::solid("minecraft:red_bed").is_bed());
        assert!(BlockInfo::solid("minecraft:bed").is_bed());
        assert!(!BlockInfo::solid("minecraft:bedrock").is_bed());
    }

    #[test]
    fn vec3_distance() {
        let a = Vec3::new(0.0, 70.0, 0.0);
        let b = Vec3::new(3.0, 74.0, 0.0);
        assert_eq!(a.distance(&b), 5.0);
        assert_eq!(a.distance_sq(&b), 25.0);
    }
}
