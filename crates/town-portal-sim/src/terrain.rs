//! Procedural terrain for the simulated world.
//!
//! Each column is:
//! - below `height - 1`: stone
//! - `height - 1`: surface block (grass, netherrack or end stone)
//! - `height` and above: air
//!
//! `height` is the dimension's base height plus a seeded per-column bump of
//! `0..=roughness` blocks.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use town_portal_host::{BlockInfo, Dimension};

/// Terrain and streaming settings (the `[world]` section of `server.toml`).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    pub seed: u64,
    /// Surface height of the overworld; nether and end are offset from it.
    pub ground_height: i32,
    /// Maximum per-column bump in blocks. 0 = perfectly flat.
    pub roughness: u32,
    /// Ticks between a chunk being requested and it becoming queryable.
    pub stream_delay_ticks: u64,
    /// Chunk radius kept loaded around each player.
    pub view_distance: i32,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            seed: 0,
            ground_height: 64,
            roughness: 0,
            stream_delay_ticks: 20,
            view_distance: 2,
        }
    }
}

pub struct Terrain {
    seed: u64,
    ground_height: i32,
    roughness: u32,
}

impl Terrain {
    pub fn new(settings: &SimSettings) -> Self {
        Self {
            seed: settings.seed,
            ground_height: settings.ground_height,
            roughness: settings.roughness,
        }
    }

    /// Y of the first air block of a column.
    pub fn height(&self, dimension: Dimension, x: i32, z: i32) -> i32 {
        let base = match dimension {
            Dimension::Overworld => self.ground_height,
            Dimension::Nether => self.ground_height - 32,
            Dimension::TheEnd => self.ground_height - 16,
        };
        if self.roughness == 0 {
            return base;
        }
        let column_seed = self.seed
            ^ (x as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
            ^ (z as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F)
            ^ dimension.id() as u64;
        let mut rng = StdRng::seed_from_u64(column_seed);
        base + rng.gen_range(0..=self.roughness) as i32
    }

    /// Generated block type at a position (before any overrides).
    pub fn block_type(&self, dimension: Dimension, x: i32, y: i32, z: i32) -> &'static str {
        let height = self.height(dimension, x, z);
        if y >= height {
            "minecraft:air"
        } else if y == height - 1 {
            match dimension {
                Dimension::Overworld => "minecraft:grass_block",
                Dimension::Nether => "minecraft:netherrack",
                Dimension::TheEnd => "minecraft:end_stone",
            }
        } else {
            "minecraft:stone"
        }
    }
}

/// Describe a block type the way a Bedrock host would.
pub fn block_info(type_id: &str) -> BlockInfo {
    let name = type_id.trim_start_matches("minecraft:");
    let is_air = matches!(name, "air" | "cave_air" | "void_air");
    let is_liquid = matches!(name, "water" | "flowing_water" | "lava" | "flowing_lava");
    let breaks_in_liquid = !is_air
        && !is_liquid
        && (name.contains("torch")
            || name.contains("flower")
            || name.contains("sapling")
            || name.contains("rail")
            || name.contains("button")
            || name.ends_with("carpet")
            || matches!(
                name,
                "tallgrass"
                    | "short_grass"
                    | "fern"
                    | "deadbush"
                    | "redstone_wire"
                    | "repeater"
                    | "comparator"
                    | "lever"
                    | "tripwire"
                    | "vine"
                    | "snow_layer"
                    | "wheat"
            ));
    BlockInfo {
        type_id: type_id.to_string(),
        is_air,
        is_liquid,
        breaks_in_liquid,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_column_layout() {
        let terrain = Terrain::new(&SimSettings::default());
        assert_eq!(terrain.height(Dimension::Overworld, 5, -7), 64);
        assert_eq!(
            terrain.block_type(Dimension::Overworld, 0, 63, 0),
            "minecraft:grass_block"
        );
        assert_eq!(terrain.block_type(Dimension::Overworld, 0, 62, 0), "minecraft:stone");
        assert_eq!(terrain.block_type(Dimension::Overworld, 0, 64, 0), "minecraft:air");
        assert_eq!(
            terrain.block_type(Dimension::Nether, 0, 31, 0),
            "minecraft:netherrack"
        );
    }

    #[test]
    fn rough_terrain_is_deterministic_and_bounded() {
        let settings = SimSettings {
            seed: 42,
            roughness: 3,
            ..SimSettings::default()
        };
        let a = Terrain::new(&settings);
        let b = Terrain::new(&settings);
        for x in -8..8 {
            for z in -8..8 {
                let h = a.height(Dimension::Overworld, x, z);
                assert_eq!(h, b.height(Dimension::Overworld, x, z));
                assert!((64..=67).contains(&h));
            }
        }
    }

    #[test]
    fn block_classification() {
        assert!(block_info("minecraft:air").is_air);
        assert!(block_info("minecraft:water").is_liquid);
        assert!(block_info("minecraft:torch").breaks_in_liquid);
        assert!(block_info("minecraft:red_flower").breaks_in_liquid);
        let stone = block_info("minecraft:stone");
        assert!(!stone.is_air && !stone.is_liquid && !stone.breaks_in_liquid);
    }
}
