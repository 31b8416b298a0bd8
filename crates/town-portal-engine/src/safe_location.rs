//! Safe landing spot search.
//!
//! Looks for the nearest two-block air pocket with ground under it, trying
//! vertical offsets 0, +1, -1, +2, -2 and, at each, Chebyshev rings of
//! growing radius around the origin. A bed or respawn anchor close to the
//! origin takes over as the search centre.

use town_portal_host::{BlockPos, Dimension, Vec3, WorldHost};

use crate::spatial::Spatial;

const RESPAWN_ANCHOR: &str = "minecraft:respawn_anchor";
const VERTICAL_OFFSETS: [i32; 5] = [0, 1, -1, 2, -2];

/// Find a standable position near `origin`. Never fails: when nothing
/// qualifies the (possibly re-centred) origin comes back unchanged.
pub fn find_safe_location<H: WorldHost>(
    spatial: &Spatial<'_, H>,
    dimension: Dimension,
    origin: Vec3,
    search_radius: i32,
    bed_radius: i32,
) -> Vec3 {
    let center = recenter_on_bed(spatial, dimension, origin, bed_radius).unwrap_or(origin);
    let base = BlockPos::from_vec3(&center);

    for dy in VERTICAL_OFFSETS {
        let ty = base.y + dy;
        for r in 0..=search_radius {
            for (dx, dz) in ring(r) {
                let cell = BlockPos::new(base.x + dx, ty, base.z + dz);
                if let Some(spot) = standable_spot(spatial, dimension, cell) {
                    return spot;
                }
            }
        }
    }
    center
}

/// Offsets of the Chebyshev ring at radius `r`: top and bottom edges left to
/// right, then the left and right edges without their corners.
pub(crate) fn ring(r: i32) -> Vec<(i32, i32)> {
    if r == 0 {
        return vec![(0, 0)];
    }
    let mut cells = Vec::with_capacity((8 * r) as usize);
    for i in -r..=r {
        cells.push((i, -r));
        cells.push((i, r));
    }
    for i in (-r + 1)..r {
        cells.push((-r, i));
        cells.push((r, i));
    }
    cells
}

fn recenter_on_bed<H: WorldHost>(
    spatial: &Spatial<'_, H>,
    dimension: Dimension,
    origin: Vec3,
    radius: i32,
) -> Option<Vec3> {
    let base = BlockPos::from_vec3(&origin);
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            for dz in -radius..=radius {
                let pos = base.offset(dx, dy, dz);
                let Some(block) = spatial.block(dimension, pos) else {
                    continue;
                };
                if block.is_bed() || block.type_id == RESPAWN_ANCHOR {
                    return Some(pos.bottom_center());
                }
            }
        }
    }
    None
}

fn standable_spot<H: WorldHost>(
    spatial: &Spatial<'_, H>,
    dimension: Dimension,
    cell: BlockPos,
) -> Option<Vec3> {
    if !spatial.is_air(dimension, cell) || !spatial.is_air(dimension, cell.offset(0, 1, 0)) {
        return None;
    }
    if spatial.is_standable_at(dimension, cell.offset(0, -1, 0)) {
        return Some(cell.bottom_center());
    }
    if spatial.is_standable_at(dimension, cell.offset(0, -2, 0)) {
        return Some(cell.offset(0, -1, 0).bottom_center());
    }
    None
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use town_portal_sim::{SimSettings, SimWorld};

    use super::*;

    fn loaded_world() -> SimWorld {
        let world = SimWorld::new(SimSettings::default());
        world.pin_area(Dimension::Overworld, BlockPos::new(0, 64, 0), 2);
        world
    }

    fn search(world: &SimWorld, origin: Vec3) -> Vec3 {
        let deny: HashSet<String> = crate::config::PortalConfig::default()
            .non_solid_blocks
            .into_iter()
            .collect();
        let spatial = Spatial::new(world, &deny);
        find_safe_location(&spatial, Dimension::Overworld, origin, 5, 3)
    }

    #[test]
    fn ring_shapes() {
        assert_eq!(ring(0), vec![(0, 0)]);
        let r1 = ring(1);
        assert_eq!(r1.len(), 8);
        assert_eq!(&r1[..2], &[(-1, -1), (-1, 1)]);
        let r3: HashSet<_> = ring(3).into_iter().collect();
        assert_eq!(r3.len(), 24);
        assert!(r3.iter().all(|(x, z)| x.abs().max(z.abs()) == 3));
    }

    #[test]
    fn flat_ground_keeps_column() {
        let world = loaded_world();
        // Surface at y = 64 (grass at 63).
        assert_eq!(
            search(&world, Vec3::new(3.2, 64.0, -1.7)),
            Vec3::new(3.5, 64.0, -1.5)
        );
    }

    #[test]
    fn origin_one_above_ground_drops_a_block() {
        let world = loaded_world();
        // Cell 65 has air below; the two-below fallback lands on 64.
        assert_eq!(
            search(&world, Vec3::new(0.5, 65.0, 0.5)),
            Vec3::new(0.5, 64.0, 0.5)
        );
    }

    #[test]
    fn buried_origin_moves_up() {
        let world = loaded_world();
        // Origin inside stone: the +1 offset is still stone (63 grass), +2 = 64 air.
        assert_eq!(
            search(&world, Vec3::new(0.5, 62.0, 0.5)),
            Vec3::new(0.5, 64.0, 0.5)
        );
    }

    #[test]
    fn obstruction_shifts_to_ring() {
        let world = loaded_world();
        world.set_block(Dimension::Overworld, BlockPos::new(0, 65, 0), "minecraft:stone");
        // The centre column is blocked at head height; y=64 is air but needs 65 air too.
        let spot = search(&world, Vec3::new(0.5, 64.0, 0.5));
        assert_eq!(spot, Vec3::new(-0.5, 64.0, -0.5));
    }

    #[test]
    fn deny_listed_ground_is_skipped() {
        let world = loaded_world();
        world.set_block(Dimension::Overworld, BlockPos::new(0, 63, 0), "minecraft:rail");
        let spot = search(&world, Vec3::new(0.5, 64.0, 0.5));
        // Rail is not ground, so the centre column falls back to standing
        // in the rail cell on the stone under it.
        assert_eq!(spot, Vec3::new(0.5, 63.0, 0.5));
    }

    #[test]
    fn bed_recenters_search() {
        let world = loaded_world();
        world.set_block(Dimension::Overworld, BlockPos::new(2, 64, 1), "minecraft:red_bed");
        let spot = search(&world, Vec3::new(0.5, 64.0, 0.5));
        // The bed cell is occupied; the first ring cell around it is free.
        assert_eq!(spot, Vec3::new(1.5, 64.0, 0.5));
    }

    #[test]
    fn nothing_found_returns_origin() {
        let world = SimWorld::new(SimSettings::default());
        // Nothing is loaded, so no block answers.
        let origin = Vec3::new(100.25, 80.0, 100.75);
        assert_eq!(search(&world, origin), origin);
    }

    #[test]
    fn result_stays_in_bounds() {
        let world = SimWorld::new(SimSettings {
            seed: 7,
            roughness: 2,
            ..SimSettings::default()
        });
        world.pin_area(Dimension::Overworld, BlockPos::new(0, 64, 0), 2);
        for (x, y, z) in [(0.5, 64.0, 0.5), (7.2, 66.0, -3.3), (-4.0, 62.0, 9.9)] {
            let origin = Vec3::new(x, y, z);
            let spot = search(&world, origin);
            if spot == origin {
                continue;
            }
            let base = BlockPos::from_vec3(&origin);
            let cell = BlockPos::from_vec3(&spot);
            assert!((cell.x - base.x).abs() <= 5 && (cell.z - base.z).abs() <= 5);
            assert!((cell.y - base.y) >= -3 && (cell.y - base.y) <= 2);
            assert_eq!(world.block_type(Dimension::Overworld, cell), "minecraft:air");
            assert_eq!(
                world.block_type(Dimension::Overworld, cell.offset(0, 1, 0)),
                "minecraft:air"
            );
            assert_ne!(
                world.block_type(Dimension::Overworld, cell.offset(0, -1, 0)),
                "minecraft:air"
            );
        }
    }
}
