//! Carrying leashed and ridden creatures through a teleport.
//!
//! Capture saves each companion into its own snapshot and removes it from
//! the world; restore materializes the snapshots next to the player and
//! re-links them by the role tag each one carried when it was saved. A
//! snapshot holds every entity in its block, so anything that comes back
//! without a role tag is a stray copy and gets removed.
//!
//! Every host call here is best-effort: a failure skips that entity and
//! never aborts the player's own teleport.

use std::collections::HashSet;

use town_portal_host::{BlockPos, Dimension, EntityId, EntityState, PlayerId, PlayerState, Vec3, WorldHost};
use tracing::debug;

/// Handle returned by [`capture`], consumed by [`restore`] or [`release`].
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureSet {
    pub nearby_tag: String,
    pub leash_tag: String,
    pub mount_tag: String,
    pub rider_tag: String,
    /// One snapshot per captured entity, in capture order.
    pub snapshots: Vec<String>,
    /// Snapshot of the block the player stood in.
    pub surroundings: String,
    pub leashed: usize,
    pub mounted: usize,
    pub riders: usize,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Role {
    Leash,
    Mount,
    Rider,
}

impl CaptureSet {
    fn new(stamp: &str) -> Self {
        Self {
            nearby_tag: format!("nearby_temp_{stamp}"),
            leash_tag: format!("leash_temp_{stamp}"),
            mount_tag: format!("mount_temp_{stamp}"),
            rider_tag: format!("rider_temp_{stamp}"),
            snapshots: Vec::new(),
            surroundings: format!("dp_struct_{stamp}"),
            leashed: 0,
            mounted: 0,
            riders: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    fn tag(&self, role: Role) -> &str {
        match role {
            Role::Leash => &self.leash_tag,
            Role::Mount => &self.mount_tag,
            Role::Rider => &self.rider_tag,
        }
    }

    fn all_snapshots(&self) -> impl Iterator<Item = &String> {
        self.snapshots.iter().chain(std::iter::once(&self.surroundings))
    }
}

/// Snapshot and remove the creatures leashed to `player` or carrying them.
///
/// `stamp` must be unique per call; it names the scratch tags and snapshots.
/// Returns `None` when there is nothing to carry.
pub fn capture<H: WorldHost>(
    host: &H,
    player: &PlayerState,
    radius: f32,
    stamp: &str,
) -> Option<CaptureSet> {
    let nearby = host.entities_near(player.dimension, player.position, radius);
    let mut captured: Vec<(EntityState, Role)> = Vec::new();
    let mut seen = HashSet::new();

    for entity in &nearby {
        if entity.leash_holder == Some(player.id) && seen.insert(entity.id) {
            captured.push((entity.clone(), Role::Leash));
        }
        let carries_player = entity.riders.iter().any(|r| r.id == player.id);
        if !carries_player {
            continue;
        }
        if seen.insert(entity.id) {
            captured.push((entity.clone(), Role::Mount));
        }
        for rider in entity.riders.iter().filter(|r| !r.is_player) {
            if !seen.insert(rider.id) {
                continue;
            }
            if let Some(state) = nearby.iter().find(|e| e.id == rider.id) {
                captured.push((state.clone(), Role::Rider));
            }
        }
        if let Err(e) = host.eject_riders(entity.id) {
            debug!("Could not eject riders of {}: {e}", entity.id);
        }
    }

    if captured.is_empty() {
        return None;
    }

    let mut set = CaptureSet::new(stamp);
    for entity in &nearby {
        let _ = host.add_tag(entity.id, &set.nearby_tag);
    }
    for (index, (entity, role)) in captured.iter().enumerate() {
        let name = format!("dp_struct_{stamp}_{index}");
        let tag = set.tag(*role).to_string();
        let _ = host.add_tag(entity.id, &tag);
        match host.save_snapshot(entity.dimension, &name, BlockPos::from_vec3(&entity.position)) {
            Ok(()) => {
                set.snapshots.push(name);
                match role {
                    Role::Leash => set.leashed += 1,
                    Role::Mount => set.mounted += 1,
                    Role::Rider => set.riders += 1,
                }
            }
            Err(e) => debug!("Could not snapshot {}: {e}", entity.id),
        }
        let _ = host.remove_tag(entity.id, &tag);
    }
    if let Err(e) = host.save_snapshot(
        player.dimension,
        &set.surroundings,
        BlockPos::from_vec3(&player.position),
    ) {
        debug!("Could not snapshot surroundings of {}: {e}", player.name);
    }
    for entity in &nearby {
        let _ = host.remove_tag(entity.id, &set.nearby_tag);
    }
    // Only remove what was saved, so a failed snapshot leaves the creature behind.
    if set.is_empty() {
        delete_snapshots(host, &set);
        return None;
    }
    for (entity, _) in &captured {
        let _ = host.remove_entity(entity.id);
    }
    debug!(
        "Captured {} leashed, {} mounted, {} riding around {}",
        set.leashed, set.mounted, set.riders, player.name
    );
    Some(set)
}

/// Bring captured creatures back at `destination` and re-link them to `player`.
pub fn restore<H: WorldHost>(
    host: &H,
    set: &CaptureSet,
    player: PlayerId,
    dimension: Dimension,
    destination: Vec3,
    radius: f32,
) {
    let center = host
        .player(player)
        .map(|p| p.position)
        .unwrap_or(destination);
    materialize(host, set, dimension, destination, center, radius, Some(player));
}

/// Put captured creatures back at `position` without linking them to anyone.
///
/// For captures whose player will never arrive: the creatures stay in the
/// world as free entities instead of vanishing with their snapshots.
pub fn release<H: WorldHost>(
    host: &H,
    set: &CaptureSet,
    dimension: Dimension,
    position: Vec3,
    radius: f32,
) {
    debug!("Releasing {} companion snapshot(s) at {position}", set.snapshots.len());
    materialize(host, set, dimension, position, position, radius, None);
}

fn materialize<H: WorldHost>(
    host: &H,
    set: &CaptureSet,
    dimension: Dimension,
    destination: Vec3,
    center: Vec3,
    radius: f32,
    player: Option<PlayerId>,
) {
    for name in &set.snapshots {
        if let Err(e) = host.load_snapshot(dimension, name, destination) {
            debug!("Could not load snapshot {name}: {e}");
        }
    }

    let mut mount: Option<EntityId> = None;
    let mut riders = Vec::new();
    for entity in host
        .entities_near(dimension, center, radius)
        .into_iter()
        .filter(|e| e.has_tag(&set.nearby_tag))
    {
        let leashed = entity.has_tag(&set.leash_tag);
        let mounted = entity.has_tag(&set.mount_tag);
        let riding = entity.has_tag(&set.rider_tag);
        if !(leashed || mounted || riding) {
            let _ = host.remove_entity(entity.id);
            continue;
        }
        if let Some(player) = player {
            if leashed {
                let _ = host.leash_to(entity.id, player);
            }
            if mounted {
                let _ = host.add_rider(entity.id, player);
                mount = Some(entity.id);
            }
            if riding {
                riders.push(entity.id);
            }
        }
        for tag in [&set.nearby_tag, &set.leash_tag, &set.mount_tag, &set.rider_tag] {
            if entity.has_tag(tag) {
                let _ = host.remove_tag(entity.id, tag);
            }
        }
    }
    if let Some(mount) = mount {
        for rider in riders {
            let _ = host.add_rider(mount, rider);
        }
    }
    delete_snapshots(host, set);
}

fn delete_snapshots<H: WorldHost>(host: &H, set: &CaptureSet) {
    for name in set.all_snapshots() {
        let _ = host.delete_snapshot(name);
    }
}

#[cfg(test)]
mod tests {
    use town_portal_host::Rider;
    use town_portal_sim::{SimSettings, SimWorld};

    use super::*;

    const RADIUS: f32 = 12.0;

    fn setup() -> (SimWorld, PlayerId) {
        let world = SimWorld::new(SimSettings::default());
        world.pin_area(Dimension::Overworld, BlockPos::new(0, 64, 0), 1);
        world.pin_area(Dimension::Nether, BlockPos::new(100, 32, 100), 1);
        let player = world.join_player("Alice", Dimension::Overworld, Vec3::new(0.5, 64.0, 0.5));
        (world, player)
    }

    fn scratch_tagged(world: &SimWorld) -> usize {
        world
            .entities()
            .iter()
            .filter(|e| e.tags.iter().any(|t| t.contains("_temp_")))
            .count()
    }

    #[test]
    fn nothing_to_capture() {
        let (world, player) = setup();
        world.spawn_entity("minecraft:cow", Dimension::Overworld, Vec3::new(3.5, 64.0, 3.5));
        let state = world.player(player).unwrap();
        assert!(capture(&world, &state, RADIUS, "1_1").is_none());
        assert!(world.snapshot_names().is_empty());
        assert_eq!(world.entities().len(), 1);
    }

    #[test]
    fn leash_and_mount_round_trip() {
        let (world, player) = setup();
        let dog = world.spawn_entity("minecraft:wolf", Dimension::Overworld, Vec3::new(3.5, 64.0, 1.5));
        let horse = world.spawn_entity("minecraft:horse", Dimension::Overworld, Vec3::new(0.5, 64.0, 0.5));
        let bystander = world.spawn_entity("minecraft:pig", Dimension::Overworld, Vec3::new(0.7, 64.0, 0.2));
        world.leash_to(dog, player).unwrap();
        world.add_rider(horse, player).unwrap();

        let state = world.player(player).unwrap();
        let set = capture(&world, &state, RADIUS, "20_1").unwrap();
        assert_eq!((set.leashed, set.mounted, set.riders), (1, 1, 0));
        assert_eq!(set.snapshots, vec!["dp_struct_20_1_0", "dp_struct_20_1_1"]);
        assert!(world.entity(dog).is_none());
        assert!(world.entity(horse).is_none());
        // The pig shares the horse's block but was not captured.
        assert!(world.entity(bystander).is_some());
        assert_eq!(scratch_tagged(&world), 0);

        let destination = Vec3::new(100.5, 32.0, 100.5);
        world
            .teleport(player, destination, town_portal_host::TeleportOptions::into_dimension(Dimension::Nether))
            .unwrap();
        restore(&world, &set, player, Dimension::Nether, destination, RADIUS);

        let arrived: Vec<_> = world
            .entities()
            .into_iter()
            .filter(|e| e.dimension == Dimension::Nether)
            .collect();
        assert_eq!(arrived.len(), 2);
        let wolf = arrived.iter().find(|e| e.type_id == "minecraft:wolf").unwrap();
        assert_eq!(wolf.leash_holder, Some(player));
        let mount = arrived.iter().find(|e| e.type_id == "minecraft:horse").unwrap();
        assert_eq!(mount.riders, vec![Rider { id: player, is_player: true }]);
        assert_eq!(scratch_tagged(&world), 0);
        assert!(world.snapshot_names().is_empty());
    }

    #[test]
    fn passengers_follow_the_mount() {
        let (world, player) = setup();
        let boat = world.spawn_entity("minecraft:boat", Dimension::Overworld, Vec3::new(1.5, 64.0, 1.5));
        let villager = world.spawn_entity("minecraft:villager", Dimension::Overworld, Vec3::new(1.5, 64.0, 1.5));
        world.add_rider(boat, player).unwrap();
        world.add_rider(boat, villager).unwrap();

        let state = world.player(player).unwrap();
        let set = capture(&world, &state, RADIUS, "5_2").unwrap();
        assert_eq!((set.leashed, set.mounted, set.riders), (0, 1, 1));
        assert!(world.entities().is_empty());

        let destination = Vec3::new(100.5, 32.0, 100.5);
        world
            .teleport(player, destination, town_portal_host::TeleportOptions::into_dimension(Dimension::Nether))
            .unwrap();
        restore(&world, &set, player, Dimension::Nether, destination, RADIUS);

        let arrived = world.entities();
        // Both snapshots held both entities; the untagged copies are gone.
        assert_eq!(arrived.len(), 2);
        let boat = arrived.iter().find(|e| e.type_id == "minecraft:boat").unwrap();
        let rider_ids: Vec<_> = boat.riders.iter().map(|r| r.id).collect();
        assert_eq!(rider_ids.len(), 2);
        assert_eq!(rider_ids[0], player);
        let passenger = arrived.iter().find(|e| e.type_id == "minecraft:villager").unwrap();
        assert_eq!(rider_ids[1], passenger.id);
        assert_eq!(scratch_tagged(&world), 0);
    }

    #[test]
    fn passenger_seat_counts_as_mounted() {
        let (world, player) = setup();
        let boat = world.spawn_entity("minecraft:boat", Dimension::Overworld, Vec3::new(1.5, 64.0, 1.5));
        let villager = world.spawn_entity("minecraft:villager", Dimension::Overworld, Vec3::new(1.5, 64.0, 1.5));
        world.add_rider(boat, villager).unwrap();
        world.add_rider(boat, player).unwrap();
        assert_eq!(world.entity(boat).unwrap().riders[1].id, player);

        let state = world.player(player).unwrap();
        let set = capture(&world, &state, RADIUS, "7_1").unwrap();
        assert_eq!((set.leashed, set.mounted, set.riders), (0, 1, 1));
        assert!(world.entity(boat).is_none());
        assert!(world.entity(villager).is_none());
    }

    #[test]
    fn release_returns_creatures_unlinked() {
        let (world, player) = setup();
        let cat = world.spawn_entity("minecraft:cat", Dimension::Overworld, Vec3::new(2.5, 64.0, 2.5));
        let pig = world.spawn_entity("minecraft:pig", Dimension::Overworld, Vec3::new(2.5, 64.0, 2.5));
        world.leash_to(cat, player).unwrap();
        let state = world.player(player).unwrap();
        let set = capture(&world, &state, RADIUS, "9_9").unwrap();
        assert_eq!(world.snapshot_names().len(), 2);
        assert!(world.entity(cat).is_none());

        let origin = Vec3::new(0.5, 64.0, 0.5);
        release(&world, &set, Dimension::Overworld, origin, RADIUS);
        let cats: Vec<_> = world
            .entities()
            .into_iter()
            .filter(|e| e.type_id == "minecraft:cat")
            .collect();
        assert_eq!(cats.len(), 1);
        assert_eq!(cats[0].leash_holder, None);
        assert!(approx_eq(cats[0].position, origin));
        // The pig copy in the cat's snapshot was dropped; the live pig stays.
        assert!(world.entity(pig).is_some());
        assert_eq!(world.entities().len(), 2);
        assert_eq!(scratch_tagged(&world), 0);
        assert!(world.snapshot_names().is_empty());
    }

    fn approx_eq(a: Vec3, b: Vec3) -> bool {
        a.distance(&b) < 1e-3
    }
}
