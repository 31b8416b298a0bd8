//! In-memory world: blocks, chunk streaming, players, entities and snapshots.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use town_portal_host::{
    BlockInfo, BlockPos, ChunkPos, Dimension, EntityId, EntityState, HostError, ItemStack,
    PlayerId, PlayerState, Rider, TeleportOptions, Vec3, WorldHost,
};
use tracing::{debug, trace};

use crate::terrain::{block_info, SimSettings, Terrain};

// ─── Recorded effects ────────────────────────────────────────────────────────

/// Observable side effect, recorded in order for inspection.
#[derive(Debug, Clone, PartialEq)]
pub enum SimEffect {
    Message {
        player: PlayerId,
        text: String,
    },
    Sound {
        dimension: Dimension,
        sound: String,
        position: Vec3,
    },
    Particle {
        dimension: Dimension,
        effect: String,
        position: Vec3,
        yaw: Option<f32>,
    },
    Teleport {
        player: PlayerId,
        dimension: Dimension,
        position: Vec3,
    },
}

// ─── Internal state ──────────────────────────────────────────────────────────

struct SimPlayer {
    state: PlayerState,
    movement_enabled: bool,
    held_item: Option<ItemStack>,
    item_cooldowns: HashMap<String, u32>,
}

#[derive(Clone)]
struct SimEntity {
    type_id: String,
    dimension: Dimension,
    position: Vec3,
    leash_holder: Option<EntityId>,
    riders: Vec<EntityId>,
    tags: Vec<String>,
}

struct TickingArea {
    center: BlockPos,
    radius: u32,
}

type ChunkKey = (Dimension, ChunkPos);

struct Inner {
    tick: u64,
    overrides: HashMap<(Dimension, BlockPos), String>,
    loaded: HashSet<ChunkKey>,
    /// Requested chunks and the tick at which they become queryable.
    pending: HashMap<ChunkKey, u64>,
    pinned: HashSet<ChunkKey>,
    players: BTreeMap<EntityId, SimPlayer>,
    entities: BTreeMap<EntityId, SimEntity>,
    snapshots: HashMap<String, Vec<SimEntity>>,
    ticking_areas: HashMap<(Dimension, String), TickingArea>,
    /// Dynamic properties keyed by player name so they outlive a session.
    properties: HashMap<String, HashMap<String, i64>>,
    next_entity_id: u64,
    effects: Vec<SimEffect>,
}

/// A self-contained [`WorldHost`] with deterministic terrain and delayed
/// chunk streaming.
pub struct SimWorld {
    settings: SimSettings,
    terrain: Terrain,
    inner: RefCell<Inner>,
}

impl SimWorld {
    pub fn new(settings: SimSettings) -> Self {
        let terrain = Terrain::new(&settings);
        Self {
            settings,
            terrain,
            inner: RefCell::new(Inner {
                tick: 0,
                overrides: HashMap::new(),
                loaded: HashSet::new(),
                pending: HashMap::new(),
                pinned: HashSet::new(),
                players: BTreeMap::new(),
                entities: BTreeMap::new(),
                snapshots: HashMap::new(),
                ticking_areas: HashMap::new(),
                properties: HashMap::new(),
                next_entity_id: 1,
                effects: Vec::new(),
            }),
        }
    }

    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    pub fn current_tick(&self) -> u64 {
        self.inner.borrow().tick
    }

    // -----------------------------------------------------------------------
    // Streaming
    // -----------------------------------------------------------------------

    /// Advance one tick: promote due chunk requests, request chunks around
    /// players and ticking areas, unload everything else, tick item cooldowns.
    pub fn advance_tick(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.tick += 1;
        let tick = inner.tick;

        let mut wanted: HashSet<ChunkKey> = inner.pinned.clone();
        let view = self.settings.view_distance;
        for p in inner.players.values() {
            let center = BlockPos::from_vec3(&p.state.position).chunk_pos();
            add_square(&mut wanted, p.state.dimension, center, view);
        }
        for ((dim, _), area) in &inner.ticking_areas {
            add_square(&mut wanted, *dim, area.center.chunk_pos(), area.radius as i32);
        }

        let delay = self.settings.stream_delay_ticks;
        for key in &wanted {
            if !inner.loaded.contains(key) {
                inner.pending.entry(*key).or_insert(tick + delay);
            }
        }
        let due: Vec<ChunkKey> = inner
            .pending
            .iter()
            .filter(|(key, ready)| **ready <= tick && wanted.contains(*key))
            .map(|(key, _)| *key)
            .collect();
        for key in due {
            inner.pending.remove(&key);
            inner.loaded.insert(key);
            trace!("Chunk {} in {} streamed in", key.1, key.0);
        }
        inner.pending.retain(|key, _| wanted.contains(key));
        inner.loaded.retain(|key| wanted.contains(key));

        for p in inner.players.values_mut() {
            for remaining in p.item_cooldowns.values_mut() {
                *remaining = remaining.saturating_sub(1);
            }
        }
    }

    /// Keep the chunks around `center` permanently loaded, starting now.
    pub fn pin_area(&self, dimension: Dimension, center: BlockPos, radius: i32) {
        let mut inner = self.inner.borrow_mut();
        let mut keys = HashSet::new();
        add_square(&mut keys, dimension, center.chunk_pos(), radius);
        for key in keys {
            inner.pending.remove(&key);
            inner.loaded.insert(key);
            inner.pinned.insert(key);
        }
    }

    /// Load the chunks around `center` now; they stay loaded while something wants them.
    pub fn load_area(&self, dimension: Dimension, center: BlockPos, radius: i32) {
        let mut inner = self.inner.borrow_mut();
        let mut keys = HashSet::new();
        add_square(&mut keys, dimension, center.chunk_pos(), radius);
        for key in keys {
            inner.pending.remove(&key);
            inner.loaded.insert(key);
        }
    }

    pub fn is_loaded(&self, dimension: Dimension, pos: BlockPos) -> bool {
        self.inner
            .borrow()
            .loaded
            .contains(&(dimension, pos.chunk_pos()))
    }

    // -----------------------------------------------------------------------
    // World editing
    // -----------------------------------------------------------------------

    pub fn set_block(&self, dimension: Dimension, pos: BlockPos, type_id: &str) {
        self.inner
            .borrow_mut()
            .overrides
            .insert((dimension, pos), type_id.to_string());
    }

    /// Block type ignoring residency (for inspection).
    pub fn block_type(&self, dimension: Dimension, pos: BlockPos) -> String {
        if let Some(t) = self.inner.borrow().overrides.get(&(dimension, pos)) {
            return t.clone();
        }
        self.terrain
            .block_type(dimension, pos.x, pos.y, pos.z)
            .to_string()
    }

    pub fn surface_height(&self, dimension: Dimension, x: i32, z: i32) -> i32 {
        self.terrain.height(dimension, x, z)
    }

    // -----------------------------------------------------------------------
    // Players
    // -----------------------------------------------------------------------

    /// Add a player; the chunks around them are loaded immediately.
    pub fn join_player(&self, name: &str, dimension: Dimension, position: Vec3) -> PlayerId {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = EntityId(inner.next_entity_id);
            inner.next_entity_id += 1;
            inner.players.insert(
                id,
                SimPlayer {
                    state: PlayerState {
                        id,
                        name: name.to_string(),
                        dimension,
                        position,
                        view_direction: Vec3::new(0.0, 0.0, 1.0),
                        yaw: 0.0,
                        spawn_point: None,
                        sneaking: false,
                        creative: false,
                    },
                    movement_enabled: true,
                    held_item: None,
                    item_cooldowns: HashMap::new(),
                },
            );
            id
        };
        self.load_area(
            dimension,
            BlockPos::from_vec3(&position),
            self.settings.view_distance,
        );
        debug!("{name} joined as {id} at {position} in {dimension}");
        id
    }

    pub fn leave_player(&self, player: PlayerId) -> bool {
        let mut inner = self.inner.borrow_mut();
        for e in inner.entities.values_mut() {
            e.riders.retain(|r| *r != player);
            if e.leash_holder == Some(player) {
                e.leash_holder = None;
            }
        }
        inner.players.remove(&player).is_some()
    }

    pub fn find_player(&self, name: &str) -> Option<PlayerId> {
        self.inner
            .borrow()
            .players
            .values()
            .find(|p| p.state.name.eq_ignore_ascii_case(name))
            .map(|p| p.state.id)
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.inner.borrow().players.keys().copied().collect()
    }

    pub fn move_player(&self, player: PlayerId, position: Vec3) {
        if let Some(p) = self.inner.borrow_mut().players.get_mut(&player) {
            p.state.position = position;
        }
    }

    /// Set look direction from yaw/pitch in degrees (yaw -90 looks towards +X).
    pub fn set_look(&self, player: PlayerId, yaw: f32, pitch: f32) {
        if let Some(p) = self.inner.borrow_mut().players.get_mut(&player) {
            let (yaw_r, pitch_r) = (yaw.to_radians(), pitch.to_radians());
            p.state.yaw = yaw;
            p.state.view_direction = Vec3::new(
                -yaw_r.sin() * pitch_r.cos(),
                -pitch_r.sin(),
                yaw_r.cos() * pitch_r.cos(),
            );
        }
    }

    pub fn set_spawn_point(&self, player: PlayerId, spawn: Option<(Dimension, BlockPos)>) {
        if let Some(p) = self.inner.borrow_mut().players.get_mut(&player) {
            p.state.spawn_point = spawn;
        }
    }

    pub fn set_sneaking(&self, player: PlayerId, sneaking: bool) {
        if let Some(p) = self.inner.borrow_mut().players.get_mut(&player) {
            p.state.sneaking = sneaking;
        }
    }

    pub fn set_creative(&self, player: PlayerId, creative: bool) {
        if let Some(p) = self.inner.borrow_mut().players.get_mut(&player) {
            p.state.creative = creative;
        }
    }

    pub fn give_item(&self, player: PlayerId, item: ItemStack) {
        if let Some(p) = self.inner.borrow_mut().players.get_mut(&player) {
            p.held_item = Some(item);
        }
    }

    pub fn set_item_cooldown(&self, player: PlayerId, category: &str, ticks: u32) {
        if let Some(p) = self.inner.borrow_mut().players.get_mut(&player) {
            p.item_cooldowns.insert(category.to_string(), ticks);
        }
    }

    pub fn movement_enabled(&self, player: PlayerId) -> bool {
        self.inner
            .borrow()
            .players
            .get(&player)
            .map(|p| p.movement_enabled)
            .unwrap_or(false)
    }

    // -----------------------------------------------------------------------
    // Entities
    // -----------------------------------------------------------------------

    pub fn spawn_entity(&self, type_id: &str, dimension: Dimension, position: Vec3) -> EntityId {
        let mut inner = self.inner.borrow_mut();
        let id = EntityId(inner.next_entity_id);
        inner.next_entity_id += 1;
        inner.entities.insert(
            id,
            SimEntity {
                type_id: type_id.to_string(),
                dimension,
                position,
                leash_holder: None,
                riders: Vec::new(),
                tags: Vec::new(),
            },
        );
        id
    }

    pub fn entity(&self, id: EntityId) -> Option<EntityState> {
        let inner = self.inner.borrow();
        inner.entities.get(&id).map(|e| entity_state(&inner, id, e))
    }

    pub fn entities(&self) -> Vec<EntityState> {
        let inner = self.inner.borrow();
        inner
            .entities
            .iter()
            .map(|(id, e)| entity_state(&inner, *id, e))
            .collect()
    }

    pub fn snapshot_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.borrow().snapshots.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn ticking_area_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .borrow()
            .ticking_areas
            .keys()
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }

    // -----------------------------------------------------------------------
    // Effects
    // -----------------------------------------------------------------------

    pub fn effects(&self) -> Vec<SimEffect> {
        self.inner.borrow().effects.clone()
    }

    /// Remove and return every recorded effect.
    pub fn drain_effects(&self) -> Vec<SimEffect> {
        std::mem::take(&mut self.inner.borrow_mut().effects)
    }

    pub fn messages(&self, player: PlayerId) -> Vec<String> {
        self.inner
            .borrow()
            .effects
            .iter()
            .filter_map(|e| match e {
                SimEffect::Message { player: p, text } if *p == player => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn teleports(&self, player: PlayerId) -> Vec<(Dimension, Vec3)> {
        self.inner
            .borrow()
            .effects
            .iter()
            .filter_map(|e| match e {
                SimEffect::Teleport {
                    player: p,
                    dimension,
                    position,
                } if *p == player => Some((*dimension, *position)),
                _ => None,
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Dynamic property persistence
    // -----------------------------------------------------------------------

    /// Write all player dynamic properties as JSON.
    pub fn save_properties(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(&self.inner.borrow().properties)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load player dynamic properties written by [`SimWorld::save_properties`].
    /// A missing file is not an error.
    pub fn load_properties(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if !path.exists() {
            return Ok(());
        }
        let data = std::fs::read_to_string(path)?;
        let properties: HashMap<String, HashMap<String, i64>> = serde_json::from_str(&data)?;
        self.inner.borrow_mut().properties = properties;
        Ok(())
    }

    fn record(&self, effect: SimEffect) {
        self.inner.borrow_mut().effects.push(effect);
    }
}

fn add_square(set: &mut HashSet<ChunkKey>, dimension: Dimension, center: ChunkPos, radius: i32) {
    for dx in -radius..=radius {
        for dz in -radius..=radius {
            set.insert((dimension, ChunkPos::new(center.x + dx, center.z + dz)));
        }
    }
}

fn entity_state(inner: &Inner, id: EntityId, e: &SimEntity) -> EntityState {
    EntityState {
        id,
        type_id: e.type_id.clone(),
        dimension: e.dimension,
        position: e.position,
        leash_holder: e.leash_holder,
        riders: e
            .riders
            .iter()
            .map(|r| Rider {
                id: *r,
                is_player: inner.players.contains_key(r),
            })
            .collect(),
        tags: e.tags.clone(),
    }
}

// ─── WorldHost ───────────────────────────────────────────────────────────────

impl WorldHost for SimWorld {
    fn block(&self, dimension: Dimension, pos: BlockPos) -> Result<BlockInfo, HostError> {
        if !self.is_loaded(dimension, pos) {
            return Err(HostError::ChunkNotLoaded { dimension, pos });
        }
        Ok(block_info(&self.block_type(dimension, pos)))
    }

    fn player(&self, id: PlayerId) -> Option<PlayerState> {
        self.inner.borrow().players.get(&id).map(|p| p.state.clone())
    }

    fn players_near(&self, dimension: Dimension, center: Vec3, radius: f32) -> Vec<PlayerState> {
        let radius_sq = radius * radius;
        self.inner
            .borrow()
            .players
            .values()
            .filter(|p| {
                p.state.dimension == dimension && p.state.position.distance_sq(&center) <= radius_sq
            })
            .map(|p| p.state.clone())
            .collect()
    }

    fn teleport(
        &self,
        player: PlayerId,
        position: Vec3,
        options: TeleportOptions,
    ) -> Result<(), HostError> {
        {
            let mut inner = self.inner.borrow_mut();
            let p = inner
                .players
                .get_mut(&player)
                .ok_or(HostError::PlayerOffline(player))?;
            p.state.dimension = options.dimension;
            p.state.position = position;
        }
        self.record(SimEffect::Teleport {
            player,
            dimension: options.dimension,
            position,
        });
        Ok(())
    }

    fn set_movement_enabled(&self, player: PlayerId, enabled: bool) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let p = inner
            .players
            .get_mut(&player)
            .ok_or(HostError::PlayerOffline(player))?;
        p.movement_enabled = enabled;
        Ok(())
    }

    fn send_message(&self, player: PlayerId, message: &str) {
        self.record(SimEffect::Message {
            player,
            text: message.to_string(),
        });
    }

    fn held_item(&self, player: PlayerId) -> Option<ItemStack> {
        self.inner
            .borrow()
            .players
            .get(&player)
            .and_then(|p| p.held_item.clone())
    }

    fn set_held_item(&self, player: PlayerId, item: Option<ItemStack>) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let p = inner
            .players
            .get_mut(&player)
            .ok_or(HostError::PlayerOffline(player))?;
        p.held_item = item;
        Ok(())
    }

    fn item_cooldown(&self, player: PlayerId, category: &str) -> u32 {
        self.inner
            .borrow()
            .players
            .get(&player)
            .and_then(|p| p.item_cooldowns.get(category).copied())
            .unwrap_or(0)
    }

    fn dynamic_property(&self, player: PlayerId, key: &str) -> Option<i64> {
        let inner = self.inner.borrow();
        let name = &inner.players.get(&player)?.state.name;
        inner.properties.get(name)?.get(key).copied()
    }

    fn set_dynamic_property(&self, player: PlayerId, key: &str, value: i64) {
        let mut inner = self.inner.borrow_mut();
        let Some(name) = inner.players.get(&player).map(|p| p.state.name.clone()) else {
            return;
        };
        inner
            .properties
            .entry(name)
            .or_default()
            .insert(key.to_string(), value);
    }

    fn entities_near(&self, dimension: Dimension, center: Vec3, radius: f32) -> Vec<EntityState> {
        let radius_sq = radius * radius;
        let inner = self.inner.borrow();
        inner
            .entities
            .iter()
            .filter(|(_, e)| e.dimension == dimension && e.position.distance_sq(&center) <= radius_sq)
            .map(|(id, e)| entity_state(&inner, *id, e))
            .collect()
    }

    fn add_tag(&self, entity: EntityId, tag: &str) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let e = inner
            .entities
            .get_mut(&entity)
            .ok_or(HostError::EntityGone(entity))?;
        if !e.tags.iter().any(|t| t == tag) {
            e.tags.push(tag.to_string());
        }
        Ok(())
    }

    fn remove_tag(&self, entity: EntityId, tag: &str) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let e = inner
            .entities
            .get_mut(&entity)
            .ok_or(HostError::EntityGone(entity))?;
        e.tags.retain(|t| t != tag);
        Ok(())
    }

    fn remove_entity(&self, entity: EntityId) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        inner
            .entities
            .remove(&entity)
            .ok_or(HostError::EntityGone(entity))?;
        for e in inner.entities.values_mut() {
            e.riders.retain(|r| *r != entity);
        }
        Ok(())
    }

    fn eject_riders(&self, mount: EntityId) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let e = inner
            .entities
            .get_mut(&mount)
            .ok_or(HostError::EntityGone(mount))?;
        e.riders.clear();
        Ok(())
    }

    fn leash_to(&self, entity: EntityId, holder: EntityId) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let e = inner
            .entities
            .get_mut(&entity)
            .ok_or(HostError::EntityGone(entity))?;
        e.leash_holder = Some(holder);
        Ok(())
    }

    fn add_rider(&self, mount: EntityId, rider: EntityId) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let rider_exists = inner.players.contains_key(&rider) || inner.entities.contains_key(&rider);
        if !rider_exists {
            return Err(HostError::EntityGone(rider));
        }
        let e = inner
            .entities
            .get_mut(&mount)
            .ok_or(HostError::EntityGone(mount))?;
        if !e.riders.contains(&rider) {
            e.riders.push(rider);
        }
        Ok(())
    }

    fn save_snapshot(
        &self,
        dimension: Dimension,
        name: &str,
        pos: BlockPos,
    ) -> Result<(), HostError> {
        if !self.is_loaded(dimension, pos) {
            return Err(HostError::ChunkNotLoaded { dimension, pos });
        }
        let mut inner = self.inner.borrow_mut();
        let saved: Vec<SimEntity> = inner
            .entities
            .values()
            .filter(|e| e.dimension == dimension && BlockPos::from_vec3(&e.position) == pos)
            .cloned()
            .collect();
        debug!("Saved {} entities into snapshot {name}", saved.len());
        inner.snapshots.insert(name.to_string(), saved);
        Ok(())
    }

    fn load_snapshot(
        &self,
        dimension: Dimension,
        name: &str,
        position: Vec3,
    ) -> Result<(), HostError> {
        let mut inner = self.inner.borrow_mut();
        let saved = inner
            .snapshots
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::UnknownSnapshot(name.to_string()))?;
        for mut e in saved {
            let id = EntityId(inner.next_entity_id);
            inner.next_entity_id += 1;
            e.dimension = dimension;
            e.position = position;
            e.leash_holder = None;
            e.riders.clear();
            inner.entities.insert(id, e);
        }
        Ok(())
    }

    fn delete_snapshot(&self, name: &str) -> Result<(), HostError> {
        self.inner
            .borrow_mut()
            .snapshots
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| HostError::UnknownSnapshot(name.to_string()))
    }

    fn add_ticking_area(
        &self,
        dimension: Dimension,
        name: &str,
        center: BlockPos,
        radius: u32,
    ) -> Result<(), HostError> {
        self.inner
            .borrow_mut()
            .ticking_areas
            .insert((dimension, name.to_string()), TickingArea { center, radius });
        Ok(())
    }

    fn remove_ticking_area(&self, dimension: Dimension, name: &str) -> Result<(), HostError> {
        self.inner
            .borrow_mut()
            .ticking_areas
            .remove(&(dimension, name.to_string()))
            .map(|_| ())
            .ok_or_else(|| HostError::Rejected(format!("no ticking area named {name}")))
    }

    fn clear_ticking_areas(&self, dimension: Dimension) -> Result<(), HostError> {
        self.inner
            .borrow_mut()
            .ticking_areas
            .retain(|(dim, _), _| *dim != dimension);
        Ok(())
    }

    fn play_sound(&self, dimension: Dimension, sound: &str, position: Vec3) -> Result<(), HostError> {
        self.record(SimEffect::Sound {
            dimension,
            sound: sound.to_string(),
            position,
        });
        Ok(())
    }

    fn spawn_particle(
        &self,
        dimension: Dimension,
        effect: &str,
        position: Vec3,
        yaw: Option<f32>,
    ) -> Result<(), HostError> {
        self.record(SimEffect::Particle {
            dimension,
            effect: effect.to_string(),
            position,
            yaw,
        });
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn world(delay: u64) -> SimWorld {
        SimWorld::new(SimSettings {
            stream_delay_ticks: delay,
            ..SimSettings::default()
        })
    }

    #[test]
    fn unloaded_block_query_faults() {
        let w = world(5);
        let err = w
            .block(Dimension::Overworld, BlockPos::new(500, 64, 500))
            .unwrap_err();
        assert!(err.is_not_loaded());
    }

    #[test]
    fn teleport_streams_destination_after_delay() {
        let w = world(3);
        let p = w.join_player("Alice", Dimension::Overworld, Vec3::new(0.5, 64.0, 0.5));
        let dest = Vec3::new(1000.5, 64.0, 1000.5);
        w.teleport(p, dest, TeleportOptions::into_dimension(Dimension::Overworld))
            .unwrap();
        let dest_block = BlockPos::from_vec3(&dest);
        for _ in 0..4 {
            assert!(!w.is_loaded(Dimension::Overworld, dest_block));
            w.advance_tick();
        }
        assert!(w.is_loaded(Dimension::Overworld, dest_block));
        // The old position is no longer wanted.
        assert!(!w.is_loaded(Dimension::Overworld, BlockPos::new(0, 64, 0)));
    }

    #[test]
    fn ticking_area_keeps_chunks_loaded() {
        let w = world(1);
        let center = BlockPos::new(-300, 64, 40);
        w.add_ticking_area(Dimension::Nether, "area", center, 1).unwrap();
        w.advance_tick();
        assert!(!w.is_loaded(Dimension::Nether, center));
        w.advance_tick();
        assert!(w.is_loaded(Dimension::Nether, center));
        w.remove_ticking_area(Dimension::Nether, "area").unwrap();
        w.advance_tick();
        assert!(!w.is_loaded(Dimension::Nether, center));
    }

    #[test]
    fn snapshot_roundtrip_keeps_tags_and_drops_links() {
        let w = world(0);
        let p = w.join_player("Alice", Dimension::Overworld, Vec3::new(0.5, 64.0, 0.5));
        let cow = w.spawn_entity("minecraft:cow", Dimension::Overworld, Vec3::new(2.3, 64.0, 2.7));
        w.leash_to(cow, p).unwrap();
        w.add_tag(cow, "marker").unwrap();
        w.save_snapshot(Dimension::Overworld, "snap", BlockPos::new(2, 64, 2))
            .unwrap();
        w.remove_entity(cow).unwrap();
        w.load_snapshot(Dimension::Overworld, "snap", Vec3::new(5.5, 64.0, 5.5))
            .unwrap();
        let all = w.entities();
        assert_eq!(all.len(), 1);
        assert!(all[0].has_tag("marker"));
        assert_eq!(all[0].leash_holder, None);
        assert_eq!(all[0].position, Vec3::new(5.5, 64.0, 5.5));
        w.delete_snapshot("snap").unwrap();
        assert!(w.snapshot_names().is_empty());
    }

    #[test]
    fn riders_report_player_flag() {
        let w = world(0);
        let p = w.join_player("Alice", Dimension::Overworld, Vec3::new(0.5, 64.0, 0.5));
        let horse = w.spawn_entity("minecraft:horse", Dimension::Overworld, Vec3::new(0.5, 64.0, 0.5));
        let zombie = w.spawn_entity("minecraft:zombie", Dimension::Overworld, Vec3::new(0.5, 64.0, 0.5));
        w.add_rider(horse, p).unwrap();
        w.add_rider(horse, zombie).unwrap();
        let state = w.entity(horse).unwrap();
        assert_eq!(
            state.riders,
            vec![
                Rider { id: p, is_player: true },
                Rider { id: zombie, is_player: false }
            ]
        );
    }

    #[test]
    fn dynamic_properties_follow_player_name() {
        let w = world(0);
        let p = w.join_player("Alice", Dimension::Overworld, Vec3::ZERO);
        w.set_dynamic_property(p, "color", 3);
        w.leave_player(p);
        let again = w.join_player("Alice", Dimension::Overworld, Vec3::ZERO);
        assert_ne!(p, again);
        assert_eq!(w.dynamic_property(again, "color"), Some(3));
    }

    #[test]
    fn item_cooldowns_tick_down() {
        let w = world(0);
        let p = w.join_player("Alice", Dimension::Overworld, Vec3::ZERO);
        w.set_item_cooldown(p, "scroll", 2);
        assert_eq!(w.item_cooldown(p, "scroll"), 2);
        w.advance_tick();
        w.advance_tick();
        assert_eq!(w.item_cooldown(p, "scroll"), 0);
    }
}
