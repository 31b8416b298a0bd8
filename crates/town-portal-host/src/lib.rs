//! Host API: the capabilities the town-portal engine consumes from the game.
//!
//! This crate defines the interface a game server (or the in-memory
//! simulation) implements. It has no dependency on the engine.

pub mod error;
pub mod types;

pub use error::HostError;
pub use types::{
    BlockInfo, BlockPos, ChunkPos, Dimension, EntityId, EntityState, ItemStack, PlayerId,
    PlayerState, Rider, TeleportOptions, Vec3,
};

// ─── Events ──────────────────────────────────────────────────────────────────

/// Result of dispatching an event to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    /// Continue normal handling.
    Continue,
    /// The host should cancel the action that raised the event. For
    /// commands this means the engine consumed it.
    Cancelled,
}

/// Events the host forwards to the engine.
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// The world finished loading.
    Startup,
    /// A player is about to use an item (before-event: world is read-only).
    ItemUse { player: PlayerId, item: ItemStack },
    PlayerSpawn { player: PlayerId, initial: bool },
    PlayerLeave { player: PlayerId },
    PlayerDeath { player: PlayerId },
    /// A registered custom command was run by a player.
    Command {
        player: PlayerId,
        name: String,
        args: Vec<String>,
    },
}

impl HostEvent {
    /// Whether the host honours `EventResult::Cancelled` for this event.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, HostEvent::ItemUse { .. } | HostEvent::Command { .. })
    }
}

// ─── Host API ────────────────────────────────────────────────────────────────

/// Access to world state, called only from the tick thread.
///
/// All methods take `&self`: calls are never re-entrant, so implementations
/// are free to use `RefCell` internally. Methods returning `Result` may fail
/// when the target is unloaded or gone; cosmetic calls are fire-and-forget.
pub trait WorldHost {
    // --- Blocks ---

    /// Block at `pos`. Fails with [`HostError::ChunkNotLoaded`] when the
    /// containing chunk is not resident.
    fn block(&self, dimension: Dimension, pos: BlockPos) -> Result<BlockInfo, HostError>;

    // --- Players ---
    fn player(&self, id: PlayerId) -> Option<PlayerState>;
    fn players_near(&self, dimension: Dimension, center: Vec3, radius: f32) -> Vec<PlayerState>;
    fn teleport(
        &self,
        player: PlayerId,
        position: Vec3,
        options: TeleportOptions,
    ) -> Result<(), HostError>;
    fn set_movement_enabled(&self, player: PlayerId, enabled: bool) -> Result<(), HostError>;
    fn send_message(&self, player: PlayerId, message: &str);
    fn held_item(&self, player: PlayerId) -> Option<ItemStack>;
    fn set_held_item(&self, player: PlayerId, item: Option<ItemStack>) -> Result<(), HostError>;
    /// Remaining cooldown ticks for an item category.
    fn item_cooldown(&self, player: PlayerId, category: &str) -> u32;
    fn dynamic_property(&self, player: PlayerId, key: &str) -> Option<i64>;
    fn set_dynamic_property(&self, player: PlayerId, key: &str, value: i64);

    // --- Entities ---
    fn entities_near(&self, dimension: Dimension, center: Vec3, radius: f32) -> Vec<EntityState>;
    fn add_tag(&self, entity: EntityId, tag: &str) -> Result<(), HostError>;
    fn remove_tag(&self, entity: EntityId, tag: &str) -> Result<(), HostError>;
    fn remove_entity(&self, entity: EntityId) -> Result<(), HostError>;
    fn eject_riders(&self, mount: EntityId) -> Result<(), HostError>;
    fn leash_to(&self, entity: EntityId, holder: EntityId) -> Result<(), HostError>;
    fn add_rider(&self, mount: EntityId, rider: EntityId) -> Result<(), HostError>;

    // --- Snapshots (in-memory structures) ---

    /// Save every non-player entity inside the block at `pos` under `name`.
    fn save_snapshot(&self, dimension: Dimension, name: &str, pos: BlockPos)
        -> Result<(), HostError>;
    /// Materialize the entities saved under `name` at `position`.
    fn load_snapshot(&self, dimension: Dimension, name: &str, position: Vec3)
        -> Result<(), HostError>;
    fn delete_snapshot(&self, name: &str) -> Result<(), HostError>;

    // --- Keep-alive areas ---
    fn add_ticking_area(
        &self,
        dimension: Dimension,
        name: &str,
        center: BlockPos,
        radius: u32,
    ) -> Result<(), HostError>;
    fn remove_ticking_area(&self, dimension: Dimension, name: &str) -> Result<(), HostError>;
    fn clear_ticking_areas(&self, dimension: Dimension) -> Result<(), HostError>;

    // --- Effects ---
    fn play_sound(&self, dimension: Dimension, sound: &str, position: Vec3)
        -> Result<(), HostError>;
    /// Spawn a particle effect; `yaw` is forwarded to effects that orient themselves.
    fn spawn_particle(
        &self,
        dimension: Dimension,
        effect: &str,
        position: Vec3,
        yaw: Option<f32>,
    ) -> Result<(), HostError>;

    /// Play a sound for a single player at their own position.
    fn play_sound_to(&self, player: PlayerId, sound: &str) -> Result<(), HostError> {
        let state = self.player(player).ok_or(HostError::PlayerOffline(player))?;
        self.play_sound(state.dimension, sound, state.position)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
