//! The portal service: owns all engine state and routes host events.
//!
//! The host calls [`PortalService::tick`] once per game tick and forwards
//! its events to [`PortalService::handle_event`]. Both must run inside a
//! tokio `LocalSet`, since teleports and region loads continue as local
//! tasks across ticks.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use town_portal_host::{
    Dimension, EventResult, HostError, HostEvent, ItemStack, PlayerId, PlayerState, Vec3,
    WorldHost,
};
use tracing::{debug, info, warn};

use crate::chunk_wait::{ensure_loaded, sweep_leases};
use crate::clock::TickClock;
use crate::config::PortalConfig;
use crate::error::PortalError;
use crate::leases::LeaseTable;
use crate::registry::{
    LinkEntry, PairAttributes, PortalId, PortalRecord, PortalRegistry, PortalRole, PortalSpawn,
};
use crate::safe_location::find_safe_location;
use crate::spatial::Spatial;
use crate::{scanner, teleport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the colour command, with or without its namespace.
const COLOR_COMMAND: &str = "portal_color";
/// Particle drawn when the configured colour list is empty.
const FALLBACK_COLOR: &str = "minecraft:blue_flame_particle";

// ─── Shared state ────────────────────────────────────────────────────────────

/// World mutation requested from a read-only event, run on the next tick.
#[derive(Debug, Clone)]
pub(crate) enum DeferredAction {
    OpenPortal { player: PlayerId, item: ItemStack },
    SetColor { player: PlayerId, index: usize },
}

impl DeferredAction {
    fn player(&self) -> PlayerId {
        match self {
            DeferredAction::OpenPortal { player, .. } | DeferredAction::SetColor { player, .. } => {
                *player
            }
        }
    }
}

/// Mutable engine state. Never borrowed across an await.
#[derive(Default)]
pub(crate) struct PortalState {
    pub registry: PortalRegistry,
    /// Tick until which each player is ignored by portals.
    pub cooldowns: HashMap<PlayerId, u64>,
    /// Moved by a portal and not yet seen outside every portal since.
    pub teleported: HashSet<PlayerId>,
    pub teleporting: HashSet<PlayerId>,
    /// Open request queued for the next tick.
    pub creating: HashSet<PlayerId>,
    pub leases: LeaseTable,
    pub deferred: Vec<DeferredAction>,
    pub capture_seq: u64,
}

impl PortalState {
    /// Expiry tick if the player's cooldown is still running at `now`.
    pub fn cooldown_until(&self, player: PlayerId, now: u64) -> Option<u64> {
        self.cooldowns
            .get(&player)
            .copied()
            .filter(|until| now < *until)
    }

    fn forget_player(&mut self, player: PlayerId) {
        self.registry.destroy_pair(player);
        self.cooldowns.remove(&player);
        self.teleported.remove(&player);
        self.teleporting.remove(&player);
        self.creating.remove(&player);
        self.deferred.retain(|action| action.player() != player);
    }
}

pub(crate) struct Shared<H: WorldHost> {
    pub host: Rc<H>,
    pub config: PortalConfig,
    pub non_solid: HashSet<String>,
    pub clock: TickClock,
    pub state: RefCell<PortalState>,
}

impl<H: WorldHost> Shared<H> {
    pub fn new(host: Rc<H>, config: PortalConfig) -> Self {
        let non_solid = config.non_solid_blocks.iter().cloned().collect();
        Self {
            host,
            config,
            non_solid,
            clock: TickClock::new(),
            state: RefCell::new(PortalState::default()),
        }
    }

    pub fn spatial(&self) -> Spatial<'_, H> {
        Spatial::new(self.host.as_ref(), &self.non_solid)
    }

    /// Final position for a portal whose chunk is resident.
    pub fn resolve_position(&self, record: &PortalRecord) -> Vec3 {
        self.settle(record.role, record.dimension, record.position)
    }

    /// Base portals search for a landing spot; field portals stay put.
    fn settle(&self, role: PortalRole, dimension: Dimension, position: Vec3) -> Vec3 {
        match role {
            PortalRole::Base => find_safe_location(
                &self.spatial(),
                dimension,
                position,
                self.config.search_radius,
                self.config.bed_search_radius,
            ),
            PortalRole::Field => position,
        }
    }

    /// Placement of a new portal, resolved at once if its chunk is resident.
    fn spawn(&self, role: PortalRole, dimension: Dimension, position: Vec3, facing: f32) -> PortalSpawn {
        let position = Vec3::new(position.x, (position.y + 0.2).round(), position.z);
        let resolved = self.spatial().is_chunk_resident(dimension, position);
        let position = if resolved {
            self.settle(role, dimension, position)
        } else {
            position
        };
        PortalSpawn {
            dimension,
            position,
            resolved,
            facing,
        }
    }
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct PortalService<H: WorldHost + 'static> {
    shared: Rc<Shared<H>>,
}

impl<H: WorldHost + 'static> PortalService<H> {
    pub fn new(host: Rc<H>, config: PortalConfig) -> Self {
        Self {
            shared: Rc::new(Shared::new(host, config)),
        }
    }

    pub fn host(&self) -> &H {
        self.shared.host.as_ref()
    }

    pub fn config(&self) -> &PortalConfig {
        &self.shared.config
    }

    pub fn current_tick(&self) -> u64 {
        self.shared.clock.now()
    }

    /// Advance one tick: wake suspended tasks, run deferred actions, then
    /// the scan and lease sweep when their intervals come up.
    pub fn tick(&self) {
        let now = self.shared.clock.advance();
        let deferred = std::mem::take(&mut self.shared.state.borrow_mut().deferred);
        for action in deferred {
            self.run_deferred(action);
        }
        if now % self.shared.config.scan_interval.max(1) == 0 {
            scanner::scan(&self.shared);
        }
        if now % self.shared.config.lease_sweep_interval.max(1) == 0 {
            sweep_leases(&self.shared);
        }
    }

    // -----------------------------------------------------------------------
    // Events
    // -----------------------------------------------------------------------

    pub fn handle_event(&self, event: HostEvent) -> EventResult {
        let now = self.current_tick();
        match event {
            HostEvent::Startup => {
                for dimension in Dimension::ALL {
                    if let Err(e) = self.host().clear_ticking_areas(dimension) {
                        warn!("Failed to clear ticking areas in {dimension}: {e}");
                    }
                }
                self.shared.state.borrow_mut().leases.clear();
                info!("Town portal engine v{VERSION} ready");
                EventResult::Continue
            }
            HostEvent::ItemUse { player, item } => self.on_item_use(player, item),
            HostEvent::PlayerSpawn { player, initial } => {
                if initial {
                    self.host()
                        .send_message(player, &format!("Town Portal System v{VERSION}"));
                }
                let mut state = self.shared.state.borrow_mut();
                state.teleported.insert(player);
                state
                    .cooldowns
                    .insert(player, now + self.shared.config.teleport_cooldown);
                EventResult::Continue
            }
            HostEvent::PlayerDeath { player } => {
                let mut state = self.shared.state.borrow_mut();
                state.teleported.insert(player);
                state
                    .cooldowns
                    .insert(player, now + self.shared.config.death_cooldown);
                EventResult::Continue
            }
            HostEvent::PlayerLeave { player } => {
                self.shared.state.borrow_mut().forget_player(player);
                debug!("Forgot portal state of {player}");
                EventResult::Continue
            }
            HostEvent::Command { player, name, args } => {
                if name.rsplit(':').next() != Some(COLOR_COMMAND) {
                    return EventResult::Continue;
                }
                let index = args.first().and_then(|a| a.parse::<i64>().ok()).unwrap_or(-1);
                if let Err(e) = self.set_color(player, index) {
                    self.host().send_message(player, &e.to_string());
                }
                EventResult::Cancelled
            }
        }
    }

    fn on_item_use(&self, player: PlayerId, item: ItemStack) -> EventResult {
        let config = &self.shared.config;
        if !config.is_scroll(&item.type_id) {
            return EventResult::Continue;
        }
        if self.shared.state.borrow().creating.contains(&player) {
            self.host()
                .send_message(player, &PortalError::CreationInProgress.to_string());
            return EventResult::Cancelled;
        }
        if self.host().item_cooldown(player, &config.scroll_cooldown_category) > 0 {
            return EventResult::Continue;
        }
        let mut state = self.shared.state.borrow_mut();
        state.creating.insert(player);
        state.deferred.push(DeferredAction::OpenPortal { player, item });
        EventResult::Continue
    }

    fn run_deferred(&self, action: DeferredAction) {
        match action {
            DeferredAction::OpenPortal { player, item } => {
                self.shared.state.borrow_mut().creating.remove(&player);
                match self.open(player, Some(&item)) {
                    Ok(_) => {}
                    Err(e) if e.is_player_facing() => {
                        self.host().send_message(player, &e.to_string());
                        let _ = self
                            .host()
                            .play_sound_to(player, &self.shared.config.error_sound);
                    }
                    Err(e) => debug!("Portal open for {player} abandoned: {e}"),
                }
            }
            DeferredAction::SetColor { player, index } => {
                self.host()
                    .set_dynamic_property(player, &self.shared.config.color_property, index as i64);
                self.host()
                    .send_message(player, &format!("Portal color set to index {index}."));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Open a portal pair for `player` right away, without consuming a scroll.
    ///
    /// Returns `None` when the player was sneaking, which closes their pair
    /// instead.
    pub fn open_portal(&self, player: PlayerId) -> Result<Option<LinkEntry>, PortalError> {
        self.open(player, None)
    }

    fn open(&self, player: PlayerId, item: Option<&ItemStack>) -> Result<Option<LinkEntry>, PortalError> {
        let config = &self.shared.config;
        let state = self
            .host()
            .player(player)
            .ok_or(HostError::PlayerOffline(player))?;
        let field_pos = field_spawn_point(&state, config.spawn_distance);
        let (home_dimension, home) = state.spawn_point.ok_or(PortalError::NoHome)?;
        if state.sneaking {
            self.close_portal(player);
            return Ok(None);
        }
        let base_pos = Vec3::new(home.x as f32 + 1.5, home.y as f32, home.z as f32);
        let home_center = Vec3::new(home.x as f32 + 0.5, home.y as f32, home.z as f32 + 0.5);
        if home_dimension == state.dimension
            && field_pos.distance_sq(&home_center) < config.home_distance_sq
        {
            return Err(PortalError::AlreadyHome);
        }

        self.close_portal(player);
        let attrs = PairAttributes {
            owner: player,
            color: self.color_for(player),
            created_at: self.current_tick(),
        };
        let field = self
            .shared
            .spawn(PortalRole::Field, state.dimension, field_pos, state.yaw);
        let base = self
            .shared
            .spawn(PortalRole::Base, home_dimension, base_pos, 0.0);
        let field_at = (field.dimension, field.position);
        let base_at = (base.dimension, base.position, base.resolved);
        let entry = self
            .shared
            .state
            .borrow_mut()
            .registry
            .create_pair(player, &attrs, field, base);
        info!(
            "{} opened a town portal at {} in {} to {} in {}",
            state.name, field_at.1, field_at.0, base_at.1, base_at.0
        );

        self.host().send_message(player, "Town Portal opened!");
        let _ = self
            .host()
            .play_sound(base_at.0, &config.create_sound, base_pos);
        let _ = self
            .host()
            .play_sound(field_at.0, &config.create_sound, field_at.1);
        if let Some(item) = item {
            if item.type_id == config.scroll_item && !state.creative {
                self.consume_scroll(player);
            }
        }
        if !base_at.2 {
            self.resolve_in_background(entry.base, base_at.0, base_at.1);
        }
        Ok(Some(entry))
    }

    fn consume_scroll(&self, player: PlayerId) {
        let Some(held) = self.host().held_item(player) else {
            return;
        };
        if held.type_id != self.shared.config.scroll_item {
            return;
        }
        let remaining = (held.amount > 1).then(|| ItemStack::new(held.type_id, held.amount - 1));
        if let Err(e) = self.host().set_held_item(player, remaining) {
            debug!("Could not consume scroll of {player}: {e}");
        }
    }

    /// Load the base portal's region and settle it once resident.
    fn resolve_in_background(&self, id: PortalId, dimension: Dimension, position: Vec3) {
        let shared = Rc::clone(&self.shared);
        tokio::task::spawn_local(async move {
            if !ensure_loaded(&shared, dimension, position).await {
                // The scanner resolves the record whenever the chunk does come in.
                debug!("{id} not loaded in time, leaving it to the scanner");
                return;
            }
            let record = shared.state.borrow().registry.get(id).cloned();
            let Some(record) = record.filter(|r| !r.resolved) else {
                return;
            };
            let settled = shared.resolve_position(&record);
            shared.state.borrow_mut().registry.resolve(id, settled);
            debug!("{id} settled at {settled} after load");
        });
    }

    /// Destroy `player`'s pair. Returns whether one existed.
    pub fn close_portal(&self, player: PlayerId) -> bool {
        let removed = self.shared.state.borrow_mut().registry.destroy_pair(player);
        if removed.is_empty() {
            return false;
        }
        info!("Closed town portal of {player}");
        true
    }

    /// Send `player` through `portal` as if they had walked into it.
    pub fn enter_portal(&self, player: PlayerId, portal: PortalId) -> Result<(), PortalError> {
        teleport::request(&self.shared, player, portal)
    }

    /// Validate a colour choice and store it on the next tick.
    pub fn set_color(&self, player: PlayerId, index: i64) -> Result<(), PortalError> {
        let count = self.shared.config.colors.len();
        let index = usize::try_from(index)
            .ok()
            .filter(|i| *i < count)
            .ok_or(PortalError::InvalidColor {
                max: count.saturating_sub(1),
            })?;
        self.shared
            .state
            .borrow_mut()
            .deferred
            .push(DeferredAction::SetColor { player, index });
        Ok(())
    }

    fn color_for(&self, player: PlayerId) -> String {
        let colors = &self.shared.config.colors;
        if colors.is_empty() {
            return FALLBACK_COLOR.to_string();
        }
        let index = match self
            .host()
            .dynamic_property(player, &self.shared.config.color_property)
        {
            Some(stored) => stored.rem_euclid(colors.len() as i64) as usize,
            None => player_hash(player) as usize % colors.len(),
        };
        colors[index].clone()
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn portal(&self, id: PortalId) -> Option<PortalRecord> {
        self.shared.state.borrow().registry.get(id).cloned()
    }

    /// `(field, base)` records of the player's open pair.
    pub fn pair(&self, player: PlayerId) -> Option<(PortalRecord, PortalRecord)> {
        let state = self.shared.state.borrow();
        let entry = state.registry.get_pair(player)?;
        Some((
            state.registry.get(entry.field)?.clone(),
            state.registry.get(entry.base)?.clone(),
        ))
    }

    pub fn portals(&self) -> Vec<PortalRecord> {
        self.shared.state.borrow().registry.records().cloned().collect()
    }

    pub fn cooldown_until(&self, player: PlayerId) -> Option<u64> {
        self.shared
            .state
            .borrow()
            .cooldown_until(player, self.current_tick())
    }

    pub fn is_teleported(&self, player: PlayerId) -> bool {
        self.shared.state.borrow().teleported.contains(&player)
    }

    pub fn is_teleporting(&self, player: PlayerId) -> bool {
        self.shared.state.borrow().teleporting.contains(&player)
    }

    pub fn lease_count(&self) -> usize {
        self.shared.state.borrow().leases.len()
    }

    /// Whether every record's link resolves to a complete pair.
    pub fn is_consistent(&self) -> bool {
        self.shared.state.borrow().registry.is_consistent()
    }
}

/// Where a field portal opens: `distance` blocks ahead of the player along
/// their horizontal look direction.
pub fn field_spawn_point(player: &PlayerState, distance: f32) -> Vec3 {
    let dir = player.view_direction;
    let horizontal = (dir.x * dir.x + dir.z * dir.z).sqrt();
    let (vx, vz) = if horizontal > 0.0 {
        (dir.x / horizontal, dir.z / horizontal)
    } else {
        (1.0, 1.0)
    };
    Vec3::new(
        player.position.x + vx * distance,
        player.position.y,
        player.position.z + vz * distance,
    )
}

/// Stable per-player colour seed: a 31-multiplier string hash of the id.
fn player_hash(player: PlayerId) -> u32 {
    player
        .0
        .to_string()
        .bytes()
        .fold(0i32, |acc, b| {
            (acc << 5).wrapping_sub(acc).wrapping_add(i32::from(b))
        })
        .unsigned_abs()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
