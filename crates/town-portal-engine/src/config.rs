//! Engine tuning: timings, radii, item ids and the cosmetic catalogue.
//!
//! Every field has a default, so an empty `[portal]` table (or none at all)
//! yields the stock behaviour.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    /// Ticks between collision scans.
    #[serde(default = "default_scan_interval")]
    pub scan_interval: u64,
    /// Horizontal-and-vertical distance at which a player counts as inside a portal.
    #[serde(default = "default_capture_radius")]
    pub capture_radius: f32,
    /// Ticks a player is ignored by portals after a teleport.
    #[serde(default = "default_teleport_cooldown")]
    pub teleport_cooldown: u64,
    /// Cooldown applied on death, long enough to outlast the respawn screen.
    #[serde(default = "default_death_cooldown")]
    pub death_cooldown: u64,
    /// Ticks between the corrected teleport and the final re-teleport.
    #[serde(default = "default_settle_delay")]
    pub settle_delay: u64,
    /// Spacing of chunk residency polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
    /// Poll attempts before `ensure_loaded` gives up waiting.
    #[serde(default = "default_max_load_attempts")]
    pub max_load_attempts: u32,
    #[serde(default = "default_lease_sweep_interval")]
    pub lease_sweep_interval: u64,
    /// Idle ticks after which a keep-alive lease is released.
    #[serde(default = "default_lease_idle_ticks")]
    pub lease_idle_ticks: u64,
    /// Chunk radius of the keep-alive area behind each lease.
    #[serde(default = "default_lease_radius")]
    pub lease_radius: u32,
    /// Radius scanned for leashed and ridden companions.
    #[serde(default = "default_companion_radius")]
    pub companion_radius: f32,
    /// Chebyshev radius of the safe-location ring search.
    #[serde(default = "default_search_radius")]
    pub search_radius: i32,
    /// Cube radius scanned for a bed or respawn anchor.
    #[serde(default = "default_bed_search_radius")]
    pub bed_search_radius: i32,
    /// Distance in front of the player at which the field portal opens.
    #[serde(default = "default_spawn_distance")]
    pub spawn_distance: f32,
    /// Squared distance from home under which opening is refused.
    #[serde(default = "default_home_distance_sq")]
    pub home_distance_sq: f32,

    /// Scroll consumed on use.
    #[serde(default = "default_scroll_item")]
    pub scroll_item: String,
    /// Scroll kept on use.
    #[serde(default = "default_permanent_scroll_item")]
    pub permanent_scroll_item: String,
    #[serde(default = "default_scroll_cooldown_category")]
    pub scroll_cooldown_category: String,
    #[serde(default = "default_color_property")]
    pub color_property: String,

    /// Particle ids, one per selectable colour.
    #[serde(default = "default_colors")]
    pub colors: Vec<String>,
    #[serde(default = "default_create_sound")]
    pub create_sound: String,
    #[serde(default = "default_teleport_sound")]
    pub teleport_sound: String,
    #[serde(default = "default_error_sound")]
    pub error_sound: String,
    #[serde(default = "default_teleport_particle")]
    pub teleport_particle: String,

    /// Block types that never count as ground, whatever their physics say.
    #[serde(default = "default_non_solid_blocks")]
    pub non_solid_blocks: Vec<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            scan_interval: default_scan_interval(),
            capture_radius: default_capture_radius(),
            teleport_cooldown: default_teleport_cooldown(),
            death_cooldown: default_death_cooldown(),
            settle_delay: default_settle_delay(),
            poll_interval: default_poll_interval(),
            max_load_attempts: default_max_load_attempts(),
            lease_sweep_interval: default_lease_sweep_interval(),
            lease_idle_ticks: default_lease_idle_ticks(),
            lease_radius: default_lease_radius(),
            companion_radius: default_companion_radius(),
            search_radius: default_search_radius(),
            bed_search_radius: default_bed_search_radius(),
            spawn_distance: default_spawn_distance(),
            home_distance_sq: default_home_distance_sq(),
            scroll_item: default_scroll_item(),
            permanent_scroll_item: default_permanent_scroll_item(),
            scroll_cooldown_category: default_scroll_cooldown_category(),
            color_property: default_color_property(),
            colors: default_colors(),
            create_sound: default_create_sound(),
            teleport_sound: default_teleport_sound(),
            error_sound: default_error_sound(),
            teleport_particle: default_teleport_particle(),
            non_solid_blocks: default_non_solid_blocks(),
        }
    }
}

impl PortalConfig {
    pub fn is_scroll(&self, type_id: &str) -> bool {
        type_id == self.scroll_item || type_id == self.permanent_scroll_item
    }
}

fn default_scan_interval() -> u64 {
    4
}

fn default_capture_radius() -> f32 {
    1.2
}

fn default_teleport_cooldown() -> u64 {
    40
}

fn default_death_cooldown() -> u64 {
    10_000
}

fn default_settle_delay() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    5
}

fn default_max_load_attempts() -> u32 {
    100
}

fn default_lease_sweep_interval() -> u64 {
    100
}

fn default_lease_idle_ticks() -> u64 {
    600
}

fn default_lease_radius() -> u32 {
    2
}

fn default_companion_radius() -> f32 {
    12.0
}

fn default_search_radius() -> i32 {
    5
}

fn default_bed_search_radius() -> i32 {
    3
}

fn default_spawn_distance() -> f32 {
    2.0
}

fn default_home_distance_sq() -> f32 {
    100.0
}

fn default_scroll_item() -> String {
    "town_portal:town_scroll".into()
}

fn default_permanent_scroll_item() -> String {
    "town_portal:town_scroll_permanent".into()
}

fn default_scroll_cooldown_category() -> String {
    "scroll".into()
}

fn default_color_property() -> String {
    "town_portal:portal_color_index".into()
}

fn default_colors() -> Vec<String> {
    ["blue", "green", "red", "yellow"]
        .iter()
        .map(|c| format!("town_portal:portal_{c}"))
        .collect()
}

fn default_create_sound() -> String {
    "town_portal.portal_create".into()
}

fn default_teleport_sound() -> String {
    "town_portal.portal_teleport".into()
}

fn default_error_sound() -> String {
    "note.bass".into()
}

fn default_teleport_particle() -> String {
    "town_portal:teleport".into()
}

fn default_non_solid_blocks() -> Vec<String> {
    [
        "air",
        "structure_void",
        "light_block",
        // vegetation
        "grass",
        "tallgrass",
        "short_grass",
        "fern",
        "large_fern",
        "deadbush",
        "yellow_flower",
        "red_flower",
        "torchflower",
        "pink_petals",
        "sugar_cane",
        "reeds",
        "sapling",
        "bamboo_sapling",
        "brown_mushroom",
        "red_mushroom",
        "crimson_fungus",
        "warped_fungus",
        "crimson_roots",
        "warped_roots",
        "nether_sprouts",
        "wheat",
        "carrots",
        "potatoes",
        "beetroot",
        "sweet_berry_bush",
        "vine",
        "ladder",
        "glow_lichen",
        "sculk_vein",
        "hanging_roots",
        "cave_vines",
        // redstone
        "redstone_wire",
        "repeater",
        "comparator",
        "lever",
        "torch",
        "soul_torch",
        "redstone_torch",
        "tripwire",
        "tripwire_hook",
        "string",
        "stone_button",
        "wooden_button",
        // overlays
        "carpet",
        "moss_carpet",
        "snow_layer",
        // rails
        "rail",
        "golden_rail",
        "detector_rail",
        "activator_rail",
    ]
    .iter()
    .map(|b| format!("minecraft:{b}"))
    .collect()
}
