use serde::Deserialize;
use std::path::Path;
use town_portal_engine::PortalConfig;
use town_portal_sim::SimSettings;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSection,
    pub logging: LoggingSection,
    #[serde(default)]
    pub world: SimSettings,
    #[serde(default)]
    pub portal: PortalConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Milliseconds per game tick. Default: 50 (20 ticks per second).
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    /// Where player dynamic properties are kept between runs.
    #[serde(default = "default_properties_file")]
    pub properties_file: String,
}

fn default_tick_ms() -> u64 {
    50
}

fn default_properties_file() -> String {
    "player_properties.json".into()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            properties_file: default_properties_file(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingSection {
    pub level: String,
}

impl ServerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let toml_str = r#"
            [logging]
            level = "info"
        "#;
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.logging.level, "info");
        // server section defaults when absent
        assert_eq!(config.server.tick_ms, 50);
        assert_eq!(config.server.properties_file, "player_properties.json");
        // world section defaults when absent
        assert_eq!(config.world.ground_height, 64);
        assert_eq!(config.world.stream_delay_ticks, 20);
        // portal section defaults when absent
        assert_eq!(config.portal.capture_radius, 1.2);
        assert_eq!(config.portal.scroll_item, "town_portal:town_scroll");
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
            [server]
            tick_ms = 25
            properties_file = "props.json"

            [logging]
            level = "debug"

            [world]
            seed = 99
            ground_height = 70
            roughness = 2
            stream_delay_ticks = 40
            view_distance = 3

            [portal]
            teleport_cooldown = 60
            colors = ["town_portal:portal_blue"]
            non_solid_blocks = ["minecraft:air", "minecraft:glass"]
        "#;
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.tick_ms, 25);
        assert_eq!(config.server.properties_file, "props.json");
        assert_eq!(config.world.seed, 99);
        assert_eq!(config.world.roughness, 2);
        assert_eq!(config.world.view_distance, 3);
        assert_eq!(config.portal.teleport_cooldown, 60);
        assert_eq!(config.portal.colors.len(), 1);
        assert_eq!(config.portal.non_solid_blocks.len(), 2);
        // unspecified portal fields keep their defaults
        assert_eq!(config.portal.settle_delay, 10);
    }

    #[test]
    fn missing_logging_section_is_an_error() {
        assert!(toml::from_str::<ServerConfig>("[server]\ntick_ms = 50\n").is_err());
    }
}
