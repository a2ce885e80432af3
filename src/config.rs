//! Server configuration module
//!
//! Parses and manages server configuration from YAML files. Besides the
//! listener settings this also carries the world fixture (accounts,
//! characters, npcs, items). The persistent world store is an external
//! collaborator, so the in-memory world is seeded from here.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    // ============================================
    // Game Server Configuration
    // ============================================
    /// Public IP address clients are redirected to after server select
    pub game_ip: String,

    #[serde(default = "default_game_port")]
    pub game_port: u16,

    /// Shard name shown in the server list
    #[serde(default = "default_world_name")]
    pub world_name: String,

    // ============================================
    // Map
    // ============================================
    #[serde(default = "default_map_width")]
    pub map_width: u16,

    #[serde(default = "default_map_height")]
    pub map_height: u16,

    #[serde(default)]
    pub default_tile_z: i8,

    // ============================================
    // Combat
    // ============================================
    /// Swing/bookkeeping tick interval in milliseconds
    #[serde(default = "default_combat_tick_ms")]
    pub combat_tick_ms: u64,

    // ============================================
    // World Fixture
    // ============================================
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,

    #[serde(default)]
    pub npcs: Vec<NpcConfig>,

    #[serde(default)]
    pub items: Vec<ItemConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    pub user: String,
    pub password: String,
    #[serde(default)]
    pub characters: Vec<CharacterConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterConfig {
    pub serial: u32,
    pub name: String,
    #[serde(default = "default_body")]
    pub body: u16,
    #[serde(default)]
    pub hue: u16,
    pub x: u16,
    pub y: u16,
    #[serde(default)]
    pub z: i8,
    #[serde(default = "default_hits")]
    pub hits: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NpcConfig {
    pub serial: u32,
    pub name: String,
    pub body: u16,
    pub template_id: u32,
    pub x: u16,
    pub y: u16,
    #[serde(default)]
    pub z: i8,
    #[serde(default = "default_hits")]
    pub hits: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemConfig {
    pub serial: u32,
    pub model: u16,
    pub name: String,
    #[serde(default)]
    pub hue: u16,
    #[serde(default = "default_amount")]
    pub amount: u16,
    /// Present marks the item as a container with that gump id.
    #[serde(default)]
    pub container_gump: Option<u16>,
    /// Ground/slot coordinates, meaning depends on placement.
    #[serde(default)]
    pub x: u16,
    #[serde(default)]
    pub y: u16,
    #[serde(default)]
    pub z: i8,
    /// Containing item's serial; wins over ground placement.
    #[serde(default)]
    pub container: Option<u32>,
    /// Wearing mobile's serial; requires `layer`.
    #[serde(default)]
    pub worn_by: Option<u32>,
    #[serde(default)]
    pub layer: Option<u8>,
}

fn default_game_port() -> u16 {
    2593
}

fn default_world_name() -> String {
    "Sosaria".to_string()
}

fn default_map_width() -> u16 {
    7168
}

fn default_map_height() -> u16 {
    4096
}

fn default_combat_tick_ms() -> u64 {
    1000
}

fn default_body() -> u16 {
    0x190
}

fn default_hits() -> u16 {
    100
}

fn default_amount() -> u16 {
    1
}

impl ServerConfig {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ServerConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML in {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string
    ///
    /// Useful for testing
    pub fn from_str(contents: &str) -> Result<Self> {
        let config: ServerConfig =
            serde_yaml::from_str(contents).context("Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.game_ip.is_empty(), "game_ip cannot be empty");
        anyhow::ensure!(self.combat_tick_ms > 0, "combat_tick_ms cannot be zero");

        let mut serials = HashSet::new();
        for account in &self.accounts {
            anyhow::ensure!(!account.user.is_empty(), "account user cannot be empty");
            for ch in &account.characters {
                anyhow::ensure!(
                    serials.insert(ch.serial),
                    "duplicate mobile serial {:08X}",
                    ch.serial
                );
            }
        }
        for npc in &self.npcs {
            anyhow::ensure!(
                serials.insert(npc.serial),
                "duplicate mobile serial {:08X}",
                npc.serial
            );
        }
        let mut item_serials = HashSet::new();
        for item in &self.items {
            anyhow::ensure!(
                item_serials.insert(item.serial),
                "duplicate item serial {:08X}",
                item.serial
            );
        }
        Ok(())
    }

    /// Minimal config for unit and integration tests: one account with one
    /// character and a worn backpack holding one item.
    pub fn test_only() -> Self {
        ServerConfig::from_str(
            r#"
game_ip: 127.0.0.1
game_port: 2593
accounts:
  - user: avatar
    password: secret
    characters:
      - serial: 1
        name: Avatar
        x: 100
        y: 100
items:
  - serial: 1073741825
    model: 3701
    name: backpack
    container_gump: 60
    worn_by: 1
    layer: 21
  - serial: 1073741826
    model: 3903
    name: arrow
    container: 1073741825
    x: 10
    y: 10
"#,
        )
        .expect("test config must parse")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_parses_with_defaults() {
        let config = ServerConfig::from_str("game_ip: 10.0.0.1").unwrap();
        assert_eq!(config.game_port, 2593);
        assert_eq!(config.world_name, "Sosaria");
        assert_eq!(config.map_width, 7168);
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn test_empty_game_ip_rejected() {
        assert!(ServerConfig::from_str("game_ip: \"\"").is_err());
    }

    #[test]
    fn test_duplicate_serial_rejected() {
        let yaml = r#"
game_ip: 127.0.0.1
accounts:
  - user: a
    password: p
    characters:
      - { serial: 7, name: One, x: 0, y: 0 }
      - { serial: 7, name: Two, x: 0, y: 0 }
"#;
        assert!(ServerConfig::from_str(yaml).is_err());
    }

    #[test]
    fn test_fixture_round_trip() {
        let config = ServerConfig::test_only();
        assert_eq!(config.accounts.len(), 1);
        assert_eq!(config.accounts[0].characters[0].serial, 1);
        assert_eq!(config.items[0].container_gump, Some(60));
    }
}
