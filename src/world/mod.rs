//! In-memory world registries.
//!
//! Mobiles, items and the tile map are owned here and looked up by serial id.
//! The session/controller layer never holds entity references of its own; it
//! goes through these lookups every time, which keeps a single source of
//! truth for container membership and equipment.

pub mod item;
pub mod mobile;

use std::collections::HashMap;

use crate::config::ServerConfig;
use crate::world::item::{Item, ItemLocation, Layer};
use crate::world::mobile::{Mobile, MobileKind, Serial};

#[derive(Debug, Clone, Copy)]
pub struct MapTile {
    pub z: i8,
}

/// Terrain heights: a flat default plus sparse per-tile overrides.
#[derive(Debug, Clone)]
pub struct TileMap {
    width: u16,
    height: u16,
    default_z: i8,
    overrides: HashMap<(u16, u16), i8>,
}

impl TileMap {
    pub fn new(width: u16, height: u16, default_z: i8) -> Self {
        Self {
            width,
            height,
            default_z,
            overrides: HashMap::new(),
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn tile(&self, x: u16, y: u16) -> MapTile {
        MapTile {
            z: self
                .overrides
                .get(&(x, y))
                .copied()
                .unwrap_or(self.default_z),
        }
    }

    pub fn set_height(&mut self, x: u16, y: u16, z: i8) {
        self.overrides.insert((x, y), z);
    }
}

pub struct World {
    mobiles: HashMap<Serial, Mobile>,
    items: HashMap<Serial, Item>,
    pub map: TileMap,
}

impl World {
    pub fn new(map: TileMap) -> Self {
        Self {
            mobiles: HashMap::new(),
            items: HashMap::new(),
            map,
        }
    }

    /// Builds the world from the configuration fixture. Entries referencing
    /// unknown serials are skipped with a warning rather than aborting boot.
    pub fn from_config(config: &ServerConfig) -> Self {
        let map = TileMap::new(config.map_width, config.map_height, config.default_tile_z);
        let mut world = World::new(map);

        for account in &config.accounts {
            for ch in &account.characters {
                let mut mob = Mobile::new(ch.serial, ch.name.clone(), ch.body, ch.x, ch.y, ch.z);
                mob.hue = ch.hue;
                mob.hits = i32::from(ch.hits);
                mob.max_hits = ch.hits;
                world.add_mobile(mob);
            }
        }
        for npc in &config.npcs {
            let mut mob = Mobile::new(npc.serial, npc.name.clone(), npc.body, npc.x, npc.y, npc.z);
            mob.kind = MobileKind::Npc {
                template_id: npc.template_id,
            };
            mob.hits = i32::from(npc.hits);
            mob.max_hits = npc.hits;
            world.add_mobile(mob);
        }
        for entry in &config.items {
            let location = if let Some(container) = entry.container {
                if world.items.contains_key(&container) {
                    ItemLocation::Contained {
                        container,
                        x: entry.x,
                        y: entry.y,
                    }
                } else {
                    tracing::warn!(
                        "[world] [fixture] item {:08X} references unknown container {:08X}, skipped",
                        entry.serial,
                        container
                    );
                    continue;
                }
            } else if let (Some(mobile), Some(layer)) = (entry.worn_by, entry.layer) {
                if !world.mobiles.contains_key(&mobile) {
                    tracing::warn!(
                        "[world] [fixture] item {:08X} references unknown mobile {:08X}, skipped",
                        entry.serial,
                        mobile
                    );
                    continue;
                }
                ItemLocation::Worn {
                    mobile,
                    layer: Layer(layer),
                }
            } else {
                ItemLocation::Ground {
                    x: entry.x,
                    y: entry.y,
                    z: entry.z,
                }
            };

            let mut item = Item::new(entry.serial, entry.model, entry.name.clone(), location);
            item.hue = entry.hue;
            item.amount = entry.amount;
            if entry.container_gump.is_some() {
                item.container_gump = entry.container_gump;
            }
            if let ItemLocation::Worn { mobile, layer } = item.location {
                if let Some(mob) = world.mobiles.get_mut(&mobile) {
                    mob.set_item_on_layer(layer, item.serial);
                }
            }
            world.add_item(item);
        }
        world
    }

    pub fn add_mobile(&mut self, mobile: Mobile) {
        self.mobiles.insert(mobile.serial, mobile);
    }

    pub fn add_item(&mut self, item: Item) {
        self.items.insert(item.serial, item);
    }

    pub fn find_mobile(&self, serial: Serial) -> Option<&Mobile> {
        self.mobiles.get(&serial)
    }

    pub fn find_mobile_mut(&mut self, serial: Serial) -> Option<&mut Mobile> {
        self.mobiles.get_mut(&serial)
    }

    pub fn find_item(&self, serial: Serial) -> Option<&Item> {
        self.items.get(&serial)
    }

    pub fn find_item_mut(&mut self, serial: Serial) -> Option<&mut Item> {
        self.items.get_mut(&serial)
    }

    /// The container currently holding `item`, if any.
    pub fn find_container_of(&self, item: Serial) -> Option<Serial> {
        match self.items.get(&item)?.location {
            ItemLocation::Contained { container, .. } => Some(container),
            _ => None,
        }
    }

    pub fn container_contents(&self, container: Serial) -> Vec<&Item> {
        self.items
            .values()
            .filter(|item| {
                matches!(item.location, ItemLocation::Contained { container: c, .. } if c == container)
            })
            .collect()
    }

    /// Ground items within `range` tiles (chebyshev) of `center`.
    pub fn items_in_region(&self, center: Serial, range: u16) -> Vec<&Item> {
        let Some(mob) = self.mobiles.get(&center) else {
            return Vec::new();
        };
        self.items
            .values()
            .filter(|item| match item.location {
                ItemLocation::Ground { x, y, .. } => {
                    x.abs_diff(mob.x) <= range && y.abs_diff(mob.y) <= range
                }
                _ => false,
            })
            .collect()
    }

    pub fn place_in_container(&mut self, item: Serial, container: Serial, x: u16, y: u16) {
        if let Some(item) = self.items.get_mut(&item) {
            item.location = ItemLocation::Contained { container, x, y };
            item.touch();
        }
    }

    pub fn place_on_ground(&mut self, item: Serial, x: u16, y: u16, z: i8) {
        if let Some(item) = self.items.get_mut(&item) {
            item.location = ItemLocation::Ground { x, y, z };
            item.touch();
        }
    }

    pub fn set_worn(&mut self, item: Serial, mobile: Serial, layer: Layer) {
        if let Some(item) = self.items.get_mut(&item) {
            item.location = ItemLocation::Worn { mobile, layer };
            item.touch();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_world() -> World {
        let mut world = World::new(TileMap::new(7168, 4096, 0));
        world.add_mobile(Mobile::new(1, "Dupre", 0x190, 100, 100, 0));
        world.add_item(Item::container(
            0x4000_0001,
            0x0E75,
            "backpack",
            ItemLocation::Worn {
                mobile: 1,
                layer: Layer::BACKPACK,
            },
        ));
        world.add_item(Item::new(
            0x4000_0002,
            0x0F3F,
            "arrow",
            ItemLocation::Contained {
                container: 0x4000_0001,
                x: 10,
                y: 10,
            },
        ));
        world
    }

    #[test]
    fn test_tile_override() {
        let mut map = TileMap::new(100, 100, 0);
        map.set_height(5, 5, 12);
        assert_eq!(map.tile(5, 5).z, 12);
        assert_eq!(map.tile(6, 5).z, 0);
    }

    #[test]
    fn test_container_membership_is_exclusive() {
        let mut world = test_world();
        world.add_item(Item::container(
            0x4000_0003,
            0x0E75,
            "pouch",
            ItemLocation::Ground { x: 99, y: 99, z: 0 },
        ));

        assert_eq!(world.find_container_of(0x4000_0002), Some(0x4000_0001));
        world.place_in_container(0x4000_0002, 0x4000_0003, 1, 1);
        assert_eq!(world.find_container_of(0x4000_0002), Some(0x4000_0003));
        assert!(world.container_contents(0x4000_0001).is_empty());
        assert_eq!(world.container_contents(0x4000_0003).len(), 1);
    }

    #[test]
    fn test_items_in_region_filters_ground_only() {
        let mut world = test_world();
        world.add_item(Item::new(
            0x4000_0004,
            0x0F3F,
            "arrow",
            ItemLocation::Ground {
                x: 103,
                y: 101,
                z: 0,
            },
        ));
        world.add_item(Item::new(
            0x4000_0005,
            0x0F3F,
            "arrow",
            ItemLocation::Ground {
                x: 150,
                y: 100,
                z: 0,
            },
        ));
        let nearby = world.items_in_region(1, 20);
        assert_eq!(nearby.len(), 1);
        assert_eq!(nearby[0].serial, 0x4000_0004);
    }

    #[test]
    fn test_place_on_ground_bumps_revision() {
        let mut world = test_world();
        let before = world.find_item(0x4000_0002).unwrap().revision;
        world.place_on_ground(0x4000_0002, 101, 101, 0);
        assert_eq!(world.find_item(0x4000_0002).unwrap().revision, before + 1);
    }
}
