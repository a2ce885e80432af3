//! Mobile entities: players and NPCs.

use std::collections::HashMap;

use crate::world::item::Layer;

/// Globally unique entity identifier, stable for the entity's lifetime.
pub type Serial = u32;

/// Facing of a mobile, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    North = 0,
    Northeast = 1,
    East = 2,
    Southeast = 3,
    South = 4,
    Southwest = 5,
    West = 6,
    Northwest = 7,
}

impl Direction {
    /// Decodes a wire direction byte. Bit 0x80 carries the running flag and
    /// is masked off here.
    pub fn from_byte(b: u8) -> Direction {
        match b & 0x07 {
            0 => Direction::North,
            1 => Direction::Northeast,
            2 => Direction::East,
            3 => Direction::Southeast,
            4 => Direction::South,
            5 => Direction::Southwest,
            6 => Direction::West,
            _ => Direction::Northwest,
        }
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// One-tile step offsets. North decreases y, East increases x.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::Northeast => (1, -1),
            Direction::East => (1, 0),
            Direction::Southeast => (1, 1),
            Direction::South => (0, 1),
            Direction::Southwest => (-1, 1),
            Direction::West => (-1, 0),
            Direction::Northwest => (-1, -1),
        }
    }
}

/// Allegiance/threat classification, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Notoriety {
    Innocent = 1,
    Ally = 2,
    Neutral = 3,
    Criminal = 4,
    Enemy = 5,
    Murderer = 6,
    Invulnerable = 7,
}

impl Notoriety {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterStatus {
    Normal,
    WarMode,
}

/// Player-controlled vs. scripted mobile. NPC behavior itself is an external
/// concern; only the template identity travels with the entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MobileKind {
    Player,
    Npc { template_id: u32 },
}

/// Any animate entity with position, stats and equipment.
#[derive(Debug, Clone)]
pub struct Mobile {
    pub serial: Serial,
    pub name: String,
    /// Body/model id shown by the client.
    pub body: u16,
    pub hue: u16,
    pub x: u16,
    pub y: u16,
    pub z: i8,
    pub direction: Direction,
    pub running: bool,
    pub notoriety: Notoriety,
    /// May go negative; death handling reacts to <= 0.
    pub hits: i32,
    pub max_hits: u16,
    pub status: CharacterStatus,
    pub kind: MobileKind,
    /// Layer -> worn item serial. At most one item per layer.
    equipment: HashMap<Layer, Serial>,
}

impl Mobile {
    pub fn new(serial: Serial, name: impl Into<String>, body: u16, x: u16, y: u16, z: i8) -> Self {
        Self {
            serial,
            name: name.into(),
            body,
            hue: 0,
            x,
            y,
            z,
            direction: Direction::South,
            running: false,
            notoriety: Notoriety::Innocent,
            hits: 100,
            max_hits: 100,
            status: CharacterStatus::Normal,
            kind: MobileKind::Player,
            equipment: HashMap::new(),
        }
    }

    pub fn is_npc(&self) -> bool {
        matches!(self.kind, MobileKind::Npc { .. })
    }

    pub fn in_war_mode(&self) -> bool {
        self.status == CharacterStatus::WarMode
    }

    /// Direction byte with the running flag folded in (wire form).
    pub fn direction_with_running(&self) -> u8 {
        let mut b = self.direction.as_byte();
        if self.running {
            b |= 0x80;
        }
        b
    }

    /// Puts `item` on `layer`, returning the serial it displaced, if any.
    pub fn set_item_on_layer(&mut self, layer: Layer, item: Serial) -> Option<Serial> {
        self.equipment.insert(layer, item)
    }

    /// Unequips `item` from whatever layer holds it. Returns true if it was
    /// actually worn.
    pub fn remove_item(&mut self, item: Serial) -> bool {
        let layer = self
            .equipment
            .iter()
            .find(|(_, worn)| **worn == item)
            .map(|(layer, _)| *layer);
        match layer {
            Some(layer) => {
                self.equipment.remove(&layer);
                true
            }
            None => false,
        }
    }

    pub fn item_on_layer(&self, layer: Layer) -> Option<Serial> {
        self.equipment.get(&layer).copied()
    }

    pub fn equipment(&self) -> impl Iterator<Item = (Layer, Serial)> + '_ {
        self.equipment.iter().map(|(layer, item)| (*layer, *item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_from_byte_masks_running_flag() {
        assert_eq!(Direction::from_byte(0x82), Direction::East);
        assert_eq!(Direction::from_byte(0x00), Direction::North);
        assert_eq!(Direction::from_byte(0x07), Direction::Northwest);
    }

    #[test]
    fn test_direction_offsets() {
        assert_eq!(Direction::North.offset(), (0, -1));
        assert_eq!(Direction::East.offset(), (1, 0));
        assert_eq!(Direction::Southwest.offset(), (-1, 1));
    }

    #[test]
    fn test_one_item_per_layer() {
        let mut mob = Mobile::new(1, "Iolo", 0x190, 100, 100, 0);
        assert_eq!(mob.set_item_on_layer(Layer::TORSO, 0x4000_0001), None);
        // A second item on the same layer displaces the first.
        assert_eq!(
            mob.set_item_on_layer(Layer::TORSO, 0x4000_0002),
            Some(0x4000_0001)
        );
        assert_eq!(mob.item_on_layer(Layer::TORSO), Some(0x4000_0002));
    }

    #[test]
    fn test_remove_item_finds_layer() {
        let mut mob = Mobile::new(1, "Iolo", 0x190, 100, 100, 0);
        mob.set_item_on_layer(Layer::HELM, 0x4000_0003);
        assert!(mob.remove_item(0x4000_0003));
        assert!(!mob.remove_item(0x4000_0003));
        assert_eq!(mob.item_on_layer(Layer::HELM), None);
    }

    #[test]
    fn test_direction_with_running() {
        let mut mob = Mobile::new(1, "Shamino", 0x190, 10, 10, 0);
        mob.direction = Direction::East;
        assert_eq!(mob.direction_with_running(), 0x02);
        mob.running = true;
        assert_eq!(mob.direction_with_running(), 0x82);
    }
}
