//! Items and container membership.

use crate::world::mobile::Serial;

/// Equipment slot identifier. Wire values follow the classic layer table;
/// only the slots the server actually touches get named constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layer(pub u8);

impl Layer {
    pub const ONE_HANDED: Layer = Layer(1);
    pub const TWO_HANDED: Layer = Layer(2);
    pub const SHOES: Layer = Layer(3);
    pub const PANTS: Layer = Layer(4);
    pub const SHIRT: Layer = Layer(5);
    pub const HELM: Layer = Layer(6);
    pub const GLOVES: Layer = Layer(7);
    pub const NECK: Layer = Layer(10);
    pub const HAIR: Layer = Layer(11);
    pub const WAIST: Layer = Layer(12);
    pub const TORSO: Layer = Layer(13);
    pub const BACKPACK: Layer = Layer(21);

    pub fn as_byte(self) -> u8 {
        self.0
    }
}

/// Where an item currently is. Exactly one of the three at any time; the
/// variants make double-registration unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemLocation {
    Ground { x: u16, y: u16, z: i8 },
    /// Inside a container, at a slot position within its gump.
    Contained { container: Serial, x: u16, y: u16 },
    Worn { mobile: Serial, layer: Layer },
}

#[derive(Debug, Clone)]
pub struct Item {
    pub serial: Serial,
    /// Graphic/template id.
    pub model: u16,
    pub hue: u16,
    pub amount: u16,
    pub name: String,
    pub location: ItemLocation,
    /// Some(gump id) marks the item as a container.
    pub container_gump: Option<u16>,
    /// Bumped on every mutation so clients can invalidate cached tooltips.
    pub revision: u32,
}

impl Item {
    pub fn new(serial: Serial, model: u16, name: impl Into<String>, location: ItemLocation) -> Self {
        Self {
            serial,
            model,
            hue: 0,
            amount: 1,
            name: name.into(),
            location,
            container_gump: None,
            revision: 0,
        }
    }

    pub fn container(
        serial: Serial,
        model: u16,
        name: impl Into<String>,
        location: ItemLocation,
    ) -> Self {
        let mut item = Self::new(serial, model, name, location);
        item.container_gump = Some(0x3C);
        item
    }

    pub fn is_container(&self) -> bool {
        self.container_gump.is_some()
    }

    pub fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_is_exclusive() {
        let mut item = Item::new(
            0x4000_0001,
            0x0F3F,
            "arrow",
            ItemLocation::Ground { x: 10, y: 20, z: 0 },
        );
        item.location = ItemLocation::Contained {
            container: 0x4000_0002,
            x: 1,
            y: 1,
        };
        // Reassigning the location fully replaces the old membership.
        assert!(matches!(item.location, ItemLocation::Contained { .. }));
    }

    #[test]
    fn test_container_constructor_sets_gump() {
        let pack = Item::container(
            0x4000_0002,
            0x0E75,
            "backpack",
            ItemLocation::Worn {
                mobile: 1,
                layer: Layer::BACKPACK,
            },
        );
        assert!(pack.is_container());
    }

    #[test]
    fn test_touch_bumps_revision() {
        let mut item = Item::new(
            0x4000_0001,
            0x0F3F,
            "arrow",
            ItemLocation::Ground { x: 0, y: 0, z: 0 },
        );
        item.touch();
        item.touch();
        assert_eq!(item.revision, 2);
    }
}
