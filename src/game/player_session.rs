//! Per-player session state machine.
//!
//! One of these exists per authenticated connection, from game login until
//! disconnect. It owns the session-local derived state (visible mobiles, who
//! this player attacks, who attacks them) and nothing else; mobiles and
//! items stay in the world registries and are reached by serial.
//!
//! Every `on_*` method is a broadcast handler: the bus delivers each
//! notification to every session and the handlers decide relevance
//! themselves (self-suppression, point-to-point addressing).

use std::collections::HashSet;

use crate::game::bus::{InterClientNetwork, Notification};
use crate::game::combat::CombatSystem;
use crate::network::ClientChannel;
use crate::protocol::{ContainedItem, Message, MobileSnapshot};
use crate::servers::game::auth::Account;
use crate::world::item::{ItemLocation, Layer};
use crate::world::mobile::{CharacterStatus, Direction, Serial};
use crate::world::World;

const ANIM_ATTACK: u16 = 9;
const ANIM_GET_HIT: u16 = 20;

pub struct PlayerSession {
    account: Account,
    mobile: Option<Serial>,
    mobiles_in_range: HashSet<Serial>,
    attacking: Option<Serial>,
    attacking_me: HashSet<Serial>,
    client: ClientChannel,
}

impl PlayerSession {
    pub fn new(account: Account, client: ClientChannel) -> Self {
        Self {
            account,
            mobile: None,
            mobiles_in_range: HashSet::new(),
            attacking: None,
            attacking_me: HashSet::new(),
            client,
        }
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    pub fn mobile(&self) -> Option<Serial> {
        self.mobile
    }

    pub fn attacking(&self) -> Option<Serial> {
        self.attacking
    }

    pub fn is_attacked_by(&self, serial: Serial) -> bool {
        self.attacking_me.contains(&serial)
    }

    pub fn sees(&self, serial: Serial) -> bool {
        self.mobiles_in_range.contains(&serial)
    }

    pub fn character_names(&self, world: &World) -> Vec<String> {
        self.account
            .characters
            .iter()
            .filter_map(|serial| world.find_mobile(*serial))
            .map(|mob| mob.name.clone())
            .collect()
    }

    /// Binds the slot-selected character to this session. Returns the serial
    /// on success.
    pub fn select_character(&mut self, slot: u32, world: &World) -> Option<Serial> {
        let serial = *self.account.characters.get(slot as usize)?;
        world.find_mobile(serial)?;
        self.mobile = Some(serial);
        Some(serial)
    }

    // ======================== movement ========================

    /// Applies a movement request that already passed sequence validation.
    ///
    /// Requesting the current facing only turns in place (no positional
    /// step); a different direction steps one tile that way. Either way the
    /// mobile's z snaps to the terrain height afterwards and exactly one
    /// movement broadcast goes out.
    pub fn move_mobile(
        &mut self,
        direction: Direction,
        running: bool,
        world: &mut World,
        bus: &mut InterClientNetwork,
    ) {
        let Some(serial) = self.mobile else { return };
        let (width, height) = (world.map.width(), world.map.height());
        let Some(mob) = world.find_mobile_mut(serial) else {
            return;
        };

        let stepping = direction != mob.direction;
        mob.direction = direction;
        mob.running = running;
        if stepping {
            let (dx, dy) = direction.offset();
            mob.x = (i32::from(mob.x) + dx).clamp(0, i32::from(width) - 1) as u16;
            mob.y = (i32::from(mob.y) + dy).clamp(0, i32::from(height) - 1) as u16;
        }
        let (x, y) = (mob.x, mob.y);
        let z = world.map.tile(x, y).z;
        if let Some(mob) = world.find_mobile_mut(serial) {
            mob.z = z;
        }
        bus.notify_other_mobile_movement(serial);
    }

    fn on_other_mobile_movement(
        &mut self,
        moving: Serial,
        world: &World,
        bus: &mut InterClientNetwork,
    ) {
        let Some(own) = self.mobile else { return };
        if moving == own {
            return; // ignore self-notifying messages
        }
        if !self.mobiles_in_range.contains(&moving) {
            self.on_entered_range(moving, own, world);
            // Instruct the moving mobile's session to register us too.
            bus.notify_entered_range(own, moving);
        }
        if let Some(snap) = snapshot(world, moving) {
            self.client.send(Message::UpdatePlayer(snap));
        }
    }

    fn on_entered_range(&mut self, entered: Serial, target: Serial, world: &World) {
        let Some(own) = self.mobile else { return };
        if target != own {
            return; // point-to-point semantics
        }
        self.mobiles_in_range.insert(entered);
        if let Some(snap) = snapshot(world, entered) {
            self.client.send(Message::CharacterDraw(snap));
        }
    }

    // ======================== speech ========================

    /// Publishes speech to the bus only. Delivery to the local client happens
    /// in [`Self::on_other_mobile_speech`], which runs for the speaker too,
    /// unlike movement, so players hear their own words.
    pub fn speak(
        &self,
        kind: u8,
        hue: u16,
        font: u16,
        language: String,
        text: String,
        bus: &mut InterClientNetwork,
    ) {
        let Some(own) = self.mobile else { return };
        bus.notify_mobile_speech(own, kind, hue, font, language, text);
    }

    #[allow(clippy::too_many_arguments)]
    fn on_other_mobile_speech(
        &self,
        speaker: Serial,
        kind: u8,
        hue: u16,
        font: u16,
        language: &str,
        text: &str,
        world: &World,
    ) {
        let Some(mob) = world.find_mobile(speaker) else {
            return;
        };
        self.client.send(Message::UnicodeSpeech {
            serial: speaker,
            body: mob.body,
            kind,
            hue,
            font,
            language: language.to_string(),
            name: mob.name.clone(),
            text: text.to_string(),
        });
    }

    // ======================== items ========================

    /// Moves an item: off the body if worn, out of its current container,
    /// then into the target container or onto the ground.
    #[allow(clippy::too_many_arguments)]
    pub fn drop_item(
        &mut self,
        item: Serial,
        dropped_on_ground: bool,
        target_container: Serial,
        x: u16,
        y: u16,
        z: i8,
        world: &mut World,
        bus: &mut InterClientNetwork,
    ) {
        let Some(own) = self.mobile else { return };
        if world.find_item(item).is_none() {
            tracing::warn!("[session] drop of unknown item {:08X}, ignored", item);
            return;
        }
        if !dropped_on_ground
            && !world
                .find_item(target_container)
                .is_some_and(|target| target.is_container())
        {
            tracing::warn!(
                "[session] drop into non-container {:08X}, ignored",
                target_container
            );
            return;
        }

        let was_worn = world
            .find_mobile_mut(own)
            .is_some_and(|mob| mob.remove_item(item));
        if was_worn {
            bus.notify_dropped_cloth(own, item);
        }

        if let Some(source) = world.find_container_of(item) {
            bus.notify_container_changed(source);
        }

        if dropped_on_ground {
            world.place_on_ground(item, x, y, z);
            // Container serial 0 means "no container" on the wire.
            bus.notify_item_dropped(own, item, 0, x, y, z);
        } else {
            world.place_in_container(item, target_container, x, y);
            bus.notify_container_changed(target_container);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn on_item_dropped(
        &self,
        dropping: Serial,
        item: Serial,
        container: Serial,
        x: u16,
        y: u16,
        z: i8,
        world: &World,
    ) {
        let Some(own) = self.mobile else { return };
        let Some(dropped) = world.find_item(item) else {
            return;
        };
        if dropping != own {
            let (sx, sy, sz) = match world.find_mobile(dropping) {
                Some(mob) => (mob.x, mob.y, mob.z),
                None => (x, y, z),
            };
            self.client.send(Message::DragItem {
                model: dropped.model,
                hue: dropped.hue,
                amount: dropped.amount,
                source: dropping,
                source_x: sx,
                source_y: sy,
                source_z: sz,
                target: container,
                target_x: x,
                target_y: y,
                target_z: z,
            });
        }
        self.client.send(Message::ObjectInfo {
            serial: item,
            model: dropped.model,
            amount: dropped.amount,
            x,
            y,
            z,
        });
        self.client.send(Message::ObjectRevision {
            serial: item,
            revision: dropped.revision,
        });
    }

    /// Equips an item, displacing any prior occupant of the layer to the
    /// ground at the wearer's feet.
    pub fn wear_item(
        &mut self,
        layer: Layer,
        item: Serial,
        world: &mut World,
        bus: &mut InterClientNetwork,
    ) {
        let Some(own) = self.mobile else { return };
        if world.find_item(item).is_none() {
            tracing::warn!("[session] wear of unknown item {:08X}, ignored", item);
            return;
        }
        let source = world.find_container_of(item);

        let (feet, displaced) = match world.find_mobile_mut(own) {
            Some(mob) => ((mob.x, mob.y, mob.z), mob.set_item_on_layer(layer, item)),
            None => return,
        };
        if let Some(displaced) = displaced {
            world.place_on_ground(displaced, feet.0, feet.1, feet.2);
        }
        world.set_worn(item, own, layer);

        if let Some(source) = source {
            bus.notify_container_changed(source);
        }
        bus.notify_changed_clothes(own);
    }

    fn on_changed_clothes(&self, wearing: Serial, world: &World) {
        if let Some(snap) = snapshot(world, wearing) {
            self.client.send(Message::CharacterDraw(snap));
        }
    }

    fn on_dropped_cloth(&self, _mobile: Serial, item: Serial) {
        self.client.send(Message::DeleteObject { serial: item });
    }

    fn on_container_changed(&self, container: Serial, world: &World) {
        let items: Vec<ContainedItem> = world
            .container_contents(container)
            .into_iter()
            .filter_map(|item| match item.location {
                ItemLocation::Contained { x, y, .. } => Some(ContainedItem {
                    serial: item.serial,
                    model: item.model,
                    hue: item.hue,
                    amount: item.amount,
                    x,
                    y,
                    container,
                }),
                _ => None,
            })
            .collect();
        self.client.send(Message::ContainerItems { container, items });
    }

    // ======================== combat ========================

    /// Sets the character status and, when leaving war mode mid-attack,
    /// fans the attack-finished event out first so both sides observe the
    /// teardown before the war-mode change.
    pub fn toggle_war_mode(&mut self, war: bool, world: &mut World, bus: &mut InterClientNetwork) {
        let Some(own) = self.mobile else { return };
        if !war {
            if let Some(target) = self.attacking {
                bus.notify_attack_finished(own, target);
            }
        }
        if let Some(mob) = world.find_mobile_mut(own) {
            mob.status = if war {
                CharacterStatus::WarMode
            } else {
                CharacterStatus::Normal
            };
        }
        bus.notify_changed_war_mode(own);
    }

    fn on_changed_war_mode(&self, mobile: Serial, world: &World) {
        if let Some(snap) = snapshot(world, mobile) {
            self.client.send(Message::CharacterDraw(snap));
        }
    }

    /// Starts an engagement. The broadcast is separate from the local
    /// bookkeeping: each session, this one included, updates its own
    /// attacking/attacked-by view in [`Self::on_attacked`] when the event
    /// comes back around.
    pub fn attack(
        &self,
        target: Serial,
        combat: &mut CombatSystem,
        bus: &mut InterClientNetwork,
    ) {
        let Some(own) = self.mobile else { return };
        if target == own {
            tracing::warn!("[session] {:08X} tried to attack itself, ignored", own);
            return;
        }
        combat.begin_combat(own, target, bus);
    }

    fn on_attacked(&mut self, attacker: Serial, attacked: Serial) {
        let Some(own) = self.mobile else { return };
        if own == attacked {
            self.attacking_me.insert(attacker);
            self.client.send(Message::CharacterAnimation {
                serial: attacker,
                action: ANIM_ATTACK,
                backwards: false,
            });
            self.client.send(Message::AttackOk { serial: attacker });
            self.client.send(Message::AttackSucceed { serial: attacker });
            self.client.send(Message::FightOccurring { attacker, attacked });
        } else if own == attacker {
            self.attacking = Some(attacked);
        }
    }

    /// Symmetric teardown. The attacker side only reports completion when
    /// the former target is not still attacking back; the attacked side only
    /// when it is not itself mid-attack.
    fn on_attack_finished(&mut self, attacker: Serial, attacked: Serial) {
        let Some(own) = self.mobile else { return };
        if own == attacker {
            self.attacking = None;
            if !self.attacking_me.contains(&attacked) {
                self.client.send(Message::AttackSucceed { serial: 0 });
            }
        } else if own == attacked {
            self.attacking_me.remove(&attacker);
            if self.attacking.is_none() {
                self.client.send(Message::AttackSucceed { serial: 0 });
            }
        }
    }

    /// Applies damage to the session's own mobile. Hit points may go
    /// negative; death handling reacts elsewhere.
    pub fn apply_damage(&self, amount: u16, world: &mut World, bus: &mut InterClientNetwork) {
        let Some(own) = self.mobile else { return };
        let Some(mob) = world.find_mobile_mut(own) else {
            return;
        };
        mob.hits -= i32::from(amount);
        self.send_damage_report(own, amount, world);
        bus.notify_other_damaged(own, amount);
    }

    fn on_other_damaged(&self, mobile: Serial, amount: u16, world: &World) {
        let Some(own) = self.mobile else { return };
        if mobile == own {
            return; // apply_damage already reported locally
        }
        self.send_damage_report(mobile, amount, world);
    }

    fn send_damage_report(&self, mobile: Serial, amount: u16, world: &World) {
        if let Some(status) = status_bar(world, mobile) {
            self.client.send(status);
        }
        self.client.send(Message::CharacterAnimation {
            serial: mobile,
            action: ANIM_GET_HIT,
            backwards: true,
        });
        self.client.send(Message::Damage {
            serial: mobile,
            amount,
        });
    }

    pub fn fight_occurring(&self, opponent: Serial, bus: &mut InterClientNetwork) {
        let Some(own) = self.mobile else { return };
        bus.notify_fight_occurring(own, opponent);
    }

    fn on_fight_occurring(&self, first: Serial, second: Serial) {
        self.client.send(Message::FightOccurring {
            attacker: first,
            attacked: second,
        });
    }

    fn on_killed(&self, mobile: Serial, world: &World) {
        let Some(mob) = world.find_mobile(mobile) else {
            return;
        };
        self.client.send(Message::DeathAnimation {
            serial: mobile,
            corpse: 0,
        });
        if mob.is_npc() {
            self.client.send(Message::DeleteObject { serial: mobile });
        } else {
            if let Some(snap) = snapshot(world, mobile) {
                self.client.send(Message::CharacterDraw(snap));
            }
            if let Some(status) = status_bar(world, mobile) {
                self.client.send(status);
            }
            self.client.send(Message::AttackSucceed { serial: 0 });
        }
    }

    // ======================== dispatch ========================

    /// Bus delivery entry point: every session receives every notification.
    pub fn deliver(
        &mut self,
        notification: &Notification,
        world: &mut World,
        bus: &mut InterClientNetwork,
    ) {
        match notification {
            Notification::MobileMovement { moving } => {
                self.on_other_mobile_movement(*moving, world, bus);
            }
            Notification::EnteredRange { entered, target } => {
                self.on_entered_range(*entered, *target, world);
            }
            Notification::Speech {
                speaker,
                kind,
                hue,
                font,
                language,
                text,
            } => {
                self.on_other_mobile_speech(*speaker, *kind, *hue, *font, language, text, world);
            }
            Notification::Attacked { attacker, attacked } => {
                self.on_attacked(*attacker, *attacked);
            }
            Notification::AttackFinished { attacker, attacked } => {
                self.on_attack_finished(*attacker, *attacked);
            }
            Notification::Damaged { mobile, amount } => {
                self.on_other_damaged(*mobile, *amount, world);
            }
            Notification::FightOccurring { first, second } => {
                self.on_fight_occurring(*first, *second);
            }
            Notification::ClothDropped { mobile, item } => {
                self.on_dropped_cloth(*mobile, *item);
            }
            Notification::ClothesChanged { mobile } => {
                self.on_changed_clothes(*mobile, world);
            }
            Notification::ItemDropped {
                mobile,
                item,
                container,
                x,
                y,
                z,
            } => {
                self.on_item_dropped(*mobile, *item, *container, *x, *y, *z, world);
            }
            Notification::ContainerChanged { container } => {
                self.on_container_changed(*container, world);
            }
            Notification::WarModeChanged { mobile } => {
                self.on_changed_war_mode(*mobile, world);
            }
            Notification::Killed { mobile } => {
                self.on_killed(*mobile, world);
            }
        }
    }

    pub fn client(&self) -> &ClientChannel {
        &self.client
    }
}

pub(crate) fn snapshot(world: &World, serial: Serial) -> Option<MobileSnapshot> {
    world
        .find_mobile(serial)
        .map(|mob| MobileSnapshot::of(mob, world))
}

pub(crate) fn status_bar(world: &World, serial: Serial) -> Option<Message> {
    world.find_mobile(serial).map(|mob| Message::StatusBarInfo {
        serial,
        name: mob.name.clone(),
        hits: mob.hits.clamp(0, i32::from(u16::MAX)) as u16,
        max_hits: mob.max_hits,
    })
}
