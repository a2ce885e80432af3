//! Game-phase controller.
//!
//! One instance per connection. Turns decoded in-game messages into player
//! session operations and response messages. Unhandled message types are
//! ignored silently; an unknown but well-framed message must never sever
//! the connection.

use std::sync::Arc;

use crate::game::movement::MovementTracker;
use crate::game::player_session::{snapshot, status_bar, PlayerSession};
use crate::game::Shard;
use crate::network::{ClientChannel, ConnId};
use crate::protocol::{Message, MobileSnapshot};
use crate::servers::game::router::Disposition;
use crate::servers::game::GameState;
use crate::world::mobile::Serial;

/// Character list flags: one character per account, post-AOS client layout.
const CHARACTER_LIST_FLAGS: u32 = 0x14 | 0x1A8;
const CLIENT_FEATURES: u16 = 0x0001;
const ITEM_DRAW_RANGE: u16 = 20;

const STATUS_REQUEST_STATS: u8 = 4;

pub struct GameController {
    conn_id: ConnId,
    state: Arc<GameState>,
    client: ClientChannel,
    movement: MovementTracker,
    client_version: Option<String>,
}

impl GameController {
    pub fn new(conn_id: ConnId, state: Arc<GameState>, client: ClientChannel) -> Self {
        Self {
            conn_id,
            state,
            client,
            movement: MovementTracker::new(),
            client_version: None,
        }
    }

    /// Everything the authentication controller does not claim.
    pub fn is_interested_in(msg: &Message) -> bool {
        !super::auth::AuthenticationController::is_interested_in(msg)
    }

    pub fn handle(&mut self, msg: Message) -> Disposition {
        match msg {
            Message::GameLogin { auth_key, .. } => self.handle_game_login(auth_key),
            Message::CharacterSelect { slot, .. } => self.handle_character_select(slot),
            Message::ClientVersion { version } => self.handle_client_version(version),
            Message::MoveRequest {
                direction,
                running,
                sequence,
                ..
            } => self.handle_move(direction, running, sequence),
            Message::ResyncRequest { .. } => self.handle_resync(),
            Message::UnicodeSpeechRequest {
                kind,
                hue,
                font,
                language,
                text,
            } => self.handle_speech(kind, hue, font, language, text),
            Message::AttackRequest { serial } => self.handle_attack(serial),
            Message::WarMode { war } => self.handle_war_mode(war),
            Message::DropItem {
                serial,
                x,
                y,
                z,
                container,
            } => self.handle_drop_item(serial, x, y, z, container),
            Message::WearItem { serial, layer, .. } => self.handle_wear_item(serial, layer),
            Message::PickUpItem { serial, amount } => {
                tracing::debug!(
                    "[game] conn={} picked up {:08X} x{}",
                    self.conn_id,
                    serial,
                    amount
                );
                Disposition::Continue
            }
            Message::LookRequest { serial } => self.handle_look(serial),
            Message::DoubleClick { serial, paperdoll } => {
                self.handle_double_click(serial, paperdoll)
            }
            Message::GetPlayerStatus { kind, serial } => self.handle_status(kind, serial),
            Message::PingPong { sequence } => {
                self.client.send(Message::PingPong { sequence });
                Disposition::Continue
            }
            // Benign messages with no server-side effect.
            Message::GeneralInformation { .. } | Message::SpyOnClient => Disposition::Continue,
            other => {
                tracing::debug!(
                    "[game] conn={} no handler for opcode {:#04X}, ignored",
                    self.conn_id,
                    other.opcode()
                );
                Disposition::Continue
            }
        }
    }

    fn handle_game_login(&mut self, auth_key: u32) -> Disposition {
        let Some(account) = self.state.login.authorized_account(auth_key) else {
            tracing::warn!(
                "[game] conn={} bad auth key {:08X}, closing",
                self.conn_id,
                auth_key
            );
            return Disposition::Close;
        };
        tracing::info!(
            "[game] [session_start] conn={} user={}",
            self.conn_id,
            account.user
        );
        let mut shard = self.state.lock_shard();
        let session = PlayerSession::new(account, self.client.clone());
        let names = session.character_names(&shard.world);
        shard.register_session(self.conn_id, session);
        self.client.send(Message::CharacterList {
            names,
            flags: CHARACTER_LIST_FLAGS,
        });
        Disposition::Continue
    }

    fn handle_character_select(&mut self, slot: u32) -> Disposition {
        let mut shard = self.state.lock_shard();
        let Shard {
            sessions, world, ..
        } = &mut *shard;
        let Some(session) = sessions.get_mut(&self.conn_id) else {
            tracing::warn!(
                "[game] conn={} character select without session, closing",
                self.conn_id
            );
            return Disposition::Close;
        };
        match session.select_character(slot, world) {
            Some(serial) => {
                tracing::info!(
                    "[game] [char_select] conn={} slot={} serial={:08X}",
                    self.conn_id,
                    slot,
                    serial
                );
                self.client.send(Message::ClientVersionRequest);
                Disposition::Continue
            }
            None => {
                tracing::warn!(
                    "[game] conn={} selected invalid slot {}, closing",
                    self.conn_id,
                    slot
                );
                Disposition::Close
            }
        }
    }

    /// The first client-version report doubles as the game-start trigger.
    fn handle_client_version(&mut self, version: String) -> Disposition {
        if self.client_version.is_some() {
            return Disposition::Continue;
        }
        tracing::info!("[game] conn={} client version {}", self.conn_id, version);
        self.client_version = Some(version);
        self.start_game();
        Disposition::Continue
    }

    fn start_game(&mut self) {
        let mut shard = self.state.lock_shard();
        let Some(serial) = shard
            .sessions
            .get(&self.conn_id)
            .and_then(|session| session.mobile())
        else {
            tracing::warn!(
                "[game] conn={} version report before character select",
                self.conn_id
            );
            return;
        };
        shard.combat.register_mobile(serial, self.conn_id);

        let Some(snap) = snapshot(&shard.world, serial) else {
            return;
        };
        let (map_width, map_height) = (shard.world.map.width(), shard.world.map.height());
        self.client.send_all([
            Message::LoginConfirm {
                serial,
                body: snap.body,
                x: snap.x,
                y: snap.y,
                z: snap.z,
                direction: snap.direction,
                notoriety: snap.notoriety,
                map_width,
                map_height,
            },
            Message::SeasonalInformation { season: 0 },
            Message::DrawGamePlayer(snap.clone()),
            Message::CharacterDraw(snap.clone()),
            Message::OverallLightLevel { level: 0 },
            Message::PersonalLightLevel { serial, level: 0 },
            Message::ClientFeatures {
                flags: CLIENT_FEATURES,
            },
            Message::WarModeAck {
                war: snap.war_mode,
            },
            Message::LoginComplete,
        ]);

        for item in shard.world.items_in_region(serial, ITEM_DRAW_RANGE) {
            if let crate::world::item::ItemLocation::Ground { x, y, z } = item.location {
                self.client.send(Message::ObjectInfo {
                    serial: item.serial,
                    model: item.model,
                    amount: item.amount,
                    x,
                    y,
                    z,
                });
            }
        }
        for equipped in &snap.equipment {
            let revision = shard
                .world
                .find_item(equipped.serial)
                .map(|item| item.revision)
                .unwrap_or(0);
            self.client.send(Message::ObjectRevision {
                serial: equipped.serial,
                revision,
            });
        }
    }

    /// Answers with the same sequence on success; a mismatch rejects with
    /// the authoritative position and leaves the tracker untouched.
    fn handle_move(
        &mut self,
        direction: crate::world::mobile::Direction,
        running: bool,
        sequence: u8,
    ) -> Disposition {
        let mut shard = self.state.lock_shard();
        let Shard {
            sessions,
            world,
            bus,
            ..
        } = &mut *shard;
        let Some(session) = sessions.get_mut(&self.conn_id) else {
            return Disposition::Continue;
        };
        let Some(serial) = session.mobile() else {
            return Disposition::Continue;
        };

        let wide = self.movement.normalize(sequence);
        if self.movement.accept(wide) {
            session.move_mobile(direction, running, world, bus);
            let notoriety = match world.find_mobile(serial) {
                Some(mob) => mob.notoriety,
                None => return Disposition::Continue,
            };
            self.client.send(Message::MovementAck {
                sequence,
                notoriety,
            });
            shard.drain_notifications();
        } else {
            tracing::warn!(
                "[game] [move_reject] conn={} expected={} got={}",
                self.conn_id,
                self.movement.expected(),
                wide
            );
            if let Some(mob) = world.find_mobile(serial) {
                self.client.send(Message::MovementReject {
                    sequence,
                    x: mob.x,
                    y: mob.y,
                    z: mob.z,
                    direction: mob.direction_with_running(),
                });
            }
        }
        Disposition::Continue
    }

    fn handle_resync(&mut self) -> Disposition {
        let shard = self.state.lock_shard();
        if let Some(snap) = self.own_snapshot(&shard) {
            self.client.send(Message::DrawGamePlayer(snap.clone()));
            self.client.send(Message::CharacterDraw(snap));
        }
        Disposition::Continue
    }

    fn handle_speech(
        &mut self,
        kind: u8,
        hue: u16,
        font: u16,
        language: String,
        text: String,
    ) -> Disposition {
        let mut shard = self.state.lock_shard();
        let Shard { sessions, bus, .. } = &mut *shard;
        if let Some(session) = sessions.get(&self.conn_id) {
            session.speak(kind, hue, font, language, text, bus);
        }
        shard.drain_notifications();
        Disposition::Continue
    }

    fn handle_attack(&mut self, target: Serial) -> Disposition {
        let mut shard = self.state.lock_shard();
        if shard.world.find_mobile(target).is_none() {
            tracing::warn!(
                "[game] conn={} attack on unknown mobile {:08X}, ignored",
                self.conn_id,
                target
            );
            return Disposition::Continue;
        }
        let Shard {
            sessions,
            combat,
            bus,
            ..
        } = &mut *shard;
        let Some(session) = sessions.get(&self.conn_id) else {
            return Disposition::Continue;
        };
        let Some(own) = session.mobile() else {
            return Disposition::Continue;
        };
        session.attack(target, combat, bus);
        shard.drain_notifications();
        self.client.send_all([
            Message::AttackOk { serial: target },
            Message::FightOccurring {
                attacker: own,
                attacked: target,
            },
            Message::AttackSucceed { serial: target },
        ]);
        Disposition::Continue
    }

    fn handle_war_mode(&mut self, war: bool) -> Disposition {
        let mut shard = self.state.lock_shard();
        let Shard {
            sessions,
            world,
            bus,
            ..
        } = &mut *shard;
        let Some(session) = sessions.get_mut(&self.conn_id) else {
            return Disposition::Continue;
        };
        session.toggle_war_mode(war, world, bus);
        shard.drain_notifications();
        self.client.send(Message::WarModeAck { war });
        if let Some(snap) = self.own_snapshot(&shard) {
            self.client.send(Message::CharacterDraw(snap));
        }
        self.client.send(Message::AttackSucceed { serial: 0 });
        Disposition::Continue
    }

    fn handle_drop_item(
        &mut self,
        serial: Serial,
        x: u16,
        y: u16,
        z: i8,
        container: u32,
    ) -> Disposition {
        // 0 and the all-ones serial both mean "no container" on the wire.
        let on_ground = container == 0 || container == u32::MAX;
        let mut shard = self.state.lock_shard();
        let Shard {
            sessions,
            world,
            bus,
            ..
        } = &mut *shard;
        if let Some(session) = sessions.get_mut(&self.conn_id) {
            session.drop_item(serial, on_ground, container, x, y, z, world, bus);
        }
        shard.drain_notifications();
        Disposition::Continue
    }

    fn handle_wear_item(&mut self, serial: Serial, layer: crate::world::item::Layer) -> Disposition {
        let mut shard = self.state.lock_shard();
        let Shard {
            sessions,
            world,
            bus,
            ..
        } = &mut *shard;
        if let Some(session) = sessions.get_mut(&self.conn_id) {
            session.wear_item(layer, serial, world, bus);
        }
        shard.drain_notifications();
        Disposition::Continue
    }

    fn handle_look(&mut self, serial: Serial) -> Disposition {
        let shard = self.state.lock_shard();
        if let Some(mob) = shard.world.find_mobile(serial) {
            self.client.send(Message::SendSpeech {
                serial,
                model: mob.body,
                name: mob.name.clone(),
                text: mob.name.clone(),
            });
        } else if let Some(item) = shard.world.find_item(serial) {
            self.client.send(Message::SendSpeech {
                serial,
                model: item.model,
                name: item.name.clone(),
                text: item.name.clone(),
            });
        } else {
            tracing::warn!(
                "[game] conn={} look at unknown serial {:08X}",
                self.conn_id,
                serial
            );
        }
        Disposition::Continue
    }

    fn handle_double_click(&mut self, serial: Serial, paperdoll: bool) -> Disposition {
        let shard = self.state.lock_shard();
        if paperdoll {
            if let Some(mob) = shard.world.find_mobile(serial) {
                self.client.send(Message::Paperdoll {
                    serial,
                    title: mob.name.clone(),
                    war_mode: mob.in_war_mode(),
                });
            }
            return Disposition::Continue;
        }
        if let Some(item) = shard.world.find_item(serial) {
            // Item use scripting is an external concern.
            tracing::debug!(
                "[game] conn={} used item {:08X} ({})",
                self.conn_id,
                serial,
                item.name
            );
        } else {
            tracing::warn!(
                "[game] conn={} double-click on unknown serial {:08X}",
                self.conn_id,
                serial
            );
        }
        Disposition::Continue
    }

    fn handle_status(&mut self, kind: u8, serial: Serial) -> Disposition {
        if kind != STATUS_REQUEST_STATS {
            return Disposition::Continue;
        }
        let shard = self.state.lock_shard();
        if let Some(status) = status_bar(&shard.world, serial) {
            self.client.send(status);
        }
        Disposition::Continue
    }

    fn own_snapshot(&self, shard: &Shard) -> Option<MobileSnapshot> {
        let serial = shard.sessions.get(&self.conn_id)?.mobile()?;
        snapshot(&shard.world, serial)
    }
}
