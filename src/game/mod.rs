//! Game state and broadcast dispatch.
//!
//! A [`Shard`] is the single serialization point for everything sessions
//! share: the world registries, the session table, the combat registry and
//! the notification bus. The server holds it behind one mutex; every inbound
//! message handler locks it, mutates, and drains the bus before releasing.
//! Handlers never block inside the lock (client I/O goes through bounded
//! queues), so the critical sections stay short and there is no lock
//! ordering to get wrong.

pub mod bus;
pub mod combat;
pub mod movement;
pub mod player_session;

use std::collections::HashMap;

use crate::game::bus::InterClientNetwork;
use crate::game::combat::CombatSystem;
use crate::game::player_session::PlayerSession;
use crate::network::ConnId;
use crate::world::mobile::Serial;
use crate::world::World;

pub struct Shard {
    pub world: World,
    pub sessions: HashMap<ConnId, PlayerSession>,
    pub combat: CombatSystem,
    pub bus: InterClientNetwork,
}

impl Shard {
    pub fn new(world: World) -> Self {
        Self {
            world,
            sessions: HashMap::new(),
            combat: CombatSystem::new(),
            bus: InterClientNetwork::new(),
        }
    }

    /// Subscribes a session to the bus. It stays registered until
    /// disconnect.
    pub fn register_session(&mut self, conn: ConnId, session: PlayerSession) {
        self.sessions.insert(conn, session);
    }

    /// Removes a disconnecting session and tears down its combat state in
    /// the same critical section, so in-flight broadcasts can never observe
    /// a half-removed session.
    pub fn remove_session(&mut self, conn: ConnId) {
        let Some(session) = self.sessions.remove(&conn) else {
            return;
        };
        if let Some(mobile) = session.mobile() {
            self.combat.teardown_mobile(mobile, &mut self.bus);
        }
        self.drain_notifications();
    }

    /// Delivers queued notifications to every registered session, in publish
    /// order. Notifications published during delivery go to the back of the
    /// queue and are handled in the same pass.
    pub fn drain_notifications(&mut self) {
        while let Some(notification) = self.bus.pop() {
            // The combat registry tracks the same event stream the sessions
            // derive their local state from.
            self.combat.observe(&notification);
            let Shard {
                sessions,
                world,
                bus,
                ..
            } = self;
            for session in sessions.values_mut() {
                session.deliver(&notification, world, bus);
            }
        }
    }

    /// One combat bookkeeping tick: every engagement swings once and fans a
    /// fight-occurring event; a victim at zero or less hit points dies,
    /// which tears down every engagement it was part of.
    pub fn combat_tick(&mut self) {
        for (attacker, attacked) in self.combat.engaged_pairs() {
            // The relation may have been torn down by a death earlier in
            // this same tick.
            if self.combat.is_attacking(attacker) != Some(attacked) {
                continue;
            }
            // A mutual pair shows up once per direction; announce the fight
            // only for the first.
            let announce = !self.combat.is_mutual(attacker, attacked) || attacker < attacked;
            if announce {
                let session = self
                    .combat
                    .session_of(attacker)
                    .and_then(|conn| self.sessions.get(&conn));
                match session {
                    Some(session) => session.fight_occurring(attacked, &mut self.bus),
                    None => self.bus.notify_fight_occurring(attacker, attacked),
                }
            }
            let damage = {
                let (Some(a), Some(b)) = (
                    self.world.find_mobile(attacker),
                    self.world.find_mobile(attacked),
                ) else {
                    continue;
                };
                self.combat.swing_damage(a, b)
            };
            self.apply_damage_to(attacked, damage);
            let dead = self
                .world
                .find_mobile(attacked)
                .is_some_and(|mob| mob.hits <= 0);
            if dead {
                tracing::info!("[combat] [killed] {:08X}", attacked);
                self.bus.notify_killed(attacked);
                self.combat.teardown_mobile(attacked, &mut self.bus);
            }
        }
        self.drain_notifications();
    }

    /// Routes damage through the controlling session when there is one;
    /// NPCs and unbound mobiles take the hit directly.
    pub fn apply_damage_to(&mut self, target: Serial, amount: u16) {
        let session = self
            .combat
            .session_of(target)
            .and_then(|conn| self.sessions.get(&conn));
        match session {
            Some(session) => session.apply_damage(amount, &mut self.world, &mut self.bus),
            None => {
                if let Some(mob) = self.world.find_mobile_mut(target) {
                    mob.hits -= i32::from(amount);
                    self.bus.notify_other_damaged(target, amount);
                }
            }
        }
    }
}
