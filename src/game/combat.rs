//! Pairwise combat coordination.
//!
//! The combat system is a registry, not a lock-step state machine: it records
//! who attacks whom, binds mobiles to the session that controls them, and
//! fans engagement events onto the bus. Each session derives its own local
//! attacking/attacked-by view from those broadcasts.

use std::collections::HashMap;

use rand::RngExt;

use crate::game::bus::InterClientNetwork;
use crate::network::ConnId;
use crate::world::mobile::{Mobile, Serial};

/// Rolls the damage for one swing. Swapped out in tests for a fixed value.
pub trait DamageCalculator: Send {
    fn swing_damage(&self, attacker: &Mobile, attacked: &Mobile) -> u16;
}

/// Plain physical swing: a flat random roll. Stats and equipment do not
/// weigh in yet.
pub struct PhysicalDamageCalculator;

impl DamageCalculator for PhysicalDamageCalculator {
    fn swing_damage(&self, _attacker: &Mobile, _attacked: &Mobile) -> u16 {
        rand::rng().random_range(4..=12)
    }
}

pub struct CombatSystem {
    /// attacker -> attacked. Mutual combat is both directions populated.
    engagements: HashMap<Serial, Serial>,
    /// Which session controls which mobile; routes damage and death events
    /// without a global mobile->session directory leaking into sessions.
    bindings: HashMap<Serial, ConnId>,
    calculator: Box<dyn DamageCalculator>,
}

impl CombatSystem {
    pub fn new() -> Self {
        Self::with_calculator(Box::new(PhysicalDamageCalculator))
    }

    pub fn with_calculator(calculator: Box<dyn DamageCalculator>) -> Self {
        Self {
            engagements: HashMap::new(),
            bindings: HashMap::new(),
            calculator,
        }
    }

    /// Registered at game start so engagement events can reach the client.
    pub fn register_mobile(&mut self, mobile: Serial, conn: ConnId) {
        self.bindings.insert(mobile, conn);
    }

    pub fn session_of(&self, mobile: Serial) -> Option<ConnId> {
        self.bindings.get(&mobile).copied()
    }

    /// Records the engagement and fans the attack event to every session.
    pub fn begin_combat(
        &mut self,
        attacker: Serial,
        attacked: Serial,
        bus: &mut InterClientNetwork,
    ) {
        if attacker == attacked {
            tracing::warn!("[combat] {:08X} cannot engage itself", attacker);
            return;
        }
        self.engagements.insert(attacker, attacked);
        tracing::debug!("[combat] [begin] {:08X} -> {:08X}", attacker, attacked);
        bus.notify_attacked(attacker, attacked);
    }

    /// Clears one direction of an engagement and fans the teardown event.
    pub fn finish_combat(&mut self, attacker: Serial, bus: &mut InterClientNetwork) {
        if let Some(attacked) = self.engagements.remove(&attacker) {
            tracing::debug!("[combat] [finish] {:08X} -> {:08X}", attacker, attacked);
            bus.notify_attack_finished(attacker, attacked);
        }
    }

    pub fn is_attacking(&self, attacker: Serial) -> Option<Serial> {
        self.engagements.get(&attacker).copied()
    }

    pub fn is_mutual(&self, first: Serial, second: Serial) -> bool {
        self.engagements.get(&first) == Some(&second)
            && self.engagements.get(&second) == Some(&first)
    }

    /// Active attacker -> attacked relations, one entry per direction.
    pub fn engaged_pairs(&self) -> Vec<(Serial, Serial)> {
        self.engagements
            .iter()
            .map(|(attacker, attacked)| (*attacker, *attacked))
            .collect()
    }

    pub fn swing_damage(&self, attacker: &Mobile, attacked: &Mobile) -> u16 {
        self.calculator.swing_damage(attacker, attacked)
    }

    /// Keeps the registry consistent with engagement events that sessions
    /// publish themselves (war-mode teardown, for one). Recording an
    /// already-known engagement is a no-op.
    pub fn observe(&mut self, notification: &crate::game::bus::Notification) {
        use crate::game::bus::Notification;
        match notification {
            Notification::Attacked { attacker, attacked } => {
                self.engagements.insert(*attacker, *attacked);
            }
            Notification::AttackFinished { attacker, attacked } => {
                if self.engagements.get(attacker) == Some(attacked) {
                    self.engagements.remove(attacker);
                }
            }
            _ => {}
        }
    }

    /// Drops every engagement involving `mobile` (both directions), fanning
    /// attack-finished for each, and releases its session binding. Used on
    /// disconnect and on death.
    pub fn teardown_mobile(&mut self, mobile: Serial, bus: &mut InterClientNetwork) {
        if let Some(attacked) = self.engagements.remove(&mobile) {
            bus.notify_attack_finished(mobile, attacked);
        }
        let attackers: Vec<Serial> = self
            .engagements
            .iter()
            .filter(|(_, attacked)| **attacked == mobile)
            .map(|(attacker, _)| *attacker)
            .collect();
        for attacker in attackers {
            self.engagements.remove(&attacker);
            bus.notify_attack_finished(attacker, mobile);
        }
        self.bindings.remove(&mobile);
    }
}

impl Default for CombatSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::bus::Notification;

    #[test]
    fn test_begin_combat_records_and_notifies() {
        let mut combat = CombatSystem::new();
        let mut bus = InterClientNetwork::new();
        combat.begin_combat(1, 2, &mut bus);
        assert_eq!(combat.is_attacking(1), Some(2));
        assert!(!combat.is_mutual(1, 2));
        assert_eq!(
            bus.pop(),
            Some(Notification::Attacked {
                attacker: 1,
                attacked: 2
            })
        );
    }

    #[test]
    fn test_self_attack_rejected() {
        let mut combat = CombatSystem::new();
        let mut bus = InterClientNetwork::new();
        combat.begin_combat(1, 1, &mut bus);
        assert_eq!(combat.is_attacking(1), None);
        assert!(bus.is_empty());
    }

    #[test]
    fn test_mutual_combat_needs_both_directions() {
        let mut combat = CombatSystem::new();
        let mut bus = InterClientNetwork::new();
        combat.begin_combat(1, 2, &mut bus);
        combat.begin_combat(2, 1, &mut bus);
        assert!(combat.is_mutual(1, 2));
        assert!(combat.is_mutual(2, 1));
        combat.finish_combat(1, &mut bus);
        assert!(!combat.is_mutual(1, 2));
        assert_eq!(combat.is_attacking(2), Some(1));
    }

    #[test]
    fn test_teardown_clears_both_directions() {
        let mut combat = CombatSystem::new();
        let mut bus = InterClientNetwork::new();
        combat.register_mobile(2, 77);
        combat.begin_combat(1, 2, &mut bus);
        combat.begin_combat(2, 1, &mut bus);
        combat.begin_combat(3, 2, &mut bus);
        while bus.pop().is_some() {}

        combat.teardown_mobile(2, &mut bus);
        assert_eq!(combat.is_attacking(1), None);
        assert_eq!(combat.is_attacking(2), None);
        assert_eq!(combat.is_attacking(3), None);
        assert_eq!(combat.session_of(2), None);

        let mut finished = Vec::new();
        while let Some(n) = bus.pop() {
            finished.push(n);
        }
        assert_eq!(finished.len(), 3);
        assert!(finished.contains(&Notification::AttackFinished {
            attacker: 2,
            attacked: 1
        }));
        assert!(finished.contains(&Notification::AttackFinished {
            attacker: 1,
            attacked: 2
        }));
        assert!(finished.contains(&Notification::AttackFinished {
            attacker: 3,
            attacked: 2
        }));
    }
}
