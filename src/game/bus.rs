//! Inter-session notification bus.
//!
//! Session operations publish typed notifications here; the shard drains the
//! queue after the originating handler returns and delivers each entry to
//! every registered session, in publish order, exactly once. The bus itself
//! never filters; self-exclusion, range and point-to-point addressing are
//! the receiving session's job. Notifications published while one is being
//! delivered (entered-range raised from inside movement delivery) line up
//! behind the current queue, which keeps delivery order consistent with
//! causal origin.

use std::collections::VecDeque;

use crate::world::mobile::Serial;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    MobileMovement {
        moving: Serial,
    },
    EnteredRange {
        entered: Serial,
        target: Serial,
    },
    Speech {
        speaker: Serial,
        kind: u8,
        hue: u16,
        font: u16,
        language: String,
        text: String,
    },
    Attacked {
        attacker: Serial,
        attacked: Serial,
    },
    AttackFinished {
        attacker: Serial,
        attacked: Serial,
    },
    Damaged {
        mobile: Serial,
        amount: u16,
    },
    FightOccurring {
        first: Serial,
        second: Serial,
    },
    ClothDropped {
        mobile: Serial,
        item: Serial,
    },
    ClothesChanged {
        mobile: Serial,
    },
    ItemDropped {
        mobile: Serial,
        item: Serial,
        /// 0 means "no container": the item went to the ground.
        container: Serial,
        x: u16,
        y: u16,
        z: i8,
    },
    ContainerChanged {
        container: Serial,
    },
    WarModeChanged {
        mobile: Serial,
    },
    Killed {
        mobile: Serial,
    },
}

#[derive(Debug, Default)]
pub struct InterClientNetwork {
    queue: VecDeque<Notification>,
}

impl InterClientNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pop(&mut self) -> Option<Notification> {
        self.queue.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn notify_other_mobile_movement(&mut self, moving: Serial) {
        self.queue.push_back(Notification::MobileMovement { moving });
    }

    pub fn notify_entered_range(&mut self, entered: Serial, target: Serial) {
        self.queue
            .push_back(Notification::EnteredRange { entered, target });
    }

    pub fn notify_mobile_speech(
        &mut self,
        speaker: Serial,
        kind: u8,
        hue: u16,
        font: u16,
        language: String,
        text: String,
    ) {
        self.queue.push_back(Notification::Speech {
            speaker,
            kind,
            hue,
            font,
            language,
            text,
        });
    }

    pub fn notify_attacked(&mut self, attacker: Serial, attacked: Serial) {
        self.queue
            .push_back(Notification::Attacked { attacker, attacked });
    }

    pub fn notify_attack_finished(&mut self, attacker: Serial, attacked: Serial) {
        self.queue
            .push_back(Notification::AttackFinished { attacker, attacked });
    }

    pub fn notify_other_damaged(&mut self, mobile: Serial, amount: u16) {
        self.queue.push_back(Notification::Damaged { mobile, amount });
    }

    pub fn notify_fight_occurring(&mut self, first: Serial, second: Serial) {
        self.queue
            .push_back(Notification::FightOccurring { first, second });
    }

    pub fn notify_dropped_cloth(&mut self, mobile: Serial, item: Serial) {
        self.queue.push_back(Notification::ClothDropped { mobile, item });
    }

    pub fn notify_changed_clothes(&mut self, mobile: Serial) {
        self.queue.push_back(Notification::ClothesChanged { mobile });
    }

    pub fn notify_item_dropped(
        &mut self,
        mobile: Serial,
        item: Serial,
        container: Serial,
        x: u16,
        y: u16,
        z: i8,
    ) {
        self.queue.push_back(Notification::ItemDropped {
            mobile,
            item,
            container,
            x,
            y,
            z,
        });
    }

    pub fn notify_container_changed(&mut self, container: Serial) {
        self.queue
            .push_back(Notification::ContainerChanged { container });
    }

    pub fn notify_changed_war_mode(&mut self, mobile: Serial) {
        self.queue.push_back(Notification::WarModeChanged { mobile });
    }

    pub fn notify_killed(&mut self, mobile: Serial) {
        self.queue.push_back(Notification::Killed { mobile });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut bus = InterClientNetwork::new();
        bus.notify_other_mobile_movement(1);
        bus.notify_entered_range(2, 3);
        assert_eq!(bus.pop(), Some(Notification::MobileMovement { moving: 1 }));
        assert_eq!(
            bus.pop(),
            Some(Notification::EnteredRange {
                entered: 2,
                target: 3
            })
        );
        assert_eq!(bus.pop(), None);
        assert!(bus.is_empty());
    }
}
