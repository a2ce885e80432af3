//! Message routing between the per-connection controllers.

use std::sync::Arc;

use crate::network::{ClientChannel, ConnId};
use crate::protocol::Message;
use crate::servers::game::auth::AuthenticationController;
use crate::servers::game::controller::GameController;
use crate::servers::game::GameState;

/// What the connection driver should do after a handled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Continue,
    Close,
}

/// Binds a connection to its two controllers. The interest sets are disjoint
/// by construction: the game controller claims exactly the complement of the
/// authentication set, so exactly one controller handles any message.
pub struct ProtocolRouter {
    auth: AuthenticationController,
    game: GameController,
}

impl ProtocolRouter {
    pub fn new(conn_id: ConnId, state: Arc<GameState>, client: ClientChannel) -> Self {
        Self {
            auth: AuthenticationController::new(conn_id, Arc::clone(&state), client.clone()),
            game: GameController::new(conn_id, state, client),
        }
    }

    pub fn route(&mut self, msg: Message) -> Disposition {
        if AuthenticationController::is_interested_in(&msg) {
            self.auth.handle(msg)
        } else {
            self.game.handle(msg)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::mobile::Direction;

    fn auth_messages() -> Vec<Message> {
        vec![
            Message::LoginSeed { seed: 1 },
            Message::LoginRequest {
                user: "avatar".to_string(),
                password: "secret".to_string(),
            },
            Message::SelectServer { index: 0 },
        ]
    }

    fn game_messages() -> Vec<Message> {
        vec![
            Message::GameLogin {
                auth_key: 42,
                user: "avatar".to_string(),
                password: "secret".to_string(),
            },
            Message::CharacterSelect {
                slot: 0,
                name: "Avatar".to_string(),
            },
            Message::MoveRequest {
                direction: Direction::North,
                running: false,
                sequence: 0,
                fastwalk_key: 0,
            },
            Message::AttackRequest { serial: 2 },
            Message::WarMode { war: true },
            Message::DropItem {
                serial: 3,
                x: 0,
                y: 0,
                z: 0,
                container: 0,
            },
            Message::PingPong { sequence: 1 },
        ]
    }

    #[test]
    fn test_auth_is_the_only_controller_interested_in_login_messages() {
        for msg in auth_messages() {
            assert!(
                AuthenticationController::is_interested_in(&msg),
                "auth must claim {:#04X}",
                msg.opcode()
            );
            assert!(
                !GameController::is_interested_in(&msg),
                "game must not claim {:#04X}",
                msg.opcode()
            );
        }
    }

    #[test]
    fn test_game_is_the_only_controller_interested_in_game_messages() {
        for msg in game_messages() {
            assert!(
                GameController::is_interested_in(&msg),
                "game must claim {:#04X}",
                msg.opcode()
            );
            assert!(
                !AuthenticationController::is_interested_in(&msg),
                "auth must not claim {:#04X}",
                msg.opcode()
            );
        }
    }
}
