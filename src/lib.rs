//! Sosaria - MMORPG Server
//!
//! A protocol session engine for a classic MMO wire protocol: binary frame
//! decoding, per-connection controllers, per-player session state, and the
//! inter-session broadcast bus that keeps every client's view of the shared
//! world in sync.

/// Server configuration
pub mod config;
/// Server lifecycle (shutdown control)
pub mod core;
/// Game state: shard, sessions, movement, combat, broadcast bus
pub mod game;
/// Client transport plumbing (bounded outbound queues)
pub mod network;
/// Wire message model and codec
pub mod protocol;
/// Server implementation (listener, controllers, routing)
pub mod servers;
/// World registries: mobiles, items, containers, tiles
pub mod world;

pub use crate::config::ServerConfig;
pub use crate::core::ServerControl;
pub use crate::game::movement::MovementTracker;
pub use crate::game::player_session::PlayerSession;
pub use crate::game::Shard;
pub use crate::protocol::codec::MessageReader;
pub use crate::protocol::Message;
pub use crate::servers::game::GameState;
