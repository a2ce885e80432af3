//! Game server: listener, shared state, combat ticker.

pub mod auth;
pub mod client;
pub mod controller;
pub mod router;

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::core::ServerControl;
use crate::game::Shard;
use crate::network::ConnId;
use crate::servers::game::auth::LoginManager;
use crate::world::World;

pub struct GameState {
    pub config: ServerConfig,
    pub login: LoginManager,
    shard: Mutex<Shard>,
    next_conn_id: AtomicU32,
}

impl GameState {
    pub fn new(config: ServerConfig) -> Self {
        let world = World::from_config(&config);
        let login = LoginManager::from_config(&config);
        Self {
            config,
            login,
            shard: Mutex::new(Shard::new(world)),
            next_conn_id: AtomicU32::new(1),
        }
    }

    /// State backed by the built-in test fixture, for integration tests.
    pub fn test_only() -> Arc<Self> {
        Arc::new(Self::new(ServerConfig::test_only()))
    }

    pub fn allocate_conn_id(&self) -> ConnId {
        self.next_conn_id.fetch_add(1, Ordering::Relaxed)
    }

    /// The shard mutex is never held across an await point, so a poisoned
    /// lock only means a handler panicked mid-mutation; we keep serving with
    /// the state as it stands.
    pub fn lock_shard(&self) -> MutexGuard<'_, Shard> {
        self.shard.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Accept loop plus the combat bookkeeping ticker. Returns when shutdown is
/// requested through `control`.
pub async fn run(
    state: Arc<GameState>,
    listener: TcpListener,
    control: Arc<ServerControl>,
) -> Result<()> {
    tracing::info!(
        "[game] [started] {} listening on {}",
        state.config.world_name,
        listener.local_addr()?
    );

    let tick_state = Arc::clone(&state);
    let tick_control = Arc::clone(&control);
    let ticker = tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(Duration::from_millis(tick_state.config.combat_tick_ms));
        loop {
            interval.tick().await;
            if tick_control.should_shutdown() {
                break;
            }
            tick_state.lock_shard().combat_tick();
        }
    });

    loop {
        if control.should_shutdown() {
            tracing::info!("[game] shutdown requested");
            break;
        }
        match tokio::time::timeout(Duration::from_millis(100), listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                let state = Arc::clone(&state);
                tokio::spawn(client::handle_connection(state, stream, peer));
            }
            Ok(Err(err)) => {
                tracing::error!("[game] accept error: {}", err);
            }
            Err(_) => {
                // Timeout: re-check the shutdown flag.
            }
        }
    }

    let _ = ticker.await;
    Ok(())
}
