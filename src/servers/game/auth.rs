//! Authentication-phase controller and account lookup.
//!
//! The login collaborator proper (account persistence, billing, bans) is out
//! of scope; [`LoginManager`] is the narrow in-memory stand-in the rest of
//! the server consumes. The handshake follows the classic two-connection
//! scheme: credentials on the first connection buy a one-shot auth key via
//! the server redirect, and the key redeems a session on the second.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError};

use rand::RngExt;

use crate::config::ServerConfig;
use crate::network::ClientChannel;
use crate::protocol::Message;
use crate::servers::game::router::Disposition;
use crate::servers::game::GameState;
use crate::world::mobile::Serial;

const DENY_BAD_CREDENTIALS: u8 = 0x03;

#[derive(Debug, Clone)]
pub struct Account {
    pub user: String,
    pub password: String,
    pub characters: Vec<Serial>,
}

pub struct LoginManager {
    accounts: HashMap<String, Account>,
    /// Outstanding redirect keys, redeemed exactly once at game login.
    pending: Mutex<HashMap<u32, String>>,
}

impl LoginManager {
    pub fn from_config(config: &ServerConfig) -> Self {
        let accounts = config
            .accounts
            .iter()
            .map(|acc| {
                (
                    acc.user.clone(),
                    Account {
                        user: acc.user.clone(),
                        password: acc.password.clone(),
                        characters: acc.characters.iter().map(|ch| ch.serial).collect(),
                    },
                )
            })
            .collect();
        Self {
            accounts,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn authenticate(&self, user: &str, password: &str) -> Option<Account> {
        let account = self.accounts.get(user)?;
        if account.password == password {
            Some(account.clone())
        } else {
            None
        }
    }

    /// Issues a fresh redirect key for an authenticated user.
    pub fn issue_key(&self, user: &str) -> u32 {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let mut rng = rand::rng();
        loop {
            let key: u32 = rng.random();
            if key != 0 && !pending.contains_key(&key) {
                pending.insert(key, user.to_string());
                return key;
            }
        }
    }

    /// Redeems a redirect key. Each key works once.
    pub fn authorized_account(&self, key: u32) -> Option<Account> {
        let user = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)?;
        self.accounts.get(&user).cloned()
    }
}

/// Controller for the pre-login phase of a connection.
pub struct AuthenticationController {
    conn_id: u32,
    state: Arc<GameState>,
    client: ClientChannel,
    seed: Option<u32>,
    account: Option<Account>,
}

impl AuthenticationController {
    pub fn new(conn_id: u32, state: Arc<GameState>, client: ClientChannel) -> Self {
        Self {
            conn_id,
            state,
            client,
            seed: None,
            account: None,
        }
    }

    /// Static interest partition: exactly the connection-establishment
    /// messages, nothing else. Disjoint with the game controller by
    /// construction.
    pub fn is_interested_in(msg: &Message) -> bool {
        matches!(
            msg,
            Message::LoginSeed { .. } | Message::LoginRequest { .. } | Message::SelectServer { .. }
        )
    }

    pub fn handle(&mut self, msg: Message) -> Disposition {
        match msg {
            Message::LoginSeed { seed } => {
                tracing::debug!("[auth] conn={} seed={:08X}", self.conn_id, seed);
                self.seed = Some(seed);
                Disposition::Continue
            }
            Message::LoginRequest { user, password } => {
                match self.state.login.authenticate(&user, &password) {
                    Some(account) => {
                        tracing::info!("[auth] [login_ok] conn={} user={}", self.conn_id, user);
                        self.account = Some(account);
                        self.client.send(Message::ServerList {
                            name: self.state.config.world_name.clone(),
                            ip: server_ip(&self.state.config),
                        });
                        Disposition::Continue
                    }
                    None => {
                        tracing::info!("[auth] [login_denied] conn={} user={}", self.conn_id, user);
                        self.client.send(Message::LoginDenied {
                            reason: DENY_BAD_CREDENTIALS,
                        });
                        Disposition::Close
                    }
                }
            }
            Message::SelectServer { index } => {
                let Some(account) = &self.account else {
                    tracing::warn!(
                        "[auth] conn={} server select before login, closing",
                        self.conn_id
                    );
                    return Disposition::Close;
                };
                let auth_key = self.state.login.issue_key(&account.user);
                tracing::debug!(
                    "[auth] [redirect] conn={} index={} seed={:08X} key={:08X}",
                    self.conn_id,
                    index,
                    self.seed.unwrap_or(0),
                    auth_key
                );
                self.client.send(Message::ServerRedirect {
                    ip: server_ip(&self.state.config),
                    port: self.state.config.game_port,
                    auth_key,
                });
                Disposition::Continue
            }
            other => {
                tracing::warn!(
                    "[auth] conn={} unexpected opcode {:#04X}",
                    self.conn_id,
                    other.opcode()
                );
                Disposition::Continue
            }
        }
    }
}

fn server_ip(config: &ServerConfig) -> [u8; 4] {
    match config.game_ip.parse::<Ipv4Addr>() {
        Ok(ip) => ip.octets(),
        Err(_) => {
            tracing::warn!("[auth] game_ip '{}' is not an IPv4 address", config.game_ip);
            [127, 0, 0, 1]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authenticate_checks_password() {
        let login = LoginManager::from_config(&ServerConfig::test_only());
        assert!(login.authenticate("avatar", "secret").is_some());
        assert!(login.authenticate("avatar", "wrong").is_none());
        assert!(login.authenticate("nobody", "secret").is_none());
    }

    #[test]
    fn test_auth_key_redeems_once() {
        let login = LoginManager::from_config(&ServerConfig::test_only());
        let key = login.issue_key("avatar");
        let account = login.authorized_account(key).expect("key must redeem");
        assert_eq!(account.user, "avatar");
        assert_eq!(account.characters, vec![1]);
        assert!(login.authorized_account(key).is_none());
    }

    #[test]
    fn test_unknown_key_rejected() {
        let login = LoginManager::from_config(&ServerConfig::test_only());
        assert!(login.authorized_account(0xDEAD_BEEF).is_none());
    }
}
