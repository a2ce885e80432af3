use std::sync::Arc;

use anyhow::{Context, Result};
use sosaria::config::ServerConfig;
use sosaria::core::ServerControl;
use sosaria::servers::game::{self, GameState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr()))
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut conf_file = "conf/server.yaml".to_string();

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "--h" | "--?" | "/?" => {
                println!("Usage: game_server [--conf FILE]");
                return Ok(());
            }
            "--conf" => {
                if i + 1 < args.len() {
                    i += 1;
                    conf_file = args[i].clone();
                } else {
                    eprintln!("Error: --conf requires a FILE argument");
                    return Ok(());
                }
            }
            _ => {}
        }
        i += 1;
    }

    let config = ServerConfig::from_file(&conf_file)
        .with_context(|| format!("Cannot load config: {}", conf_file))?;

    let bind = format!("{}:{}", config.game_ip, config.game_port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Cannot bind {}", bind))?;

    let state = Arc::new(GameState::new(config));
    let control = Arc::new(ServerControl::new());

    let signal_control = Arc::clone(&control);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("[game] interrupt received");
            signal_control.request_shutdown();
        }
    });

    game::run(state, listener, control).await?;
    Ok(())
}
