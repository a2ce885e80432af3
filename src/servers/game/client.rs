//! Per-connection driver task.
//!
//! Each accepted socket gets one reader loop (bytes -> frame decoder ->
//! router) and one writer task draining the connection's bounded outbound
//! queue. The decoder state lives on this task's stack and dies with it; a
//! reconnect starts from a fresh reader, seed first.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::network::{ClientChannel, ConnId, OUTBOUND_QUEUE_DEPTH};
use crate::protocol::codec::{self, MessageReader};
use crate::protocol::Message;
use crate::servers::game::router::{Disposition, ProtocolRouter};
use crate::servers::game::GameState;

pub async fn handle_connection(state: Arc<GameState>, stream: TcpStream, peer: SocketAddr) {
    let conn_id = state.allocate_conn_id();
    tracing::info!("[game] [connect] conn={} peer={}", conn_id, peer);

    let (mut read_half, write_half) = stream.into_split();
    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
    let client = ClientChannel::new(conn_id, tx);
    let writer = tokio::spawn(write_loop(conn_id, write_half, rx));

    let mut reader = MessageReader::new();
    let mut router = ProtocolRouter::new(conn_id, Arc::clone(&state), client);
    let mut buf = vec![0u8; 4096];

    'conn: loop {
        match read_half.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!("[game] conn={} closed by peer", conn_id);
                break;
            }
            Ok(n) => {
                let messages = match reader.read_messages(&buf[..n]) {
                    Ok(messages) => messages,
                    Err(err) => {
                        // The frame boundary is unrecoverable; this client
                        // has to reconnect.
                        tracing::warn!("[game] conn={} framing error: {}", conn_id, err);
                        break;
                    }
                };
                for msg in messages {
                    tracing::trace!(
                        "[game] [packet_in] conn={} op={:#04X}",
                        conn_id,
                        msg.opcode()
                    );
                    if router.route(msg) == Disposition::Close {
                        break 'conn;
                    }
                }
            }
            Err(err) => {
                tracing::warn!("[game] conn={} read error: {}", conn_id, err);
                break;
            }
        }
    }

    // Unsubscribe from the bus and tear down combat state in one critical
    // section; in-flight broadcasts after this point simply no longer see
    // the session.
    state.lock_shard().remove_session(conn_id);
    drop(router);
    let _ = writer.await;
    tracing::info!("[game] [disconnect] conn={}", conn_id);
}

/// Drains the outbound queue onto the socket. Ends when every sender is gone
/// or the peer stops accepting writes; either way the failure stays on this
/// connection.
async fn write_loop(conn_id: ConnId, mut half: OwnedWriteHalf, mut rx: mpsc::Receiver<Message>) {
    while let Some(msg) = rx.recv().await {
        let bytes = codec::encode(&msg);
        if bytes.is_empty() {
            continue;
        }
        if let Err(err) = half.write_all(&bytes).await {
            tracing::debug!("[game] conn={} write error: {}", conn_id, err);
            break;
        }
    }
}
