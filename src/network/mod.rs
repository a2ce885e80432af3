//! Client transport plumbing.
//!
//! Broadcast fan-out must never block on a slow socket, so every connection
//! gets a bounded outbound queue. Game logic pushes typed messages with
//! [`ClientChannel::send`]; a writer task owned by the connection drains the
//! queue and does the actual socket I/O. A full queue or a dead receiver is
//! a transport failure of that one client only: the message is dropped with
//! a log line and nobody else notices.

use tokio::sync::mpsc;

use crate::protocol::Message;

/// Connection identifier, unique for the lifetime of the process.
pub type ConnId = u32;

/// Outbound messages buffered per connection before drops start.
pub const OUTBOUND_QUEUE_DEPTH: usize = 256;

#[derive(Clone)]
pub struct ClientChannel {
    conn_id: ConnId,
    tx: mpsc::Sender<Message>,
}

impl ClientChannel {
    pub fn new(conn_id: ConnId, tx: mpsc::Sender<Message>) -> Self {
        Self { conn_id, tx }
    }

    pub fn conn_id(&self) -> ConnId {
        self.conn_id
    }

    /// Fire-and-forget send. Never blocks; failures are logged and swallowed
    /// at this boundary so they cannot leak into world mutation.
    pub fn send(&self, msg: Message) {
        match self.tx.try_send(msg) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(msg)) => {
                tracing::warn!(
                    "[net] conn={} outbound queue full, dropping {:#04X}",
                    self.conn_id,
                    msg.opcode()
                );
            }
            Err(mpsc::error::TrySendError::Closed(msg)) => {
                tracing::debug!(
                    "[net] conn={} gone, dropping {:#04X}",
                    self.conn_id,
                    msg.opcode()
                );
            }
        }
    }

    pub fn send_all<I: IntoIterator<Item = Message>>(&self, msgs: I) {
        for msg in msgs {
            self.send(msg);
        }
    }

    /// Channel plus receiver end, for tests that assert on emitted messages.
    #[cfg(test)]
    pub fn test_pair(conn_id: ConnId) -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        (Self::new(conn_id, tx), rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_is_nonblocking_and_lossy_when_full() {
        let (tx, mut rx) = mpsc::channel(1);
        let channel = ClientChannel::new(1, tx);
        channel.send(Message::LoginComplete);
        // Queue depth is 1: the second message is dropped, not queued.
        channel.send(Message::LoginComplete);
        assert_eq!(rx.try_recv().unwrap(), Message::LoginComplete);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_send_to_closed_receiver_is_swallowed() {
        let (channel, rx) = ClientChannel::test_pair(9);
        drop(rx);
        channel.send(Message::LoginComplete);
    }
}
