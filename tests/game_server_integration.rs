use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use sosaria::core::ServerControl;
use sosaria::servers::game::{self, GameState};

async fn start_test_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let state = GameState::test_only();
    let control = Arc::new(ServerControl::new());

    tokio::spawn(async move {
        game::run(state, listener, control).await.unwrap();
    });

    addr
}

const SEED: &[u8] = &[0x7F, 0x00, 0x00, 0x01];

fn login_request(user: &str, password: &str) -> Vec<u8> {
    let mut pkt = vec![0u8; 62];
    pkt[0] = 0x80;
    pkt[1..1 + user.len()].copy_from_slice(user.as_bytes());
    pkt[31..31 + password.len()].copy_from_slice(password.as_bytes());
    pkt
}

fn game_login(auth_key: u32, user: &str, password: &str) -> Vec<u8> {
    let mut pkt = vec![0u8; 65];
    pkt[0] = 0x91;
    pkt[1..5].copy_from_slice(&auth_key.to_be_bytes());
    pkt[5..5 + user.len()].copy_from_slice(user.as_bytes());
    pkt[35..35 + password.len()].copy_from_slice(password.as_bytes());
    pkt
}

fn character_select(slot: u32, name: &str) -> Vec<u8> {
    let mut pkt = vec![0u8; 73];
    pkt[0] = 0x5D;
    pkt[5..5 + name.len()].copy_from_slice(name.as_bytes());
    pkt[65..69].copy_from_slice(&slot.to_be_bytes());
    pkt
}

fn client_version(version: &str) -> Vec<u8> {
    let len = 3 + version.len() + 1;
    let mut pkt = Vec::with_capacity(len);
    pkt.push(0xBD);
    pkt.extend((len as u16).to_be_bytes());
    pkt.extend(version.as_bytes());
    pkt.push(0);
    pkt
}

fn move_request(direction: u8, sequence: u8) -> Vec<u8> {
    vec![0x02, direction, sequence, 0x00, 0x00, 0x00, 0x00]
}

/// Reads one server frame: opcode plus its fixed body, or a u16 length
/// prefix for variable packets.
async fn read_message(client: &mut TcpStream) -> (u8, Vec<u8>) {
    let mut opcode = [0u8; 1];
    client.read_exact(&mut opcode).await.unwrap();
    let opcode = opcode[0];

    let fixed = match opcode {
        0x0B => Some(7),
        0x1B => Some(37),
        0x1D => Some(5),
        0x20 => Some(19),
        0x21 => Some(8),
        0x22 => Some(3),
        0x23 => Some(26),
        0x2F => Some(10),
        0x30 => Some(5),
        0x4E => Some(6),
        0x4F => Some(2),
        0x55 => Some(1),
        0x6E => Some(14),
        0x72 => Some(5),
        0x73 => Some(2),
        0x77 => Some(17),
        0x82 => Some(2),
        0x88 => Some(66),
        0x8C => Some(11),
        0xAA => Some(5),
        0xAF => Some(13),
        0xB9 => Some(3),
        0xBC => Some(3),
        0xDC => Some(9),
        0x11 => Some(43),
        _ => None,
    };

    let mut frame = vec![opcode];
    match fixed {
        Some(total) => {
            let mut body = vec![0u8; total - 1];
            client.read_exact(&mut body).await.unwrap();
            frame.extend(body);
        }
        None => {
            let mut len = [0u8; 2];
            client.read_exact(&mut len).await.unwrap();
            let total = u16::from_be_bytes(len) as usize;
            frame.extend(len);
            let mut body = vec![0u8; total - 3];
            client.read_exact(&mut body).await.unwrap();
            frame.extend(body);
        }
    }
    (opcode, frame)
}

/// Reads frames until `wanted` shows up, panicking after too many.
async fn read_until(client: &mut TcpStream, wanted: u8) -> Vec<u8> {
    for _ in 0..64 {
        let (opcode, frame) = read_message(client).await;
        if opcode == wanted {
            return frame;
        }
    }
    panic!("never received opcode {wanted:#04X}");
}

/// Runs the two-connection handshake to an in-game session and returns the
/// game connection.
async fn login_to_game(addr: SocketAddr) -> TcpStream {
    let mut login = TcpStream::connect(addr).await.unwrap();
    login.write_all(SEED).await.unwrap();
    login.write_all(&login_request("avatar", "secret")).await.unwrap();
    let (opcode, _) = read_message(&mut login).await;
    assert_eq!(opcode, 0xA8, "server list expected");
    login.write_all(&[0xA0, 0x00, 0x00]).await.unwrap();
    let redirect = read_until(&mut login, 0x8C).await;
    let auth_key = u32::from_be_bytes([redirect[7], redirect[8], redirect[9], redirect[10]]);
    assert_ne!(auth_key, 0);

    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(SEED).await.unwrap();
    client
        .write_all(&game_login(auth_key, "avatar", "secret"))
        .await
        .unwrap();
    let chars = read_until(&mut client, 0xA9).await;
    assert_eq!(chars[3], 1, "one playable character");

    client
        .write_all(&character_select(0, "Avatar"))
        .await
        .unwrap();
    read_until(&mut client, 0xBD).await;

    client.write_all(&client_version("7.0.15.0")).await.unwrap();
    let confirm = read_until(&mut client, 0x1B).await;
    assert_eq!(
        u32::from_be_bytes([confirm[1], confirm[2], confirm[3], confirm[4]]),
        1,
        "login confirm carries the character serial"
    );
    read_until(&mut client, 0x55).await;
    client
}

#[tokio::test]
async fn test_bad_password_denied() {
    let addr = start_test_server().await;
    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(SEED).await.unwrap();
    client
        .write_all(&login_request("avatar", "wrong"))
        .await
        .unwrap();
    let (opcode, frame) = read_message(&mut client).await;
    assert_eq!(opcode, 0x82);
    assert_eq!(frame[1], 0x03);
    // The server closes the connection after a denial.
    let mut rest = Vec::new();
    let n = client.read_to_end(&mut rest).await.unwrap();
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_stale_auth_key_closes_game_connection() {
    let addr = start_test_server().await;
    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(SEED).await.unwrap();
    client
        .write_all(&game_login(0xDEAD_BEEF, "avatar", "secret"))
        .await
        .unwrap();
    let mut rest = Vec::new();
    let n = client.read_to_end(&mut rest).await.unwrap();
    assert_eq!(n, 0, "no session without a redeemable key");
}

#[tokio::test]
async fn test_full_login_reaches_game() {
    let addr = start_test_server().await;
    let _client = login_to_game(addr).await;
}

#[tokio::test]
async fn test_movement_ack_and_reject() {
    let addr = start_test_server().await;
    let mut client = login_to_game(addr).await;

    // First request must carry sequence 0. East of the spawn direction, so
    // the mobile actually steps.
    client.write_all(&move_request(0x02, 0)).await.unwrap();
    let ack = read_until(&mut client, 0x22).await;
    assert_eq!(ack[1], 0);

    // Replayed sequence: rejected with the authoritative position, and the
    // tracker stays put.
    client.write_all(&move_request(0x02, 0)).await.unwrap();
    let reject = read_until(&mut client, 0x21).await;
    assert_eq!(reject[1], 0);
    let x = u16::from_be_bytes([reject[2], reject[3]]);
    let y = u16::from_be_bytes([reject[4], reject[5]]);
    assert_eq!((x, y), (101, 100));

    // The expected sequence is still 1.
    client.write_all(&move_request(0x02, 1)).await.unwrap();
    let ack = read_until(&mut client, 0x22).await;
    assert_eq!(ack[1], 1);
}

#[tokio::test]
async fn test_speech_echoes_to_speaker() {
    let addr = start_test_server().await;
    let mut client = login_to_game(addr).await;

    let text: Vec<u16> = "hail".encode_utf16().collect();
    let len = 12 + text.len() * 2 + 2;
    let mut pkt = Vec::new();
    pkt.push(0xAD);
    pkt.extend((len as u16).to_be_bytes());
    pkt.push(0x00);
    pkt.extend(0x02B2u16.to_be_bytes());
    pkt.extend(0x0003u16.to_be_bytes());
    pkt.extend(b"ENU\0");
    for unit in &text {
        pkt.extend(unit.to_be_bytes());
    }
    pkt.extend([0x00, 0x00]);
    client.write_all(&pkt).await.unwrap();

    let speech = read_until(&mut client, 0xAE).await;
    let serial = u32::from_be_bytes([speech[3], speech[4], speech[5], speech[6]]);
    assert_eq!(serial, 1, "the speaker hears its own line");
}

#[tokio::test]
async fn test_ping_echo() {
    let addr = start_test_server().await;
    let mut client = login_to_game(addr).await;
    client.write_all(&[0x73, 0x2A]).await.unwrap();
    let pong = read_until(&mut client, 0x73).await;
    assert_eq!(pong[1], 0x2A);
}
