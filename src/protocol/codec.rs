//! Stateful frame decoder and message encoder.
//!
//! One [`MessageReader`] exists per live connection. A single socket read may
//! carry zero, one or many complete frames, and a frame may span multiple
//! reads, so the reader keeps an accumulation buffer and only hands back
//! complete messages. The first four bytes of every connection are the login
//! seed and carry no opcode; after that every frame is opcode-tagged with
//! either a fixed body length or an explicit u16 length prefix.

use bytes::{BufMut, Bytes, BytesMut};

use crate::protocol::{Message, MobileSnapshot};
use crate::world::item::Layer;
use crate::world::mobile::Direction;

/// Upper bound for a length-prefixed frame. Anything larger is treated as a
/// framing error and the connection buffer is discarded.
pub const MAX_FRAME_LEN: usize = 0x8000;

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("bad length prefix {len} for opcode {opcode:#04X}")]
    BadFrameLength { opcode: u8, len: usize },
}

enum FrameSize {
    Fixed(usize),
    /// Total frame length follows the opcode as a big-endian u16.
    Variable,
}

/// Frame sizes for client-originated opcodes. Unknown opcodes return None;
/// without a length there is no way to find the next frame boundary.
fn client_frame_size(opcode: u8) -> Option<FrameSize> {
    match opcode {
        0x02 => Some(FrameSize::Fixed(7)),
        0x05 => Some(FrameSize::Fixed(5)),
        0x06 => Some(FrameSize::Fixed(5)),
        0x07 => Some(FrameSize::Fixed(7)),
        0x08 => Some(FrameSize::Fixed(14)),
        0x09 => Some(FrameSize::Fixed(5)),
        0x13 => Some(FrameSize::Fixed(10)),
        0x22 => Some(FrameSize::Fixed(3)),
        0x34 => Some(FrameSize::Fixed(10)),
        0x5D => Some(FrameSize::Fixed(73)),
        0x72 => Some(FrameSize::Fixed(5)),
        0x73 => Some(FrameSize::Fixed(2)),
        0x80 => Some(FrameSize::Fixed(62)),
        0x91 => Some(FrameSize::Fixed(65)),
        0xA0 => Some(FrameSize::Fixed(3)),
        0xD9 => Some(FrameSize::Fixed(268)),
        0xAD | 0xBD | 0xBF => Some(FrameSize::Variable),
        _ => None,
    }
}

/// Per-connection stateful reader: bytes in, complete messages out.
pub struct MessageReader {
    buf: BytesMut,
    seed_pending: bool,
}

impl Default for MessageReader {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageReader {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
            seed_pending: true,
        }
    }

    /// Feeds raw bytes and returns every complete message. Partial frames
    /// stay buffered for the next call. A malformed length prefix discards
    /// the whole buffer; the frame boundary is unrecoverable at that point
    /// and the client has to reconnect to resync.
    pub fn read_messages(&mut self, bytes: &[u8]) -> Result<Vec<Message>, ProtocolError> {
        self.buf.extend_from_slice(bytes);
        let mut out = Vec::new();
        loop {
            if self.seed_pending {
                if self.buf.len() < 4 {
                    break;
                }
                let seed = be_u32(&self.buf[0..4]);
                let _ = self.buf.split_to(4);
                self.seed_pending = false;
                out.push(Message::LoginSeed { seed });
                continue;
            }
            if self.buf.is_empty() {
                break;
            }
            let opcode = self.buf[0];
            let frame_len = match client_frame_size(opcode) {
                None => {
                    tracing::warn!(
                        "[codec] unknown opcode {:#04X}, discarding {} buffered bytes",
                        opcode,
                        self.buf.len()
                    );
                    self.buf.clear();
                    break;
                }
                Some(FrameSize::Fixed(n)) => n,
                Some(FrameSize::Variable) => {
                    if self.buf.len() < 3 {
                        break;
                    }
                    let len = be_u16(&self.buf[1..3]) as usize;
                    if len < 3 || len > MAX_FRAME_LEN {
                        self.buf.clear();
                        return Err(ProtocolError::BadFrameLength { opcode, len });
                    }
                    len
                }
            };
            if self.buf.len() < frame_len {
                break;
            }
            let frame = self.buf.split_to(frame_len);
            if let Some(msg) = decode_frame(opcode, &frame) {
                out.push(msg);
            }
        }
        Ok(out)
    }
}

fn decode_frame(opcode: u8, frame: &[u8]) -> Option<Message> {
    let msg = match opcode {
        0x02 => Message::MoveRequest {
            direction: Direction::from_byte(frame[1]),
            running: frame[1] & 0x80 != 0,
            sequence: frame[2],
            fastwalk_key: be_u32(&frame[3..7]),
        },
        0x05 => Message::AttackRequest {
            serial: be_u32(&frame[1..5]),
        },
        0x06 => {
            let raw = be_u32(&frame[1..5]);
            Message::DoubleClick {
                serial: raw & 0x7FFF_FFFF,
                paperdoll: raw & 0x8000_0000 != 0,
            }
        }
        0x07 => Message::PickUpItem {
            serial: be_u32(&frame[1..5]),
            amount: be_u16(&frame[5..7]),
        },
        0x08 => Message::DropItem {
            serial: be_u32(&frame[1..5]),
            x: be_u16(&frame[5..7]),
            y: be_u16(&frame[7..9]),
            z: frame[9] as i8,
            container: be_u32(&frame[10..14]),
        },
        0x09 => Message::LookRequest {
            serial: be_u32(&frame[1..5]),
        },
        0x13 => Message::WearItem {
            serial: be_u32(&frame[1..5]),
            layer: Layer(frame[5]),
            mobile: be_u32(&frame[6..10]),
        },
        0x22 => Message::ResyncRequest { sequence: frame[1] },
        0x34 => Message::GetPlayerStatus {
            kind: frame[5],
            serial: be_u32(&frame[6..10]),
        },
        0x5D => Message::CharacterSelect {
            slot: be_u32(&frame[65..69]),
            name: fixed_string(&frame[5..35]),
        },
        0x72 => Message::WarMode {
            war: frame[1] != 0,
        },
        0x73 => Message::PingPong { sequence: frame[1] },
        0x80 => Message::LoginRequest {
            user: fixed_string(&frame[1..31]),
            password: fixed_string(&frame[31..61]),
        },
        0x91 => Message::GameLogin {
            auth_key: be_u32(&frame[1..5]),
            user: fixed_string(&frame[5..35]),
            password: fixed_string(&frame[35..65]),
        },
        0xA0 => Message::SelectServer {
            index: be_u16(&frame[1..3]),
        },
        0xAD => {
            if frame.len() < 12 {
                tracing::warn!("[codec] short speech frame ({} bytes), dropped", frame.len());
                return None;
            }
            Message::UnicodeSpeechRequest {
                kind: frame[3],
                hue: be_u16(&frame[4..6]),
                font: be_u16(&frame[6..8]),
                language: fixed_string(&frame[8..12]),
                text: utf16_be_string(&frame[12..]),
            }
        }
        0xBD => Message::ClientVersion {
            version: fixed_string(&frame[3..]),
        },
        0xBF => {
            if frame.len() < 5 {
                tracing::warn!("[codec] short 0xBF frame ({} bytes), dropped", frame.len());
                return None;
            }
            Message::GeneralInformation {
                subcommand: be_u16(&frame[3..5]),
            }
        }
        0xD9 => Message::SpyOnClient,
        _ => return None,
    };
    Some(msg)
}

/// Encodes a server-bound message to wire bytes. Client-originated variants
/// have no server-side encoding; they log an error and yield an empty frame,
/// which the writer drops.
pub fn encode(msg: &Message) -> Bytes {
    let mut buf = BytesMut::with_capacity(64);
    match msg {
        Message::ServerList { name, ip } => {
            buf.put_u8(0xA8);
            buf.put_u16(46);
            buf.put_u8(0x5D);
            buf.put_u16(1);
            buf.put_u16(0);
            put_fixed_string(&mut buf, name, 32);
            buf.put_u8(0); // load percent
            buf.put_u8(0); // timezone
            buf.put_slice(ip);
        }
        Message::ServerRedirect { ip, port, auth_key } => {
            buf.put_u8(0x8C);
            buf.put_slice(ip);
            buf.put_u16(*port);
            buf.put_u32(*auth_key);
        }
        Message::LoginDenied { reason } => {
            buf.put_u8(0x82);
            buf.put_u8(*reason);
        }
        Message::CharacterList { names, flags } => {
            let len = 3 + 1 + names.len() * 60 + 1 + 4;
            buf.put_u8(0xA9);
            buf.put_u16(len as u16);
            buf.put_u8(names.len() as u8);
            for name in names {
                put_fixed_string(&mut buf, name, 30);
                put_fixed_string(&mut buf, "", 30);
            }
            buf.put_u8(0); // starting cities
            buf.put_u32(*flags);
        }
        Message::LoginConfirm {
            serial,
            body,
            x,
            y,
            z,
            direction,
            notoriety,
            map_width,
            map_height,
        } => {
            buf.put_u8(0x1B);
            buf.put_u32(*serial);
            buf.put_u32(0);
            buf.put_u16(*body);
            buf.put_u16(*x);
            buf.put_u16(*y);
            buf.put_u16(*z as u8 as u16);
            buf.put_u8(*direction);
            buf.put_u8(notoriety.as_byte());
            buf.put_u32(0);
            buf.put_u32(0);
            buf.put_u8(0);
            buf.put_u16(*map_width);
            buf.put_u16(*map_height);
            buf.put_slice(&[0u8; 5]);
        }
        Message::LoginComplete => {
            buf.put_u8(0x55);
        }
        Message::SeasonalInformation { season } => {
            buf.put_u8(0xBC);
            buf.put_u8(*season);
            buf.put_u8(1); // play season sound
        }
        Message::OverallLightLevel { level } => {
            buf.put_u8(0x4F);
            buf.put_u8(*level);
        }
        Message::PersonalLightLevel { serial, level } => {
            buf.put_u8(0x4E);
            buf.put_u32(*serial);
            buf.put_u8(*level);
        }
        Message::ClientFeatures { flags } => {
            buf.put_u8(0xB9);
            buf.put_u16(*flags);
        }
        Message::ClientVersionRequest => {
            buf.put_u8(0xBD);
            buf.put_u16(3);
        }
        Message::MovementAck {
            sequence,
            notoriety,
        } => {
            buf.put_u8(0x22);
            buf.put_u8(*sequence);
            buf.put_u8(notoriety.as_byte());
        }
        Message::MovementReject {
            sequence,
            x,
            y,
            z,
            direction,
        } => {
            buf.put_u8(0x21);
            buf.put_u8(*sequence);
            buf.put_u16(*x);
            buf.put_u16(*y);
            buf.put_u8(*direction);
            buf.put_u8(*z as u8);
        }
        Message::UnicodeSpeech {
            serial,
            body,
            kind,
            hue,
            font,
            language,
            name,
            text,
        } => {
            let text_units: Vec<u16> = text.encode_utf16().collect();
            let len = 48 + text_units.len() * 2 + 2;
            buf.put_u8(0xAE);
            buf.put_u16(len as u16);
            buf.put_u32(*serial);
            buf.put_u16(*body);
            buf.put_u8(*kind);
            buf.put_u16(*hue);
            buf.put_u16(*font);
            put_fixed_string(&mut buf, language, 4);
            put_fixed_string(&mut buf, name, 30);
            for unit in text_units {
                buf.put_u16(unit);
            }
            buf.put_u16(0);
        }
        Message::AttackOk { serial } => {
            buf.put_u8(0x30);
            buf.put_u32(*serial);
        }
        Message::AttackSucceed { serial } => {
            buf.put_u8(0xAA);
            buf.put_u32(*serial);
        }
        Message::FightOccurring { attacker, attacked } => {
            buf.put_u8(0x2F);
            buf.put_u8(0);
            buf.put_u32(*attacker);
            buf.put_u32(*attacked);
        }
        Message::CharacterDraw(snap) => {
            encode_character_draw(&mut buf, snap);
        }
        Message::DrawGamePlayer(snap) => {
            buf.put_u8(0x20);
            buf.put_u32(snap.serial);
            buf.put_u16(snap.body);
            buf.put_u8(0);
            buf.put_u16(snap.hue);
            buf.put_u8(draw_flags(snap));
            buf.put_u16(snap.x);
            buf.put_u16(snap.y);
            buf.put_u16(0);
            buf.put_u8(snap.direction);
            buf.put_u8(snap.z as u8);
        }
        Message::UpdatePlayer(snap) => {
            buf.put_u8(0x77);
            buf.put_u32(snap.serial);
            buf.put_u16(snap.body);
            buf.put_u16(snap.x);
            buf.put_u16(snap.y);
            buf.put_u8(snap.z as u8);
            buf.put_u8(snap.direction);
            buf.put_u16(snap.hue);
            buf.put_u8(draw_flags(snap));
            buf.put_u8(snap.notoriety.as_byte());
        }
        Message::DeleteObject { serial } => {
            buf.put_u8(0x1D);
            buf.put_u32(*serial);
        }
        Message::ContainerItems { container, items } => {
            let len = 5 + items.len() * 17;
            buf.put_u8(0x3C);
            buf.put_u16(len as u16);
            buf.put_u16(items.len() as u16);
            for item in items {
                buf.put_u32(item.serial);
                buf.put_u16(item.model);
                buf.put_u8(0);
                buf.put_u16(item.amount);
                buf.put_u16(item.x);
                buf.put_u16(item.y);
                buf.put_u32(*container);
            }
        }
        Message::ObjectInfo {
            serial,
            model,
            amount,
            x,
            y,
            z,
        } => {
            buf.put_u8(0x1A);
            buf.put_u16(16);
            buf.put_u32(*serial);
            buf.put_u16(*model);
            buf.put_u16(*amount);
            buf.put_u16(*x);
            buf.put_u16(*y);
            buf.put_u8(*z as u8);
        }
        Message::ObjectRevision { serial, revision } => {
            buf.put_u8(0xDC);
            buf.put_u32(*serial);
            buf.put_u32(*revision);
        }
        Message::DragItem {
            model,
            hue,
            amount,
            source,
            source_x,
            source_y,
            source_z,
            target,
            target_x,
            target_y,
            target_z,
        } => {
            buf.put_u8(0x23);
            buf.put_u16(*model);
            buf.put_u8(0);
            buf.put_u16(*hue);
            buf.put_u16(*amount);
            buf.put_u32(*source);
            buf.put_u16(*source_x);
            buf.put_u16(*source_y);
            buf.put_u8(*source_z as u8);
            buf.put_u32(*target);
            buf.put_u16(*target_x);
            buf.put_u16(*target_y);
            buf.put_u8(*target_z as u8);
        }
        Message::Damage { serial, amount } => {
            buf.put_u8(0x0B);
            buf.put_u32(*serial);
            buf.put_u16(*amount);
        }
        Message::StatusBarInfo {
            serial,
            name,
            hits,
            max_hits,
        } => {
            buf.put_u8(0x11);
            buf.put_u16(43);
            buf.put_u32(*serial);
            put_fixed_string(&mut buf, name, 30);
            buf.put_u16(*hits);
            buf.put_u16(*max_hits);
            buf.put_u8(0); // name change not allowed
            buf.put_u8(0); // no extended status
        }
        Message::DeathAnimation { serial, corpse } => {
            buf.put_u8(0xAF);
            buf.put_u32(*serial);
            buf.put_u32(*corpse);
            buf.put_u32(0);
        }
        Message::CharacterAnimation {
            serial,
            action,
            backwards,
        } => {
            buf.put_u8(0x6E);
            buf.put_u32(*serial);
            buf.put_u16(*action);
            buf.put_u16(5); // frame count
            buf.put_u16(1); // repeat count
            buf.put_u8(u8::from(*backwards));
            buf.put_u8(0); // repeat flag
            buf.put_u8(1); // frame delay
        }
        Message::Paperdoll {
            serial,
            title,
            war_mode,
        } => {
            buf.put_u8(0x88);
            buf.put_u32(*serial);
            put_fixed_string(&mut buf, title, 60);
            buf.put_u8(u8::from(*war_mode));
        }
        Message::SendSpeech {
            serial,
            model,
            name,
            text,
        } => {
            let len = 44 + text.len() + 1;
            buf.put_u8(0x1C);
            buf.put_u16(len as u16);
            buf.put_u32(*serial);
            buf.put_u16(*model);
            buf.put_u8(0); // speech kind: regular
            buf.put_u16(0x03B2);
            buf.put_u16(3);
            put_fixed_string(&mut buf, name, 30);
            buf.put_slice(text.as_bytes());
            buf.put_u8(0);
        }
        Message::WarModeAck { war } => {
            buf.put_u8(0x72);
            buf.put_u8(u8::from(*war));
            buf.put_slice(&[0x00, 0x32, 0x00]);
        }
        Message::PingPong { sequence } => {
            buf.put_u8(0x73);
            buf.put_u8(*sequence);
        }
        other => {
            tracing::error!(
                "[codec] no server-side encoding for opcode {:#04X}",
                other.opcode()
            );
        }
    }
    buf.freeze()
}

fn encode_character_draw(buf: &mut BytesMut, snap: &MobileSnapshot) {
    let mut len = 19 + 4;
    for item in &snap.equipment {
        len += if item.hue != 0 { 9 } else { 7 };
    }
    buf.put_u8(0x78);
    buf.put_u16(len as u16);
    buf.put_u32(snap.serial);
    buf.put_u16(snap.body);
    buf.put_u16(snap.x);
    buf.put_u16(snap.y);
    buf.put_u8(snap.z as u8);
    buf.put_u8(snap.direction);
    buf.put_u16(snap.hue);
    buf.put_u8(draw_flags(snap));
    buf.put_u8(snap.notoriety.as_byte());
    for item in &snap.equipment {
        buf.put_u32(item.serial);
        if item.hue != 0 {
            buf.put_u16(item.model | 0x8000);
            buf.put_u8(item.layer.as_byte());
            buf.put_u16(item.hue);
        } else {
            buf.put_u16(item.model);
            buf.put_u8(item.layer.as_byte());
        }
    }
    buf.put_u32(0);
}

fn draw_flags(snap: &MobileSnapshot) -> u8 {
    if snap.war_mode {
        0x40
    } else {
        0x00
    }
}

fn be_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Null-padded fixed-width ascii field, trailing nulls trimmed.
fn fixed_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn put_fixed_string(buf: &mut BytesMut, s: &str, width: usize) {
    let bytes = s.as_bytes();
    let take = bytes.len().min(width);
    buf.put_slice(&bytes[..take]);
    for _ in take..width {
        buf.put_u8(0);
    }
}

/// Big-endian UTF-16, terminated by a null unit or the end of the slice.
fn utf16_be_string(bytes: &[u8]) -> String {
    let mut units = Vec::with_capacity(bytes.len() / 2);
    for pair in bytes.chunks_exact(2) {
        let unit = u16::from_be_bytes([pair[0], pair[1]]);
        if unit == 0 {
            break;
        }
        units.push(unit);
    }
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::mobile::Notoriety;

    fn seed_frame() -> Vec<u8> {
        vec![0x7F, 0x00, 0x00, 0x01]
    }

    fn move_frame(direction: u8, sequence: u8) -> Vec<u8> {
        vec![0x02, direction, sequence, 0xDE, 0xAD, 0xBE, 0xEF]
    }

    #[test]
    fn test_seed_decoded_first() {
        let mut reader = MessageReader::new();
        let msgs = reader.read_messages(&seed_frame()).unwrap();
        assert_eq!(msgs, vec![Message::LoginSeed { seed: 0x7F000001 }]);
    }

    #[test]
    fn test_message_spanning_two_reads() {
        let mut reader = MessageReader::new();
        reader.read_messages(&seed_frame()).unwrap();

        let frame = move_frame(0x02, 1);
        let msgs = reader.read_messages(&frame[..3]).unwrap();
        assert!(msgs.is_empty());
        let msgs = reader.read_messages(&frame[3..]).unwrap();
        assert_eq!(msgs.len(), 1);
        assert!(matches!(
            msgs[0],
            Message::MoveRequest {
                direction: Direction::East,
                running: false,
                sequence: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_many_messages_in_one_read() {
        let mut reader = MessageReader::new();
        let mut bytes = seed_frame();
        bytes.extend(move_frame(0x00, 1));
        bytes.extend(move_frame(0x80, 2)); // running north
        bytes.extend([0x73, 0x09]); // ping
        let msgs = reader.read_messages(&bytes).unwrap();
        assert_eq!(msgs.len(), 4);
        assert!(matches!(
            msgs[2],
            Message::MoveRequest { running: true, .. }
        ));
        assert_eq!(msgs[3], Message::PingPong { sequence: 9 });
    }

    #[test]
    fn test_unknown_opcode_discards_buffer() {
        let mut reader = MessageReader::new();
        reader.read_messages(&seed_frame()).unwrap();
        let mut bytes = vec![0xE7, 0x01, 0x02];
        bytes.extend(move_frame(0x00, 1));
        let msgs = reader.read_messages(&bytes).unwrap();
        // Everything after the unknown opcode is gone, including the valid
        // move request behind it.
        assert!(msgs.is_empty());
        // The reader keeps working for subsequent frames.
        let msgs = reader.read_messages(&move_frame(0x00, 1)).unwrap();
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn test_bad_length_prefix_is_an_error() {
        let mut reader = MessageReader::new();
        reader.read_messages(&seed_frame()).unwrap();
        let err = reader.read_messages(&[0xAD, 0x00, 0x01]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::BadFrameLength { opcode: 0xAD, len: 1 }
        ));
    }

    #[test]
    fn test_login_request_strings_trimmed() {
        let mut reader = MessageReader::new();
        reader.read_messages(&seed_frame()).unwrap();
        let mut frame = vec![0u8; 62];
        frame[0] = 0x80;
        frame[1..7].copy_from_slice(b"avatar");
        frame[31..37].copy_from_slice(b"secret");
        let msgs = reader.read_messages(&frame).unwrap();
        assert_eq!(
            msgs[0],
            Message::LoginRequest {
                user: "avatar".to_string(),
                password: "secret".to_string(),
            }
        );
    }

    #[test]
    fn test_speech_request_utf16() {
        let mut reader = MessageReader::new();
        reader.read_messages(&seed_frame()).unwrap();
        let text: Vec<u16> = "hail".encode_utf16().collect();
        let len = 12 + text.len() * 2 + 2;
        let mut frame = Vec::new();
        frame.push(0xAD);
        frame.extend((len as u16).to_be_bytes());
        frame.push(0x00); // kind
        frame.extend(0x02B2u16.to_be_bytes()); // hue
        frame.extend(0x0003u16.to_be_bytes()); // font
        frame.extend(b"ENU\0");
        for unit in &text {
            frame.extend(unit.to_be_bytes());
        }
        frame.extend([0x00, 0x00]);
        let msgs = reader.read_messages(&frame).unwrap();
        match &msgs[0] {
            Message::UnicodeSpeechRequest {
                hue,
                language,
                text,
                ..
            } => {
                assert_eq!(*hue, 0x02B2);
                assert_eq!(language, "ENU");
                assert_eq!(text, "hail");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_encode_movement_reject_layout() {
        let bytes = encode(&Message::MovementReject {
            sequence: 5,
            x: 0x1234,
            y: 0x0456,
            z: -3,
            direction: 0x82,
        });
        assert_eq!(bytes.len(), 8);
        assert_eq!(bytes[0], 0x21);
        assert_eq!(bytes[1], 5);
        assert_eq!(&bytes[2..4], &[0x12, 0x34]);
        assert_eq!(&bytes[4..6], &[0x04, 0x56]);
        assert_eq!(bytes[6], 0x82);
        assert_eq!(bytes[7], (-3i8) as u8);
    }

    #[test]
    fn test_encode_character_draw_length_field() {
        let snap = MobileSnapshot {
            serial: 1,
            body: 0x190,
            hue: 0,
            x: 100,
            y: 100,
            z: 0,
            direction: 0,
            notoriety: Notoriety::Innocent,
            war_mode: false,
            equipment: vec![
                crate::protocol::EquippedItem {
                    serial: 0x4000_0001,
                    model: 0x0E75,
                    layer: Layer::BACKPACK,
                    hue: 0,
                },
                crate::protocol::EquippedItem {
                    serial: 0x4000_0002,
                    model: 0x1515,
                    layer: Layer::TORSO,
                    hue: 0x0021,
                },
            ],
        };
        let bytes = encode(&Message::CharacterDraw(snap));
        let declared = u16::from_be_bytes([bytes[1], bytes[2]]) as usize;
        assert_eq!(declared, bytes.len());
    }

    #[test]
    fn test_client_only_variant_encodes_empty() {
        let bytes = encode(&Message::AttackRequest { serial: 7 });
        assert!(bytes.is_empty());
    }
}
