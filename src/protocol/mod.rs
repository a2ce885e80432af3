//! Wire message model.
//!
//! One closed enum covers every message the server can receive or emit, each
//! variant tagged with its opcode. The codec (see [`codec`]) turns raw bytes
//! into these and back; everything above this layer works on typed values
//! only.

pub mod codec;

use crate::world::item::Layer;
use crate::world::mobile::{Direction, Mobile, Notoriety};
use crate::world::World;

/// Point-in-time view of a mobile for client-bound draw packets. Taken while
/// the world lock is held so the encoded bytes can't tear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MobileSnapshot {
    pub serial: u32,
    pub body: u16,
    pub hue: u16,
    pub x: u16,
    pub y: u16,
    pub z: i8,
    /// Direction byte with the running flag folded in.
    pub direction: u8,
    pub notoriety: Notoriety,
    pub war_mode: bool,
    pub equipment: Vec<EquippedItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquippedItem {
    pub serial: u32,
    pub model: u16,
    pub layer: Layer,
    pub hue: u16,
}

impl MobileSnapshot {
    pub fn of(mobile: &Mobile, world: &World) -> Self {
        let mut equipment: Vec<EquippedItem> = mobile
            .equipment()
            .filter_map(|(layer, serial)| {
                let item = world.find_item(serial)?;
                Some(EquippedItem {
                    serial,
                    model: item.model,
                    layer,
                    hue: item.hue,
                })
            })
            .collect();
        equipment.sort_by_key(|e| e.layer.as_byte());
        Self {
            serial: mobile.serial,
            body: mobile.body,
            hue: mobile.hue,
            x: mobile.x,
            y: mobile.y,
            z: mobile.z,
            direction: mobile.direction_with_running(),
            notoriety: mobile.notoriety,
            war_mode: mobile.in_war_mode(),
            equipment,
        }
    }
}

/// One slot of a container-contents packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainedItem {
    pub serial: u32,
    pub model: u16,
    pub hue: u16,
    pub amount: u16,
    pub x: u16,
    pub y: u16,
    pub container: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    // ======================== client -> server ========================
    /// First four bytes of a fresh connection; carries no opcode.
    LoginSeed {
        seed: u32,
    },
    LoginRequest {
        user: String,
        password: String,
    },
    SelectServer {
        index: u16,
    },
    GameLogin {
        auth_key: u32,
        user: String,
        password: String,
    },
    CharacterSelect {
        slot: u32,
        name: String,
    },
    ClientVersion {
        version: String,
    },
    MoveRequest {
        direction: Direction,
        running: bool,
        sequence: u8,
        fastwalk_key: u32,
    },
    ResyncRequest {
        sequence: u8,
    },
    UnicodeSpeechRequest {
        kind: u8,
        hue: u16,
        font: u16,
        language: String,
        text: String,
    },
    AttackRequest {
        serial: u32,
    },
    WarMode {
        war: bool,
    },
    DropItem {
        serial: u32,
        x: u16,
        y: u16,
        z: i8,
        container: u32,
    },
    WearItem {
        serial: u32,
        layer: Layer,
        mobile: u32,
    },
    PickUpItem {
        serial: u32,
        amount: u16,
    },
    LookRequest {
        serial: u32,
    },
    DoubleClick {
        serial: u32,
        paperdoll: bool,
    },
    GetPlayerStatus {
        kind: u8,
        serial: u32,
    },
    PingPong {
        sequence: u8,
    },
    GeneralInformation {
        subcommand: u16,
    },
    SpyOnClient,

    // ======================== server -> client ========================
    ServerList {
        name: String,
        ip: [u8; 4],
    },
    ServerRedirect {
        ip: [u8; 4],
        port: u16,
        auth_key: u32,
    },
    LoginDenied {
        reason: u8,
    },
    CharacterList {
        names: Vec<String>,
        flags: u32,
    },
    LoginConfirm {
        serial: u32,
        body: u16,
        x: u16,
        y: u16,
        z: i8,
        direction: u8,
        notoriety: Notoriety,
        map_width: u16,
        map_height: u16,
    },
    LoginComplete,
    SeasonalInformation {
        season: u8,
    },
    OverallLightLevel {
        level: u8,
    },
    PersonalLightLevel {
        serial: u32,
        level: u8,
    },
    ClientFeatures {
        flags: u16,
    },
    ClientVersionRequest,
    MovementAck {
        sequence: u8,
        notoriety: Notoriety,
    },
    MovementReject {
        sequence: u8,
        x: u16,
        y: u16,
        z: i8,
        direction: u8,
    },
    UnicodeSpeech {
        serial: u32,
        body: u16,
        kind: u8,
        hue: u16,
        font: u16,
        language: String,
        name: String,
        text: String,
    },
    AttackOk {
        serial: u32,
    },
    AttackSucceed {
        serial: u32,
    },
    FightOccurring {
        attacker: u32,
        attacked: u32,
    },
    CharacterDraw(MobileSnapshot),
    DrawGamePlayer(MobileSnapshot),
    UpdatePlayer(MobileSnapshot),
    DeleteObject {
        serial: u32,
    },
    ContainerItems {
        container: u32,
        items: Vec<ContainedItem>,
    },
    ObjectInfo {
        serial: u32,
        model: u16,
        amount: u16,
        x: u16,
        y: u16,
        z: i8,
    },
    ObjectRevision {
        serial: u32,
        revision: u32,
    },
    DragItem {
        model: u16,
        hue: u16,
        amount: u16,
        source: u32,
        source_x: u16,
        source_y: u16,
        source_z: i8,
        target: u32,
        target_x: u16,
        target_y: u16,
        target_z: i8,
    },
    Damage {
        serial: u32,
        amount: u16,
    },
    StatusBarInfo {
        serial: u32,
        name: String,
        hits: u16,
        max_hits: u16,
    },
    DeathAnimation {
        serial: u32,
        corpse: u32,
    },
    CharacterAnimation {
        serial: u32,
        action: u16,
        backwards: bool,
    },
    Paperdoll {
        serial: u32,
        title: String,
        war_mode: bool,
    },
    SendSpeech {
        serial: u32,
        model: u16,
        name: String,
        text: String,
    },
    WarModeAck {
        war: bool,
    },
}

impl Message {
    /// Wire opcode of this message. The login seed has none; it reports 0x00
    /// for logging purposes only.
    pub fn opcode(&self) -> u8 {
        match self {
            Message::LoginSeed { .. } => 0x00,
            Message::MoveRequest { .. } => 0x02,
            Message::AttackRequest { .. } => 0x05,
            Message::DoubleClick { .. } => 0x06,
            Message::PickUpItem { .. } => 0x07,
            Message::DropItem { .. } => 0x08,
            Message::LookRequest { .. } => 0x09,
            Message::Damage { .. } => 0x0B,
            Message::StatusBarInfo { .. } => 0x11,
            Message::WearItem { .. } => 0x13,
            Message::ObjectInfo { .. } => 0x1A,
            Message::SendSpeech { .. } => 0x1C,
            Message::LoginConfirm { .. } => 0x1B,
            Message::DeleteObject { .. } => 0x1D,
            Message::DrawGamePlayer(_) => 0x20,
            Message::MovementReject { .. } => 0x21,
            Message::MovementAck { .. } | Message::ResyncRequest { .. } => 0x22,
            Message::DragItem { .. } => 0x23,
            Message::FightOccurring { .. } => 0x2F,
            Message::AttackOk { .. } => 0x30,
            Message::GetPlayerStatus { .. } => 0x34,
            Message::ContainerItems { .. } => 0x3C,
            Message::PersonalLightLevel { .. } => 0x4E,
            Message::OverallLightLevel { .. } => 0x4F,
            Message::LoginComplete => 0x55,
            Message::CharacterSelect { .. } => 0x5D,
            Message::CharacterAnimation { .. } => 0x6E,
            Message::WarMode { .. } | Message::WarModeAck { .. } => 0x72,
            Message::PingPong { .. } => 0x73,
            Message::UpdatePlayer(_) => 0x77,
            Message::CharacterDraw(_) => 0x78,
            Message::LoginRequest { .. } => 0x80,
            Message::LoginDenied { .. } => 0x82,
            Message::Paperdoll { .. } => 0x88,
            Message::ServerRedirect { .. } => 0x8C,
            Message::GameLogin { .. } => 0x91,
            Message::SelectServer { .. } => 0xA0,
            Message::ServerList { .. } => 0xA8,
            Message::CharacterList { .. } => 0xA9,
            Message::AttackSucceed { .. } => 0xAA,
            Message::UnicodeSpeechRequest { .. } => 0xAD,
            Message::UnicodeSpeech { .. } => 0xAE,
            Message::DeathAnimation { .. } => 0xAF,
            Message::ClientFeatures { .. } => 0xB9,
            Message::SeasonalInformation { .. } => 0xBC,
            Message::ClientVersion { .. } | Message::ClientVersionRequest => 0xBD,
            Message::GeneralInformation { .. } => 0xBF,
            Message::SpyOnClient => 0xD9,
            Message::ObjectRevision { .. } => 0xDC,
        }
    }
}
