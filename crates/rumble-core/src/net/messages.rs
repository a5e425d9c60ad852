use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::PlayerId;
use crate::math::Vec3;
use crate::session::{Session, WeaponMode};
use crate::stats::MatchStats;
use crate::team::{Team, TeamColor, TeamCounts};

/// Network message type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    // Client -> Server
    Join = 0x01,
    Movement = 0x02,
    AttackHit = 0x03,
    Push = 0x04,
    Heal = 0x05,
    Respawn = 0x06,
    ChangeTeam = 0x07,
    Block = 0x08,
    Chat = 0x09,
    SetUsername = 0x0A,
    RequestMatchStats = 0x0B,
    RequestTeamCounts = 0x0C,
    Ping = 0x0D,

    // Server -> Client
    CurrentSessions = 0x10,
    NewPlayer = 0x11,
    PlayerDisconnected = 0x12,
    PlayerMoved = 0x13,
    HealthUpdate = 0x14,
    HitRejected = 0x15,
    DamageTaken = 0x16,
    PlayerDied = 0x17,
    MatchStats = 0x18,
    TeamCounts = 0x19,
    PlayerRespawned = 0x1A,
    TeamChanged = 0x1B,
    BlockUpdate = 0x1C,
    ChatBroadcast = 0x1D,
    Knockback = 0x1E,
    ServerNotice = 0x1F,
    Pong = 0x20,
    UsernameChanged = 0x21,
}

impl MessageType {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0x01 => Self::Join,
            0x02 => Self::Movement,
            0x03 => Self::AttackHit,
            0x04 => Self::Push,
            0x05 => Self::Heal,
            0x06 => Self::Respawn,
            0x07 => Self::ChangeTeam,
            0x08 => Self::Block,
            0x09 => Self::Chat,
            0x0A => Self::SetUsername,
            0x0B => Self::RequestMatchStats,
            0x0C => Self::RequestTeamCounts,
            0x0D => Self::Ping,
            0x10 => Self::CurrentSessions,
            0x11 => Self::NewPlayer,
            0x12 => Self::PlayerDisconnected,
            0x13 => Self::PlayerMoved,
            0x14 => Self::HealthUpdate,
            0x15 => Self::HitRejected,
            0x16 => Self::DamageTaken,
            0x17 => Self::PlayerDied,
            0x18 => Self::MatchStats,
            0x19 => Self::TeamCounts,
            0x1A => Self::PlayerRespawned,
            0x1B => Self::TeamChanged,
            0x1C => Self::BlockUpdate,
            0x1D => Self::ChatBroadcast,
            0x1E => Self::Knockback,
            0x1F => Self::ServerNotice,
            0x20 => Self::Pong,
            0x21 => Self::UsernameChanged,
            _ => return None,
        })
    }
}

// ---------------------------------------------------------------- client

/// First frame on every connection. Anything else before a join is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinMsg {
    pub username: Option<String>,
    pub team: Option<Team>,
    pub protocol_version: u8,
}

/// Client-reported transform. Trusted verbatim; only combat actions are
/// validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementMsg {
    pub position: Vec3,
    pub rotation: Vec3,
    pub anim_state: String,
    pub weapon_mode: WeaponMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackHitMsg {
    pub target_id: PlayerId,
    pub damage: u32,
    /// Claimed world position of the hit. When absent the target's own
    /// position is used, which always passes the distance check.
    pub hit_position: Option<Vec3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMsg {
    pub target_id: PlayerId,
    pub damage: Option<u32>,
    pub force_y: f32,
    pub force_vec: Vec3,
    pub push_origin: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealMsg {
    pub amount: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RespawnMsg {
    pub position: Option<Vec3>,
    pub rotation: Option<Vec3>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeTeamMsg {
    pub team: Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMsg {
    pub is_blocking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMsg {
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetUsernameMsg {
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingMsg {
    /// Client clock value, echoed back untouched for RTT measurement.
    pub timestamp: u64,
}

/// All messages a client may send, decoded and shape-checked at the
/// boundary before any of them reaches the combat authority.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    Join(JoinMsg),
    Movement(MovementMsg),
    AttackHit(AttackHitMsg),
    Push(PushMsg),
    Heal(HealMsg),
    Respawn(RespawnMsg),
    ChangeTeam(ChangeTeamMsg),
    Block(BlockMsg),
    Chat(ChatMsg),
    SetUsername(SetUsernameMsg),
    RequestMatchStats,
    RequestTeamCounts,
    Ping(PingMsg),
}

// ---------------------------------------------------------------- server

/// Full world snapshot, sent once to each joiner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentSessionsMsg {
    pub sessions: HashMap<PlayerId, Session>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPlayerMsg {
    pub session: Session,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerDisconnectedMsg {
    pub id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerMovedMsg {
    pub id: PlayerId,
    /// Server receive time (ms since epoch), for interpolation.
    pub timestamp: u64,
    pub position: Vec3,
    pub rotation: Vec3,
    pub anim_state: String,
    pub weapon_mode: WeaponMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthUpdateMsg {
    pub id: PlayerId,
    pub hp: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitRejectedMsg {
    pub target_id: PlayerId,
}

/// Private damage feedback for the victim (screen flash, local effects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageTakenMsg {
    pub id: PlayerId,
    pub damage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerDiedMsg {
    pub id: PlayerId,
    pub killer_id: PlayerId,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCountsMsg {
    pub counts: TeamCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRespawnedMsg {
    pub session: Session,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamChangedMsg {
    pub id: PlayerId,
    pub team: Team,
    pub team_color: TeamColor,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockUpdateMsg {
    pub id: PlayerId,
    pub is_blocking: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatBroadcastMsg {
    pub id: PlayerId,
    pub username: String,
    pub content: String,
}

/// Knockback authorization for the target. Magnitude and direction resolve
/// client-side; the server simulates no physics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KnockbackMsg {
    pub force_y: f32,
    pub force_vec: Vec3,
    pub push_origin: Vec3,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerNoticeMsg {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PongMsg {
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameChangedMsg {
    pub id: PlayerId,
    pub username: String,
}

/// All messages the server may send.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    CurrentSessions(CurrentSessionsMsg),
    NewPlayer(NewPlayerMsg),
    PlayerDisconnected(PlayerDisconnectedMsg),
    PlayerMoved(PlayerMovedMsg),
    HealthUpdate(HealthUpdateMsg),
    HitRejected(HitRejectedMsg),
    DamageTaken(DamageTakenMsg),
    PlayerDied(PlayerDiedMsg),
    MatchStats(MatchStats),
    TeamCounts(TeamCountsMsg),
    PlayerRespawned(PlayerRespawnedMsg),
    TeamChanged(TeamChangedMsg),
    BlockUpdate(BlockUpdateMsg),
    Chat(ChatBroadcastMsg),
    Knockback(KnockbackMsg),
    ServerNotice(ServerNoticeMsg),
    Pong(PongMsg),
    UsernameChanged(UsernameChangedMsg),
}
