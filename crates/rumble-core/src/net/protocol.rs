use serde::{Deserialize, Serialize};

use super::messages::{
    AttackHitMsg, BlockMsg, BlockUpdateMsg, ChangeTeamMsg, ChatBroadcastMsg, ChatMsg,
    ClientMessage, CurrentSessionsMsg, DamageTakenMsg, HealMsg, HealthUpdateMsg, HitRejectedMsg,
    JoinMsg, KnockbackMsg, MessageType, MovementMsg, NewPlayerMsg, PingMsg, PlayerDiedMsg,
    PlayerDisconnectedMsg, PlayerMovedMsg, PlayerRespawnedMsg, PongMsg, PushMsg, RespawnMsg,
    ServerMessage, ServerNoticeMsg, SetUsernameMsg, TeamChangedMsg, TeamCountsMsg,
    UsernameChangedMsg,
};
use crate::stats::MatchStats;

/// Current protocol version, carried in the join handshake.
pub const PROTOCOL_VERSION: u8 = 1;

/// Maximum message payload size in bytes.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024; // 64 KiB

#[derive(Debug)]
pub enum ProtocolError {
    EmptyMessage,
    UnknownMessageType(u8),
    PayloadTooLarge(usize),
    SerializeError(String),
    DeserializeError(String),
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyMessage => write!(f, "empty message"),
            Self::UnknownMessageType(b) => write!(f, "unknown message type: 0x{b:02x}"),
            Self::PayloadTooLarge(size) => {
                write!(f, "payload too large: {size} bytes (max {MAX_MESSAGE_SIZE})")
            },
            Self::SerializeError(e) => write!(f, "serialize error: {e}"),
            Self::DeserializeError(e) => write!(f, "deserialize error: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Encode a serializable payload with a 1-byte type prefix.
pub fn encode_message<T: Serialize>(
    msg_type: MessageType,
    payload: &T,
) -> Result<Vec<u8>, ProtocolError> {
    let payload_bytes =
        rmp_serde::to_vec(payload).map_err(|e| ProtocolError::SerializeError(e.to_string()))?;
    let total = 1 + payload_bytes.len();
    if total > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::PayloadTooLarge(total));
    }
    let mut buf = Vec::with_capacity(total);
    buf.push(msg_type as u8);
    buf.extend_from_slice(&payload_bytes);
    Ok(buf)
}

/// Encode a `ClientMessage` to wire format.
pub fn encode_client_message(msg: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ClientMessage::Join(m) => encode_message(MessageType::Join, m),
        ClientMessage::Movement(m) => encode_message(MessageType::Movement, m),
        ClientMessage::AttackHit(m) => encode_message(MessageType::AttackHit, m),
        ClientMessage::Push(m) => encode_message(MessageType::Push, m),
        ClientMessage::Heal(m) => encode_message(MessageType::Heal, m),
        ClientMessage::Respawn(m) => encode_message(MessageType::Respawn, m),
        ClientMessage::ChangeTeam(m) => encode_message(MessageType::ChangeTeam, m),
        ClientMessage::Block(m) => encode_message(MessageType::Block, m),
        ClientMessage::Chat(m) => encode_message(MessageType::Chat, m),
        ClientMessage::SetUsername(m) => encode_message(MessageType::SetUsername, m),
        ClientMessage::RequestMatchStats => encode_message(MessageType::RequestMatchStats, &()),
        ClientMessage::RequestTeamCounts => encode_message(MessageType::RequestTeamCounts, &()),
        ClientMessage::Ping(m) => encode_message(MessageType::Ping, m),
    }
}

/// Encode a `ServerMessage` to wire format.
pub fn encode_server_message(msg: &ServerMessage) -> Result<Vec<u8>, ProtocolError> {
    match msg {
        ServerMessage::CurrentSessions(m) => encode_message(MessageType::CurrentSessions, m),
        ServerMessage::NewPlayer(m) => encode_message(MessageType::NewPlayer, m),
        ServerMessage::PlayerDisconnected(m) => encode_message(MessageType::PlayerDisconnected, m),
        ServerMessage::PlayerMoved(m) => encode_message(MessageType::PlayerMoved, m),
        ServerMessage::HealthUpdate(m) => encode_message(MessageType::HealthUpdate, m),
        ServerMessage::HitRejected(m) => encode_message(MessageType::HitRejected, m),
        ServerMessage::DamageTaken(m) => encode_message(MessageType::DamageTaken, m),
        ServerMessage::PlayerDied(m) => encode_message(MessageType::PlayerDied, m),
        ServerMessage::MatchStats(m) => encode_message(MessageType::MatchStats, m),
        ServerMessage::TeamCounts(m) => encode_message(MessageType::TeamCounts, m),
        ServerMessage::PlayerRespawned(m) => encode_message(MessageType::PlayerRespawned, m),
        ServerMessage::TeamChanged(m) => encode_message(MessageType::TeamChanged, m),
        ServerMessage::BlockUpdate(m) => encode_message(MessageType::BlockUpdate, m),
        ServerMessage::Chat(m) => encode_message(MessageType::ChatBroadcast, m),
        ServerMessage::Knockback(m) => encode_message(MessageType::Knockback, m),
        ServerMessage::ServerNotice(m) => encode_message(MessageType::ServerNotice, m),
        ServerMessage::Pong(m) => encode_message(MessageType::Pong, m),
        ServerMessage::UsernameChanged(m) => encode_message(MessageType::UsernameChanged, m),
    }
}

/// Extract the message type byte from raw wire data.
pub fn decode_message_type(data: &[u8]) -> Result<MessageType, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    MessageType::from_byte(data[0]).ok_or(ProtocolError::UnknownMessageType(data[0]))
}

/// Decode a MessagePack payload (bytes after the type prefix).
pub fn decode_payload<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, ProtocolError> {
    if data.is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    rmp_serde::from_slice(&data[1..]).map_err(|e| ProtocolError::DeserializeError(e.to_string()))
}

/// Decode raw wire data into a `ClientMessage`.
pub fn decode_client_message(data: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::Join => Ok(ClientMessage::Join(decode_payload::<JoinMsg>(data)?)),
        MessageType::Movement => Ok(ClientMessage::Movement(decode_payload::<MovementMsg>(
            data,
        )?)),
        MessageType::AttackHit => Ok(ClientMessage::AttackHit(decode_payload::<AttackHitMsg>(
            data,
        )?)),
        MessageType::Push => Ok(ClientMessage::Push(decode_payload::<PushMsg>(data)?)),
        MessageType::Heal => Ok(ClientMessage::Heal(decode_payload::<HealMsg>(data)?)),
        MessageType::Respawn => Ok(ClientMessage::Respawn(decode_payload::<RespawnMsg>(data)?)),
        MessageType::ChangeTeam => Ok(ClientMessage::ChangeTeam(decode_payload::<ChangeTeamMsg>(
            data,
        )?)),
        MessageType::Block => Ok(ClientMessage::Block(decode_payload::<BlockMsg>(data)?)),
        MessageType::Chat => Ok(ClientMessage::Chat(decode_payload::<ChatMsg>(data)?)),
        MessageType::SetUsername => Ok(ClientMessage::SetUsername(decode_payload::<
            SetUsernameMsg,
        >(data)?)),
        MessageType::RequestMatchStats => Ok(ClientMessage::RequestMatchStats),
        MessageType::RequestTeamCounts => Ok(ClientMessage::RequestTeamCounts),
        MessageType::Ping => Ok(ClientMessage::Ping(decode_payload::<PingMsg>(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}

/// Decode raw wire data into a `ServerMessage`.
pub fn decode_server_message(data: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let msg_type = decode_message_type(data)?;
    match msg_type {
        MessageType::CurrentSessions => Ok(ServerMessage::CurrentSessions(decode_payload::<
            CurrentSessionsMsg,
        >(data)?)),
        MessageType::NewPlayer => Ok(ServerMessage::NewPlayer(decode_payload::<NewPlayerMsg>(
            data,
        )?)),
        MessageType::PlayerDisconnected => Ok(ServerMessage::PlayerDisconnected(decode_payload::<
            PlayerDisconnectedMsg,
        >(data)?)),
        MessageType::PlayerMoved => Ok(ServerMessage::PlayerMoved(decode_payload::<
            PlayerMovedMsg,
        >(data)?)),
        MessageType::HealthUpdate => Ok(ServerMessage::HealthUpdate(decode_payload::<
            HealthUpdateMsg,
        >(data)?)),
        MessageType::HitRejected => Ok(ServerMessage::HitRejected(decode_payload::<
            HitRejectedMsg,
        >(data)?)),
        MessageType::DamageTaken => Ok(ServerMessage::DamageTaken(decode_payload::<
            DamageTakenMsg,
        >(data)?)),
        MessageType::PlayerDied => Ok(ServerMessage::PlayerDied(decode_payload::<PlayerDiedMsg>(
            data,
        )?)),
        MessageType::MatchStats => Ok(ServerMessage::MatchStats(decode_payload::<MatchStats>(
            data,
        )?)),
        MessageType::TeamCounts => Ok(ServerMessage::TeamCounts(decode_payload::<TeamCountsMsg>(
            data,
        )?)),
        MessageType::PlayerRespawned => Ok(ServerMessage::PlayerRespawned(decode_payload::<
            PlayerRespawnedMsg,
        >(data)?)),
        MessageType::TeamChanged => Ok(ServerMessage::TeamChanged(decode_payload::<
            TeamChangedMsg,
        >(data)?)),
        MessageType::BlockUpdate => Ok(ServerMessage::BlockUpdate(decode_payload::<
            BlockUpdateMsg,
        >(data)?)),
        MessageType::ChatBroadcast => Ok(ServerMessage::Chat(decode_payload::<ChatBroadcastMsg>(
            data,
        )?)),
        MessageType::Knockback => Ok(ServerMessage::Knockback(decode_payload::<KnockbackMsg>(
            data,
        )?)),
        MessageType::ServerNotice => Ok(ServerMessage::ServerNotice(decode_payload::<
            ServerNoticeMsg,
        >(data)?)),
        MessageType::Pong => Ok(ServerMessage::Pong(decode_payload::<PongMsg>(data)?)),
        MessageType::UsernameChanged => Ok(ServerMessage::UsernameChanged(decode_payload::<
            UsernameChangedMsg,
        >(data)?)),
        _ => Err(ProtocolError::UnknownMessageType(data[0])),
    }
}
