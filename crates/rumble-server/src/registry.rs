use std::collections::HashMap;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::sync::mpsc;

use rumble_core::PlayerId;

/// Per-player sender for outbound WebSocket binary messages.
/// Bounded to keep slow clients from exhausting memory; `Bytes` makes
/// broadcast fan-out a cheap refcount clone.
pub type PlayerSender = mpsc::Sender<Bytes>;

/// Tracks which identities are currently connected and when each was last
/// heard from. Eviction decisions come from `stale_ids`; the actual
/// session cleanup goes through the same path as an explicit disconnect.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: HashMap<PlayerId, PlayerSender>,
    last_seen: HashMap<PlayerId, Instant>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: PlayerId, sender: PlayerSender) {
        self.connections.insert(id, sender);
        self.last_seen.insert(id, Instant::now());
    }

    /// Record that `id` was just heard from. Called on every inbound message.
    pub fn touch(&mut self, id: PlayerId) {
        if let Some(seen) = self.last_seen.get_mut(&id) {
            *seen = Instant::now();
        }
    }

    pub fn remove(&mut self, id: PlayerId) {
        self.connections.remove(&id);
        self.last_seen.remove(&id);
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.connections.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Identities silent for longer than `timeout`.
    pub fn stale_ids(&self, timeout: Duration) -> Vec<PlayerId> {
        let now = Instant::now();
        self.last_seen
            .iter()
            .filter(|(_, seen)| now.duration_since(**seen) > timeout)
            .map(|(&id, _)| id)
            .collect()
    }

    /// Send raw binary data to one player.
    pub fn send_to(&self, id: PlayerId, data: Bytes) {
        if let Some(sender) = self.connections.get(&id)
            && let Err(e) = sender.try_send(data)
        {
            tracing::debug!(
                player_id = id, error = %e,
                "Failed to send to player (slow or disconnected)"
            );
        }
    }

    /// Broadcast raw binary data to every connected player.
    pub fn broadcast(&self, data: &[u8]) {
        let bytes = Bytes::copy_from_slice(data);
        for (&id, sender) in &self.connections {
            if let Err(e) = sender.try_send(bytes.clone()) {
                tracing::debug!(
                    player_id = id, error = %e,
                    "Skipping broadcast to slow client"
                );
            }
        }
    }

    /// Broadcast raw binary data to everyone except one player.
    pub fn broadcast_except(&self, exclude: PlayerId, data: &[u8]) {
        let bytes = Bytes::copy_from_slice(data);
        for (&id, sender) in &self.connections {
            if id != exclude
                && let Err(e) = sender.try_send(bytes.clone())
            {
                tracing::debug!(
                    player_id = id, error = %e,
                    "Skipping broadcast to slow client"
                );
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn backdate(&mut self, id: PlayerId, age: Duration) {
        if let Some(seen) = self.last_seen.get_mut(&id) {
            *seen = Instant::now() - age;
        }
    }
}
