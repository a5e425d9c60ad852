use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::math::Vec3;
use crate::team::{Team, TeamColor, TeamCounts, color_for};
use crate::{DEFAULT_HP, DEFAULT_SPAWN, PlayerId};

/// Life state of a session. All transitions go through `CombatRules`:
/// a killing blow moves Alive → Dead, an explicit respawn moves Dead → Alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeState {
    Alive,
    Dead,
}

/// Weapon stance reported by the client. Combat modifier only; damage
/// numbers still arrive per hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponMode {
    #[default]
    Ranged,
    Melee,
}

/// Authoritative per-connection record. Position and rotation are
/// client-reported and only trusted as far as hit-distance checks go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: PlayerId,
    pub username: String,
    pub hp: u32,
    pub max_hp: u32,
    pub position: Vec3,
    pub rotation: Vec3,
    pub life: LifeState,
    pub team: Option<Team>,
    pub team_color: TeamColor,
    pub is_blocking: bool,
    pub weapon_mode: WeaponMode,
    pub anim_state: String,
    /// Server timestamp (ms since epoch) of the last movement update,
    /// attached to rebroadcasts for client-side interpolation.
    pub last_update: u64,
}

impl Session {
    pub fn is_dead(&self) -> bool {
        self.life == LifeState::Dead
    }
}

/// Fields a client supplies when joining.
#[derive(Debug, Clone, Default)]
pub struct JoinData {
    pub username: Option<String>,
    pub team: Option<Team>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    /// The arena already holds the maximum number of sessions.
    ServerFull,
}

impl std::fmt::Display for JoinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ServerFull => write!(f, "server full"),
        }
    }
}

impl std::error::Error for JoinError {}

/// Authoritative store of live sessions. A session exists here exactly
/// between a successful join and a disconnect or liveness eviction.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<PlayerId, Session>,
    capacity: usize,
}

impl SessionStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: HashMap::new(),
            capacity,
        }
    }

    /// Create a session for `id`, replacing any stale one for the same
    /// identity first (join is idempotent-by-replacement). Rejects when the
    /// store is at capacity; the stale session stays removed in that case.
    pub fn join(&mut self, id: PlayerId, init: JoinData) -> Result<&Session, JoinError> {
        self.sessions.remove(&id);

        if self.sessions.len() >= self.capacity {
            return Err(JoinError::ServerFull);
        }

        let team = init.team;
        let session = Session {
            id,
            username: init.username.unwrap_or_else(|| "Warrior".to_string()),
            hp: DEFAULT_HP,
            max_hp: DEFAULT_HP,
            position: DEFAULT_SPAWN,
            rotation: Vec3::ZERO,
            life: LifeState::Alive,
            team,
            team_color: color_for(team),
            is_blocking: false,
            weapon_mode: WeaponMode::Ranged,
            anim_state: "idle".to_string(),
            last_update: 0,
        };
        Ok(self.sessions.entry(id).or_insert(session))
    }

    pub fn get(&self, id: PlayerId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: PlayerId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn contains(&self, id: PlayerId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Delete the session. Historical kill tallies live in `MatchState` and
    /// are untouched. Removing an absent id is a no-op.
    pub fn remove(&mut self, id: PlayerId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &Session)> {
        self.sessions.iter()
    }

    /// Snapshot of every live session, for the joiner's initial world view.
    pub fn snapshot(&self) -> HashMap<PlayerId, Session> {
        self.sessions.clone()
    }

    /// Number of sessions on each team (teamless sessions are not counted).
    pub fn team_counts(&self) -> TeamCounts {
        let mut counts = TeamCounts::default();
        for session in self.sessions.values() {
            if let Some(team) = session.team {
                counts.increment(team);
            }
        }
        counts
    }
}
