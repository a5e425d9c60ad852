use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::PlayerId;
use crate::team::{Team, TeamTally};

/// Phase of the single ongoing match. There is no lobby flow yet, so the
/// server runs permanently in `Active`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPhase {
    Setup,
    Active,
    Ended,
}

/// Process-lifetime scoring state. Tallies are monotone non-decreasing and
/// survive sessions joining and leaving; only `reset()` clears them.
#[derive(Debug)]
pub struct MatchState {
    player_kills: HashMap<PlayerId, u32>,
    team_kills: TeamTally,
    phase: MatchPhase,
    started_at: Instant,
}

impl Default for MatchState {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchState {
    pub fn new() -> Self {
        Self {
            player_kills: HashMap::new(),
            team_kills: TeamTally::default(),
            phase: MatchPhase::Active,
            started_at: Instant::now(),
        }
    }

    /// Credit one kill to `killer` and, if they have one, to their team.
    pub fn record_kill(&mut self, killer: PlayerId, killer_team: Option<Team>) {
        let count = self.player_kills.entry(killer).or_insert(0);
        *count = count.saturating_add(1);
        if let Some(team) = killer_team {
            self.team_kills.increment(team);
        }
    }

    pub fn kills_for(&self, id: PlayerId) -> u32 {
        self.player_kills.get(&id).copied().unwrap_or(0)
    }

    pub fn team_kills(&self) -> &TeamTally {
        &self.team_kills
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    /// Immutable scoring snapshot for broadcast. Never mutates.
    pub fn snapshot(&self) -> MatchStats {
        MatchStats {
            player_kills: self.player_kills.clone(),
            team_kills: self.team_kills,
            phase: self.phase,
            duration_secs: self.started_at.elapsed().as_secs(),
        }
    }

    /// Clear all tallies and restart the match clock. No route calls this
    /// yet; it exists for an eventual match-rotation flow.
    pub fn reset(&mut self) {
        self.player_kills.clear();
        self.team_kills = TeamTally::default();
        self.phase = MatchPhase::Active;
        self.started_at = Instant::now();
    }
}

/// Wire-facing snapshot of the match score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchStats {
    pub player_kills: HashMap<PlayerId, u32>,
    pub team_kills: TeamTally,
    pub phase: MatchPhase,
    pub duration_secs: u64,
}
