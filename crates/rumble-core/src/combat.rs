use serde::{Deserialize, Serialize};

use crate::math::Vec3;
use crate::session::{LifeState, SessionStore};
use crate::stats::MatchState;
use crate::{DEFAULT_HIT_TOLERANCE, PlayerId};

/// Sole authority for whether a hit counts, how much damage applies, and
/// when a kill/death transition happens. Owns no state; operates on the
/// session store and match tallies handed in by the caller.
#[derive(Debug, Clone, Copy)]
pub struct CombatRules {
    /// Whether same-team sessions may damage each other.
    pub friendly_fire: bool,
    /// Max discrepancy between a claimed hit location and the target's
    /// authoritative position.
    pub hit_tolerance: f32,
}

impl Default for CombatRules {
    fn default() -> Self {
        Self {
            friendly_fire: false,
            hit_tolerance: DEFAULT_HIT_TOLERANCE,
        }
    }
}

/// Why a hit was refused. Rejections are expected and frequent under lag;
/// they are values, never faults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum HitRejection {
    UnknownAttacker,
    UnknownTarget,
    TargetDead,
    FriendlyFire,
    OutOfRange { distance: f32 },
}

impl std::fmt::Display for HitRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownAttacker => write!(f, "attacker has no session"),
            Self::UnknownTarget => write!(f, "target has no session"),
            Self::TargetDead => write!(f, "target is already dead"),
            Self::FriendlyFire => write!(f, "friendly fire is disabled"),
            Self::OutOfRange { distance } => {
                write!(f, "claimed hit position is {distance:.1} units from target")
            },
        }
    }
}

/// Why a heal, knockback, or respawn was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum CombatRejection {
    UnknownTarget,
    TargetDead,
}

impl std::fmt::Display for CombatRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTarget => write!(f, "target has no session"),
            Self::TargetDead => write!(f, "target is already dead"),
        }
    }
}

/// A confirmed death, recorded at most once per life.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KillRecord {
    pub killer: PlayerId,
    pub victim: PlayerId,
    /// Where the victim died, for client-side death effects.
    pub position: Vec3,
}

/// Result of an accepted hit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitOutcome {
    pub applied_damage: u32,
    pub resulting_hp: u32,
    pub kill: Option<KillRecord>,
}

/// Result of an accepted heal. `healed` may be less than requested because
/// hp is clamped at max.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealOutcome {
    pub healed: u32,
    pub resulting_hp: u32,
}

impl CombatRules {
    /// Validate a claimed hit and, if it passes, apply the damage.
    ///
    /// Checks short-circuit in a fixed order so rejection reasons are
    /// deterministic: attacker exists, target exists, target alive,
    /// friendly fire, hit distance. The attacker's own position is
    /// deliberately not validated (no weapon-range check); only the claimed
    /// hit location is tested against the target's authoritative position.
    ///
    /// A killing blow transitions the target Alive → Dead and credits the
    /// attacker and the attacker's team exactly once; hits landing on an
    /// already-dead target are rejected before any mutation, which is what
    /// keeps kill credit at-most-once when duplicate hit messages race in.
    pub fn validate_and_apply_hit(
        &self,
        sessions: &mut SessionStore,
        stats: &mut MatchState,
        attacker: PlayerId,
        target: PlayerId,
        damage: u32,
        hit_position: Vec3,
    ) -> Result<HitOutcome, HitRejection> {
        let attacker_team = sessions
            .get(attacker)
            .ok_or(HitRejection::UnknownAttacker)?
            .team;

        let target_session = sessions.get(target).ok_or(HitRejection::UnknownTarget)?;
        if target_session.is_dead() {
            return Err(HitRejection::TargetDead);
        }

        if !self.friendly_fire
            && attacker_team.is_some()
            && attacker_team == target_session.team
        {
            return Err(HitRejection::FriendlyFire);
        }

        let distance = target_session.position.distance(&hit_position);
        if distance > self.hit_tolerance {
            return Err(HitRejection::OutOfRange { distance });
        }

        let target_session = sessions
            .get_mut(target)
            .ok_or(HitRejection::UnknownTarget)?;
        target_session.hp = target_session.hp.saturating_sub(damage);
        let resulting_hp = target_session.hp;

        let mut kill = None;
        if resulting_hp == 0 && target_session.life == LifeState::Alive {
            target_session.life = LifeState::Dead;
            kill = Some(KillRecord {
                killer: attacker,
                victim: target,
                position: target_session.position,
            });
            stats.record_kill(attacker, attacker_team);
        }

        Ok(HitOutcome {
            applied_damage: damage,
            resulting_hp,
            kill,
        })
    }

    /// Heal a living session, clamped at max hp. Returns the amount
    /// actually restored.
    pub fn apply_healing(
        &self,
        sessions: &mut SessionStore,
        target: PlayerId,
        amount: u32,
    ) -> Result<HealOutcome, CombatRejection> {
        let session = sessions
            .get_mut(target)
            .ok_or(CombatRejection::UnknownTarget)?;
        if session.is_dead() {
            return Err(CombatRejection::TargetDead);
        }

        let before = session.hp;
        session.hp = session.hp.saturating_add(amount).min(session.max_hp);
        Ok(HealOutcome {
            healed: session.hp - before,
            resulting_hp: session.hp,
        })
    }

    /// Authorize a knockback against a living target. The server simulates
    /// no physics; the push itself resolves client-side once the
    /// authorization is broadcast.
    pub fn authorize_knockback(
        &self,
        sessions: &SessionStore,
        target: PlayerId,
    ) -> Result<(), CombatRejection> {
        let session = sessions.get(target).ok_or(CombatRejection::UnknownTarget)?;
        if session.is_dead() {
            return Err(CombatRejection::TargetDead);
        }
        Ok(())
    }

    /// Reset a session to full hp and Alive at the given transform.
    /// Valid from either life state.
    pub fn respawn(
        &self,
        sessions: &mut SessionStore,
        id: PlayerId,
        position: Option<Vec3>,
        rotation: Option<Vec3>,
    ) -> Result<(), CombatRejection> {
        let session = sessions.get_mut(id).ok_or(CombatRejection::UnknownTarget)?;
        session.hp = session.max_hp;
        session.life = LifeState::Alive;
        if let Some(position) = position {
            session.position = position;
        }
        if let Some(rotation) = rotation {
            session.rotation = rotation;
        }
        Ok(())
    }
}
