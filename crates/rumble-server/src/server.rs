use std::time::Duration;

use rumble_core::PlayerId;
use rumble_core::combat::CombatRules;
use rumble_core::math::Vec3;
use rumble_core::net::messages::{
    BlockUpdateMsg, ChatBroadcastMsg, ClientMessage, CurrentSessionsMsg, DamageTakenMsg,
    HealthUpdateMsg, HitRejectedMsg, JoinMsg, KnockbackMsg, NewPlayerMsg, PlayerDiedMsg,
    PlayerDisconnectedMsg, PlayerMovedMsg, PlayerRespawnedMsg, PongMsg, ServerMessage,
    ServerNoticeMsg, TeamChangedMsg, TeamCountsMsg, UsernameChangedMsg,
};
use rumble_core::net::protocol::{PROTOCOL_VERSION, encode_server_message};
use rumble_core::session::{JoinData, JoinError, SessionStore};
use rumble_core::stats::MatchState;

use crate::config::ServerConfig;
use crate::registry::{ConnectionRegistry, PlayerSender};

/// Server receive time in milliseconds since the Unix epoch, attached to
/// movement rebroadcasts for client interpolation.
fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The arena authority: owns the session store, match tallies, combat
/// rules, and connection registry, and translates inbound client intents
/// into state mutations plus outbound broadcasts.
///
/// Every inbound message is handled to completion under one write lock,
/// so combat operations never interleave mid-mutation. That run-to-
/// completion dispatch is what keeps kill crediting at-most-once without
/// any per-session locking. A multi-instance deployment would need this
/// state in a shared store with compare-and-swap on hp; that scaling
/// concern is out of scope here.
pub struct GameServer {
    sessions: SessionStore,
    stats: MatchState,
    rules: CombatRules,
    registry: ConnectionRegistry,
    next_player_id: PlayerId,
}

impl GameServer {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            sessions: SessionStore::new(config.limits.max_sessions),
            stats: MatchState::new(),
            rules: CombatRules {
                friendly_fire: config.combat.friendly_fire,
                hit_tolerance: config.combat.hit_tolerance,
            },
            registry: ConnectionRegistry::new(),
            next_player_id: 1,
        }
    }

    pub fn alloc_player_id(&mut self) -> PlayerId {
        let id = self.next_player_id;
        self.next_player_id += 1;
        id
    }

    /// Register a connection's outbound channel. A session does not exist
    /// until the join message is accepted.
    pub fn connect(&mut self, id: PlayerId, sender: PlayerSender) {
        self.registry.insert(id, sender);
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether `id` still has a registered outbound channel. False once the
    /// identity has been disconnected or evicted; the transport uses this to
    /// close the socket of an evicted connection.
    pub fn is_connected(&self, id: PlayerId) -> bool {
        self.registry.contains(id)
    }

    /// Record that `id` was heard from; feeds the liveness sweep.
    pub fn touch(&mut self, id: PlayerId) {
        self.registry.touch(id);
    }

    /// Create (or replace) the session for `id`. On success the joiner
    /// receives the full world snapshot and current match score, everyone
    /// else an incremental new-player notice. A join beyond capacity is
    /// answered with a notice and refused.
    pub fn join(&mut self, id: PlayerId, msg: JoinMsg) -> Result<(), JoinError> {
        let init = JoinData {
            username: msg.username.filter(|name| is_valid_username(name)),
            team: msg.team,
        };
        match self.sessions.join(id, init) {
            Ok(session) => {
                let session = session.clone();
                tracing::info!(
                    player_id = id,
                    username = %session.username,
                    team = ?session.team,
                    online = self.sessions.len(),
                    "Player joined"
                );
                self.send(
                    id,
                    &ServerMessage::CurrentSessions(CurrentSessionsMsg {
                        sessions: self.sessions.snapshot(),
                    }),
                );
                self.send(id, &ServerMessage::MatchStats(self.stats.snapshot()));
                self.broadcast_except(id, &ServerMessage::NewPlayer(NewPlayerMsg { session }));
                self.broadcast_team_counts();
                Ok(())
            },
            Err(err) => {
                tracing::warn!(player_id = id, online = self.sessions.len(), "Join rejected: {err}");
                self.send(
                    id,
                    &ServerMessage::ServerNotice(ServerNoticeMsg {
                        message: "Server full!".to_string(),
                    }),
                );
                Err(err)
            },
        }
    }

    /// Remove a connection and its session, then tell everyone. This is
    /// the single cleanup path shared by explicit disconnects and liveness
    /// evictions, so the registry and session store cannot diverge.
    /// Repeated disconnects for the same id are no-ops.
    pub fn disconnect(&mut self, id: PlayerId) {
        self.registry.remove(id);
        if self.sessions.remove(id).is_some() {
            tracing::info!(player_id = id, online = self.sessions.len(), "Player disconnected");
            self.broadcast(&ServerMessage::PlayerDisconnected(PlayerDisconnectedMsg {
                id,
            }));
            self.broadcast_team_counts();
        }
    }

    /// Evict every identity silent for longer than `timeout`, through the
    /// normal disconnect path. Returns the number evicted.
    pub fn evict_stale(&mut self, timeout: Duration) -> usize {
        let stale = self.registry.stale_ids(timeout);
        for &id in &stale {
            tracing::warn!(player_id = id, "Evicting silent session");
            self.disconnect(id);
        }
        stale.len()
    }

    /// Dispatch one decoded client message. Runs to completion; all
    /// combat-rule failures resolve to rejection notices, never faults.
    pub fn handle_message(&mut self, id: PlayerId, msg: ClientMessage) {
        match msg {
            ClientMessage::Join(m) => {
                // Re-joins repeat the handshake's version check, which the
                // transport only applies to the first frame.
                if m.protocol_version != 0 && m.protocol_version != PROTOCOL_VERSION {
                    self.send(
                        id,
                        &ServerMessage::ServerNotice(ServerNoticeMsg {
                            message: format!(
                                "Protocol version mismatch: client={}, server={}",
                                m.protocol_version, PROTOCOL_VERSION
                            ),
                        }),
                    );
                    return;
                }
                // A session may only exist for a registered connection. An
                // evicted identity has no outbound sender left, so its
                // re-join must come through a fresh socket handshake.
                if self.registry.contains(id) {
                    // Mid-connection re-join replaces the session wholesale.
                    let _ = self.join(id, m);
                } else {
                    tracing::debug!(player_id = id, "Ignoring join from unregistered connection");
                }
            },
            ClientMessage::Movement(m) => self.handle_movement(id, m),
            ClientMessage::AttackHit(m) => {
                self.resolve_hit(id, m.target_id, m.damage, m.hit_position);
            },
            ClientMessage::Push(m) => self.handle_push(id, m),
            ClientMessage::Heal(m) => self.handle_heal(id, m.amount),
            ClientMessage::Respawn(m) => self.handle_respawn(id, m.position, m.rotation),
            ClientMessage::ChangeTeam(m) => self.handle_change_team(id, m.team),
            ClientMessage::Block(m) => self.handle_block(id, m.is_blocking),
            ClientMessage::Chat(m) => self.handle_chat(id, m.content),
            ClientMessage::SetUsername(m) => self.handle_set_username(id, m.username),
            ClientMessage::RequestMatchStats => {
                self.send(id, &ServerMessage::MatchStats(self.stats.snapshot()));
            },
            ClientMessage::RequestTeamCounts => {
                self.send(
                    id,
                    &ServerMessage::TeamCounts(TeamCountsMsg {
                        counts: self.sessions.team_counts(),
                    }),
                );
            },
            ClientMessage::Ping(m) => {
                self.send(
                    id,
                    &ServerMessage::Pong(PongMsg {
                        timestamp: m.timestamp,
                    }),
                );
            },
        }
    }

    fn handle_movement(&mut self, id: PlayerId, m: rumble_core::net::messages::MovementMsg) {
        let now = now_millis();
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        // Transform fields are client-reported and trusted verbatim; only
        // combat actions are validated.
        session.position = m.position;
        session.rotation = m.rotation;
        session.anim_state = m.anim_state.clone();
        session.weapon_mode = m.weapon_mode;
        session.last_update = now;

        self.broadcast_except(
            id,
            &ServerMessage::PlayerMoved(PlayerMovedMsg {
                id,
                timestamp: now,
                position: m.position,
                rotation: m.rotation,
                anim_state: m.anim_state,
                weapon_mode: m.weapon_mode,
            }),
        );
    }

    /// Shared damage path for direct attacks and damaging pushes.
    fn resolve_hit(
        &mut self,
        attacker: PlayerId,
        target: PlayerId,
        damage: u32,
        hit_position: Option<Vec3>,
    ) {
        // A missing claimed position falls back to the target's own, which
        // trivially passes the distance check (legacy client allowance).
        let claimed = hit_position
            .or_else(|| self.sessions.get(target).map(|s| s.position))
            .unwrap_or(Vec3::ZERO);

        match self.rules.validate_and_apply_hit(
            &mut self.sessions,
            &mut self.stats,
            attacker,
            target,
            damage,
            claimed,
        ) {
            Ok(outcome) => {
                tracing::info!(
                    attacker,
                    target,
                    damage = outcome.applied_damage,
                    hp = outcome.resulting_hp,
                    "Hit validated"
                );
                self.broadcast(&ServerMessage::HealthUpdate(HealthUpdateMsg {
                    id: target,
                    hp: outcome.resulting_hp,
                }));
                if outcome.applied_damage > 0 {
                    self.send(
                        target,
                        &ServerMessage::DamageTaken(DamageTakenMsg {
                            id: target,
                            damage: outcome.applied_damage,
                        }),
                    );
                }
                if let Some(kill) = outcome.kill {
                    tracing::info!(victim = kill.victim, killer = kill.killer, "Player died");
                    self.broadcast(&ServerMessage::PlayerDied(PlayerDiedMsg {
                        id: kill.victim,
                        killer_id: kill.killer,
                        position: kill.position,
                    }));
                    self.broadcast(&ServerMessage::MatchStats(self.stats.snapshot()));
                }
            },
            Err(reason) => {
                tracing::debug!(attacker, target, %reason, "Hit rejected");
                self.send(
                    attacker,
                    &ServerMessage::HitRejected(HitRejectedMsg { target_id: target }),
                );
            },
        }
    }

    fn handle_push(&mut self, id: PlayerId, m: rumble_core::net::messages::PushMsg) {
        match self.rules.authorize_knockback(&self.sessions, m.target_id) {
            Ok(()) => {
                self.send(
                    m.target_id,
                    &ServerMessage::Knockback(KnockbackMsg {
                        force_y: m.force_y,
                        force_vec: m.force_vec,
                        push_origin: m.push_origin,
                    }),
                );
            },
            Err(reason) => {
                tracing::debug!(player_id = id, target = m.target_id, %reason, "Push rejected");
                return;
            },
        }
        // Damage on a push rides the full hit pipeline, with the push
        // origin standing in for the claimed hit position.
        if let Some(damage) = m.damage
            && damage > 0
        {
            self.resolve_hit(id, m.target_id, damage, Some(m.push_origin));
        }
    }

    fn handle_heal(&mut self, id: PlayerId, amount: u32) {
        // Healing applies to the sender only; there is no remote healing.
        match self.rules.apply_healing(&mut self.sessions, id, amount) {
            Ok(outcome) => {
                self.broadcast(&ServerMessage::HealthUpdate(HealthUpdateMsg {
                    id,
                    hp: outcome.resulting_hp,
                }));
            },
            Err(reason) => {
                tracing::debug!(player_id = id, %reason, "Heal rejected");
            },
        }
    }

    fn handle_respawn(&mut self, id: PlayerId, position: Option<Vec3>, rotation: Option<Vec3>) {
        if self
            .rules
            .respawn(&mut self.sessions, id, position, rotation)
            .is_err()
        {
            return;
        }
        let Some(session) = self.sessions.get(id) else {
            return;
        };
        let session = session.clone();
        tracing::info!(player_id = id, team = ?session.team, "Player respawned");

        self.broadcast(&ServerMessage::HealthUpdate(HealthUpdateMsg {
            id,
            hp: session.hp,
        }));
        self.broadcast(&ServerMessage::PlayerRespawned(PlayerRespawnedMsg {
            session: session.clone(),
            timestamp: now_millis(),
        }));
        // Re-announce the full session so clients that dropped the entity
        // on death re-create it.
        self.broadcast_except(id, &ServerMessage::NewPlayer(NewPlayerMsg { session }));
    }

    fn handle_change_team(&mut self, id: PlayerId, team: rumble_core::team::Team) {
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        let old_team = session.team;
        session.team = Some(team);
        session.team_color = team.color();
        let username = session.username.clone();
        let team_color = session.team_color;
        tracing::info!(player_id = id, ?old_team, new_team = %team, "Team changed");

        self.broadcast(&ServerMessage::TeamChanged(TeamChangedMsg {
            id,
            team,
            team_color,
            username,
        }));
        self.broadcast_team_counts();
    }

    fn handle_block(&mut self, id: PlayerId, is_blocking: bool) {
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        session.is_blocking = is_blocking;
        self.broadcast_except(
            id,
            &ServerMessage::BlockUpdate(BlockUpdateMsg { id, is_blocking }),
        );
    }

    fn handle_chat(&mut self, id: PlayerId, content: String) {
        if content.is_empty()
            || content.len() > 1024
            || content.chars().any(|c| c.is_control() && c != '\n')
        {
            return;
        }
        let Some(session) = self.sessions.get(id) else {
            return;
        };
        self.broadcast(&ServerMessage::Chat(ChatBroadcastMsg {
            id,
            username: session.username.clone(),
            content,
        }));
    }

    fn handle_set_username(&mut self, id: PlayerId, username: String) {
        if !is_valid_username(&username) {
            return;
        }
        let Some(session) = self.sessions.get_mut(id) else {
            return;
        };
        session.username = username.clone();
        self.broadcast(&ServerMessage::UsernameChanged(UsernameChangedMsg {
            id,
            username,
        }));
    }

    fn broadcast_team_counts(&self) {
        self.broadcast(&ServerMessage::TeamCounts(TeamCountsMsg {
            counts: self.sessions.team_counts(),
        }));
    }

    fn send(&self, id: PlayerId, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => self.registry.send_to(id, data.into()),
            Err(e) => tracing::warn!(player_id = id, error = %e, "Failed to encode message"),
        }
    }

    fn broadcast(&self, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => self.registry.broadcast(&data),
            Err(e) => tracing::warn!(error = %e, "Failed to encode broadcast"),
        }
    }

    fn broadcast_except(&self, exclude: PlayerId, msg: &ServerMessage) {
        match encode_server_message(msg) {
            Ok(data) => self.registry.broadcast_except(exclude, &data),
            Err(e) => tracing::warn!(error = %e, "Failed to encode broadcast"),
        }
    }

    #[cfg(test)]
    pub(crate) fn registry_mut(&mut self) -> &mut ConnectionRegistry {
        &mut self.registry
    }

    #[cfg(test)]
    pub(crate) fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

fn is_valid_username(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty() && trimmed.len() <= 32 && !trimmed.chars().any(|c| c.is_control())
}
