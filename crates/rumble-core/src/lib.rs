pub mod combat;
pub mod math;
pub mod net;
pub mod session;
pub mod stats;
pub mod team;

/// Opaque identity for one connection, stable for the connection's lifetime.
pub type PlayerId = u64;

/// Hard cap on concurrent sessions in the arena.
pub const MAX_SESSIONS: usize = 10;

/// Starting and maximum hit points for a fresh session.
pub const DEFAULT_HP: u32 = 100;

/// Permitted distance between a claimed hit location and the target's
/// authoritative position (lag-compensation slack).
pub const DEFAULT_HIT_TOLERANCE: f32 = 15.0;

/// Where fresh and respawning sessions appear unless the client says otherwise.
pub const DEFAULT_SPAWN: math::Vec3 = math::Vec3 {
    x: 0.0,
    y: 6.0,
    z: 0.0,
};
