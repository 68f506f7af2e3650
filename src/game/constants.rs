//! World and entity constants shared by the server simulation and the client.
//!
//! Both sides compute positions with these exact values, so changing any of
//! them is a protocol change.

/// Side length of the square map; valid coordinates are `[0, MAP_SIZE]`
pub const MAP_SIZE: f32 = 3000.0;

/// Ship hit circle radius
pub const PLAYER_RADIUS: f32 = 20.0;
/// Hit-points a player spawns with
pub const PLAYER_MAX_HP: u32 = 100;
/// Movement speed in units per second
pub const PLAYER_SPEED: f32 = 400.0;
/// Seconds between automatic shots
pub const PLAYER_FIRE_COOLDOWN: f32 = 0.25;

pub const BULLET_RADIUS: f32 = 3.0;
pub const BULLET_SPEED: f32 = 800.0;
pub const BULLET_DAMAGE: u32 = 10;
/// Seconds a bullet survives before it is retired
pub const BULLET_MAX_LIFETIME: f32 = 2.0;

pub const SCORE_BULLET_HIT: f64 = 20.0;
pub const SCORE_PER_SECOND: f64 = 1.0;

/// Simulation ticks per second
pub const TICK_RATE: u32 = 60;
/// How far behind the newest server state the client renders
pub const RENDER_DELAY_MS: u64 = 100;

/// Others and bullets further than this from a player are left out of its snapshot
pub const VISIBILITY_RADIUS: f32 = MAP_SIZE / 2.0;
pub const LEADERBOARD_SIZE: usize = 5;
pub const MAX_USERNAME_LEN: usize = 32;
