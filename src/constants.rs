pub const TICK_RATE: u32 = 60;
pub const FRAME_MS: f64 = 1000.0 / TICK_RATE as f64;

pub const CELL_SIZE: f32 = 20.0;

pub const AGENT_SPEED: f32 = 3.0;
pub const AGENT_RADIUS: f32 = 10.0;
pub const ADVERSARY_SPEED: f32 = 2.0;
pub const ADVERSARY_RADIUS: f32 = 10.0;
pub const EVADE_SPEED: f32 = 1.5;

pub const EVADE_DURATION_MS: f64 = 8_000.0;
pub const PATROL_DURATION_MS: f64 = 7_000.0;
pub const PURSUE_DURATION_MS: f64 = 20_000.0;
pub const DEATH_PAUSE_MS: f64 = 2_000.0;

pub const STANDARD_RADIUS: f32 = 3.0;
pub const BONUS_RADIUS: f32 = 6.0;

pub const STANDARD_VALUE: i32 = 10;
pub const BONUS_VALUE: i32 = 50;
pub const CAPTURE_VALUE: i32 = 200;
pub const VICTORY_VALUE: i32 = 1000;
pub const STARTING_LIVES: i32 = 3;

pub const AGENT_SPAWN_CELL: (i32, i32) = (14, 23);
pub const HOME_CELL: (i32, i32) = (14, 14);
pub const ADVERSARY_SPAWN_CELLS: [(i32, i32); 4] = [(14, 11), (14, 14), (12, 14), (16, 14)];

/// Chance per candidate direction that an evading adversary accepts it
/// regardless of its distance rank.
pub const EVADE_WANDER_CHANCE: f32 = 0.3;
/// Evade targets stay at least this many cells away from every border.
pub const EVADE_TARGET_INSET: i32 = 2;

pub const AMBUSH_LEAD_CELLS: f32 = 4.0;
pub const FLANK_LEAD_CELLS: f32 = 2.0;
pub const SHY_DISTANCE_CELLS: f32 = 8.0;
