pub const GAME_WIDTH: f64 = 800.0;
pub const GAME_HEIGHT: f64 = 600.0;
pub const WALL_MARGIN: f64 = 10.0;

pub const TICK_MS: u64 = 16;
pub const BROADCAST_INTERVAL_TICKS: u64 = 2;

pub const STARTING_LENGTH: usize = 3;
pub const MIN_SNAKE_LENGTH: usize = 3;
pub const SEGMENT_SPACING: f64 = 10.0;
pub const MIN_SEGMENT_GAP: f64 = 5.0;

pub const BASE_SPEED: f64 = 2.0;
pub const MIN_SPEED: f64 = 0.8;
pub const SPEED_DECAY_PER_SEGMENT: f64 = 0.01;

/// Ordered (max segment count, speed) plateaus; lengths past the last entry
/// fall into the linear decay toward `MIN_SPEED`.
pub const SPEED_TIERS: [(usize, f64); 4] = [(10, BASE_SPEED), (20, 1.7), (35, 1.5), (50, 1.3)];

pub const BOOST_MULTIPLIER: f64 = 1.8;
pub const BOOST_ENERGY_MAX: f64 = 100.0;
pub const BOOST_DRAIN_PER_TICK: f64 = 1.0;
pub const BOOST_REGEN_PER_TICK: f64 = 0.5;
pub const BOOST_SHRINK_INTERVAL_TICKS: u32 = 3;

pub const FOOD_COUNT: usize = 50;
pub const FOOD_SIZE: f64 = 5.0;
pub const FOOD_PICKUP_RADIUS: f64 = 15.0;
pub const FOOD_REPLENISH_INTERVAL_MS: i64 = 1000;

/// Ordered (value, weight) rows; weights sum to 100. The top tier never
/// respawns once eaten.
pub const FOOD_TIERS: [(i64, u32); 4] = [(5, 50), (10, 30), (20, 15), (50, 5)];
pub const TOP_FOOD_VALUE: i64 = 50;

pub const DEATH_FOOD_COUNT: usize = 5;
pub const DEATH_FOOD_VALUE: i64 = 20;

/// Ordered (min food eaten, multiplier) rows, highest threshold first.
pub const SCORE_MULTIPLIER_TIERS: [(u32, f64); 4] = [(30, 1.6), (20, 1.4), (10, 1.2), (0, 1.0)];

pub const POWERUP_SIZE: f64 = 10.0;
pub const POWERUP_PICKUP_RADIUS: f64 = 15.0;
pub const POWERUP_SPAWN_INTERVAL_MS: i64 = 5000;
pub const MAX_POWERUPS: usize = 3;
pub const MEGA_GROWTH_SEGMENTS: usize = 5;

pub const CROSS_COLLISION_DISTANCE: f64 = 10.0;
pub const SELF_COLLISION_DISTANCE: f64 = 8.0;
pub const SELF_COLLISION_SKIP: usize = 10;
pub const COLLISION_SIZE_TOLERANCE: usize = 2;

pub const SPAWN_INVINCIBILITY_MS: i64 = 3000;

pub const DEFAULT_WIN_SCORE: i64 = 1000;
pub const WIN_RESET_DELAY_MS: i64 = 5000;
pub const SOLO_AUTO_START_MS: i64 = 1500;

pub const ROOM_MAX_PLAYERS: usize = 8;
pub const MAX_CONNECTIONS: usize = 100;
pub const ROOM_CODE_LENGTH: usize = 6;

pub const COLOR_POOL: [&str; 8] = [
  "#FF6B6B",
  "#4ECDC4",
  "#45B7D1",
  "#F7DC6F",
  "#B8E994",
  "#FD79A8",
  "#A29BFE",
  "#FFEAA7",
];
