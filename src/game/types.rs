use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snake {
  pub id: String,
  pub user_id: String,
  pub name: String,
  pub color: String,
  /// Index 0 is the head; never shorter than `MIN_SNAKE_LENGTH` while alive.
  pub segments: Vec<Point>,
  pub direction: f64,
  pub speed: f64,
  pub score: i64,
  pub food_eaten: u32,
  pub display_score: i64,
  pub alive: bool,
  pub is_boosting: bool,
  pub boost_energy: f64,
  pub invincible: bool,
  #[serde(skip)]
  pub invincible_until: i64,
  pub has_won: bool,
  #[serde(skip)]
  pub joined_at: u64,
  #[serde(skip)]
  pub boost_ticks: u32,
  #[serde(skip)]
  pub win_reset_at: Option<i64>,
}

impl Snake {
  pub fn len(&self) -> usize {
    self.segments.len()
  }

  pub fn head(&self) -> Point {
    self.segments[0]
  }

  pub fn is_invincible(&self, now: i64) -> bool {
    self.invincible && now < self.invincible_until
  }
}

#[derive(Debug, Clone, Serialize)]
pub struct Food {
  pub id: u64,
  pub x: f64,
  pub y: f64,
  pub color: String,
  pub size: f64,
  pub value: i64,
  /// Base-pool items respawn in place when eaten; top-tier items and
  /// death drops do not.
  #[serde(skip)]
  pub respawning: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerUpKind {
  SpeedBoost,
  Shield,
  Magnet,
  Ghost,
  MegaGrowth,
  ScoreMultiplier,
  Shrink,
  FreezeField,
}

impl PowerUpKind {
  pub const ALL: [PowerUpKind; 8] = [
    PowerUpKind::SpeedBoost,
    PowerUpKind::Shield,
    PowerUpKind::Magnet,
    PowerUpKind::Ghost,
    PowerUpKind::MegaGrowth,
    PowerUpKind::ScoreMultiplier,
    PowerUpKind::Shrink,
    PowerUpKind::FreezeField,
  ];
}

#[derive(Debug, Clone, Serialize)]
pub struct PowerUp {
  pub id: u64,
  #[serde(rename = "type")]
  pub kind: PowerUpKind,
  pub x: f64,
  pub y: f64,
  pub size: f64,
}

/// Side effects of a collision pass, relayed to clients by the room.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
  PlayerKilled {
    killer_id: Option<String>,
    victim_id: String,
    killer_size: usize,
    victim_size: usize,
  },
  PowerUpCollected {
    kind: PowerUpKind,
    player_id: String,
  },
}
