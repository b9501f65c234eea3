use super::constants::{GAME_HEIGHT, GAME_WIDTH, WALL_MARGIN};
use super::types::Point;
use rand::Rng;
use std::f64::consts::TAU;

pub fn distance(a: Point, b: Point) -> f64 {
  ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// Uniform position inside the arena, kept off the reflection margin so
/// nothing spawns already touching a wall.
pub fn random_position() -> Point {
  let mut rng = rand::thread_rng();
  Point {
    x: rng.gen_range(WALL_MARGIN..GAME_WIDTH - WALL_MARGIN),
    y: rng.gen_range(WALL_MARGIN..GAME_HEIGHT - WALL_MARGIN),
  }
}

pub fn random_direction() -> f64 {
  rand::thread_rng().gen_range(0.0..TAU)
}

/// Wraps an angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
  let wrapped = angle % TAU;
  if wrapped < 0.0 {
    wrapped + TAU
  } else {
    wrapped
  }
}
