use super::constants::{
  COLOR_POOL, DEATH_FOOD_COUNT, DEATH_FOOD_VALUE, FOOD_SIZE, FOOD_TIERS, POWERUP_SIZE,
  TOP_FOOD_VALUE,
};
use super::math::random_position;
use super::types::{Food, Point, PowerUp, PowerUpKind};
use rand::Rng;

pub fn random_color() -> String {
  let mut rng = rand::thread_rng();
  COLOR_POOL[rng.gen_range(0..COLOR_POOL.len())].to_string()
}

/// Weighted draw over the tier table.
pub fn roll_food_value() -> i64 {
  let total: u32 = FOOD_TIERS.iter().map(|(_, weight)| weight).sum();
  let mut roll = rand::thread_rng().gen_range(0..total);
  for (value, weight) in FOOD_TIERS {
    if roll < weight {
      return value;
    }
    roll -= weight;
  }
  FOOD_TIERS[0].0
}

/// Tail segments granted per food item.
pub fn segments_for_value(value: i64) -> usize {
  ((value / 10) as usize).max(1)
}

pub fn spawn_food(id: u64) -> Food {
  let position = random_position();
  let value = roll_food_value();
  Food {
    id,
    x: position.x,
    y: position.y,
    color: random_color(),
    size: FOOD_SIZE,
    value,
    respawning: value != TOP_FOOD_VALUE,
  }
}

/// Moves an eaten base-pool item to a fresh position, keeping its tier.
pub fn relocate(food: &mut Food) {
  let position = random_position();
  food.x = position.x;
  food.y = position.y;
  food.color = random_color();
}

/// High-value drops spread evenly along a dead snake's body. These never
/// respawn once eaten.
pub fn death_food(segments: &[Point], next_id: &mut impl FnMut() -> u64) -> Vec<Food> {
  if segments.is_empty() {
    return Vec::new();
  }
  (0..DEATH_FOOD_COUNT)
    .map(|index| {
      let position = segments[index * (segments.len() - 1) / (DEATH_FOOD_COUNT - 1).max(1)];
      Food {
        id: next_id(),
        x: position.x,
        y: position.y,
        color: random_color(),
        size: FOOD_SIZE,
        value: DEATH_FOOD_VALUE,
        respawning: false,
      }
    })
    .collect()
}

pub fn spawn_power_up(id: u64) -> PowerUp {
  let position = random_position();
  let kind = PowerUpKind::ALL[rand::thread_rng().gen_range(0..PowerUpKind::ALL.len())];
  PowerUp {
    id,
    kind,
    x: position.x,
    y: position.y,
    size: POWERUP_SIZE,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn rolled_values_come_from_the_tier_table() {
    for _ in 0..500 {
      let value = roll_food_value();
      assert!(FOOD_TIERS.iter().any(|(tier, _)| *tier == value));
    }
  }

  #[test]
  fn segment_grant_follows_the_tier_table() {
    assert_eq!(segments_for_value(5), 1);
    assert_eq!(segments_for_value(10), 1);
    assert_eq!(segments_for_value(20), 2);
    assert_eq!(segments_for_value(50), 5);
  }

  #[test]
  fn top_tier_food_is_not_respawning() {
    let mut saw_top = false;
    let mut saw_base = false;
    for id in 0..2000 {
      let food = spawn_food(id);
      if food.value == TOP_FOOD_VALUE {
        assert!(!food.respawning);
        saw_top = true;
      } else {
        assert!(food.respawning);
        saw_base = true;
      }
      if saw_top && saw_base {
        break;
      }
    }
    assert!(saw_top && saw_base);
  }

  #[test]
  fn death_food_spreads_along_the_body() {
    let segments: Vec<Point> = (0..20)
      .map(|index| Point {
        x: index as f64 * 10.0,
        y: 0.0,
      })
      .collect();
    let mut counter = 0u64;
    let drops = death_food(&segments, &mut || {
      counter += 1;
      counter
    });

    assert_eq!(drops.len(), DEATH_FOOD_COUNT);
    for drop in &drops {
      assert_eq!(drop.value, DEATH_FOOD_VALUE);
      assert!(!drop.respawning);
    }
    assert!(drops.first().map(|drop| drop.x) < drops.last().map(|drop| drop.x));
  }
}
