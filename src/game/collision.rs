use super::constants::{
  COLLISION_SIZE_TOLERANCE, CROSS_COLLISION_DISTANCE, FOOD_PICKUP_RADIUS, MEGA_GROWTH_SEGMENTS,
  POWERUP_PICKUP_RADIUS, SELF_COLLISION_DISTANCE, SELF_COLLISION_SKIP,
};
use super::food::{death_food, relocate, segments_for_value};
use super::math::distance;
use super::scoring::display_score;
use super::snake::{grow_snake, reset_snake, trim_tail};
use super::types::{Food, GameEvent, Point, PowerUp, PowerUpKind, Snake};
use std::collections::{HashMap, HashSet};

impl From<&Food> for Point {
  fn from(food: &Food) -> Self {
    Point {
      x: food.x,
      y: food.y,
    }
  }
}

/// One full collision pass for a room, in fixed order: food pickups,
/// power-up pickups, self-collisions, cross-snake collisions. Only alive
/// snakes participate; invincible snakes skip the collision checks but still
/// eat.
pub fn resolve(
  players: &mut HashMap<String, Snake>,
  food: &mut Vec<Food>,
  power_ups: &mut Vec<PowerUp>,
  now: i64,
  next_food_id: &mut impl FnMut() -> u64,
) -> Vec<GameEvent> {
  let mut events = Vec::new();
  let mut player_ids: Vec<String> = players.keys().cloned().collect();
  player_ids.sort();

  resolve_food(players, &player_ids, food);
  resolve_power_ups(players, &player_ids, power_ups, &mut events);
  resolve_self_collisions(players, &player_ids, food, now, next_food_id, &mut events);
  resolve_cross_collisions(players, &player_ids, food, now, next_food_id, &mut events);

  events
}

fn resolve_food(players: &mut HashMap<String, Snake>, player_ids: &[String], food: &mut Vec<Food>) {
  for id in player_ids {
    let Some(snake) = players.get_mut(id) else { continue };
    if !snake.alive {
      continue;
    }
    let mut index = food.len();
    while index > 0 {
      index -= 1;
      if distance(snake.head(), Point::from(&food[index])) >= FOOD_PICKUP_RADIUS {
        continue;
      }
      let value = food[index].value;
      grow_snake(snake, segments_for_value(value));
      snake.score += value;
      snake.food_eaten += 1;
      snake.display_score = display_score(snake.score, snake.food_eaten);
      if food[index].respawning {
        relocate(&mut food[index]);
      } else {
        food.remove(index);
      }
    }
  }
}

fn resolve_power_ups(
  players: &mut HashMap<String, Snake>,
  player_ids: &[String],
  power_ups: &mut Vec<PowerUp>,
  events: &mut Vec<GameEvent>,
) {
  for id in player_ids {
    let Some(snake) = players.get_mut(id) else { continue };
    if !snake.alive {
      continue;
    }
    let mut index = power_ups.len();
    while index > 0 {
      index -= 1;
      let head = snake.head();
      let item = &power_ups[index];
      if distance(head, Point { x: item.x, y: item.y }) >= POWERUP_PICKUP_RADIUS {
        continue;
      }
      let kind = item.kind;
      power_ups.remove(index);
      // Instant growth changes collision geometry everyone depends on, so it
      // is the one effect applied server-side; the rest are client-owned.
      if kind == PowerUpKind::MegaGrowth {
        grow_snake(snake, MEGA_GROWTH_SEGMENTS);
      }
      events.push(GameEvent::PowerUpCollected {
        kind,
        player_id: id.clone(),
      });
    }
  }
}

fn resolve_self_collisions(
  players: &mut HashMap<String, Snake>,
  player_ids: &[String],
  food: &mut Vec<Food>,
  now: i64,
  next_food_id: &mut impl FnMut() -> u64,
  events: &mut Vec<GameEvent>,
) {
  for id in player_ids {
    let Some(snake) = players.get_mut(id) else { continue };
    if !snake.alive || snake.is_invincible(now) {
      continue;
    }
    let head = snake.head();
    let hit = snake
      .segments
      .iter()
      .skip(SELF_COLLISION_SKIP)
      .any(|segment| distance(head, *segment) < SELF_COLLISION_DISTANCE);
    if !hit {
      continue;
    }
    let size = snake.len();
    snake.alive = false;
    food.extend(death_food(&snake.segments, next_food_id));
    events.push(GameEvent::PlayerKilled {
      killer_id: None,
      victim_id: id.clone(),
      killer_size: 0,
      victim_size: size,
    });
  }
}

fn resolve_cross_collisions(
  players: &mut HashMap<String, Snake>,
  player_ids: &[String],
  food: &mut Vec<Food>,
  now: i64,
  next_food_id: &mut impl FnMut() -> u64,
  events: &mut Vec<GameEvent>,
) {
  // Positions are frozen before any resolution so one pair's outcome cannot
  // create phantom contacts within the same tick.
  let snapshots: Vec<(String, Point, Vec<Point>)> = player_ids
    .iter()
    .filter_map(|id| {
      let snake = players.get(id)?;
      if !snake.alive {
        return None;
      }
      Some((id.clone(), snake.head(), snake.segments.clone()))
    })
    .collect();

  let mut pairs: Vec<(String, String)> = Vec::new();
  let mut seen: HashSet<(String, String)> = HashSet::new();
  for (id, head, _) in &snapshots {
    if players
      .get(id)
      .map(|snake| snake.is_invincible(now))
      .unwrap_or(true)
    {
      continue;
    }
    for (other_id, _, other_segments) in &snapshots {
      if other_id == id {
        continue;
      }
      if players
        .get(other_id)
        .map(|snake| snake.is_invincible(now))
        .unwrap_or(true)
      {
        continue;
      }
      let touching = other_segments
        .iter()
        .any(|segment| distance(*head, *segment) < CROSS_COLLISION_DISTANCE);
      if !touching {
        continue;
      }
      let key = if id < other_id {
        (id.clone(), other_id.clone())
      } else {
        (other_id.clone(), id.clone())
      };
      if seen.insert(key.clone()) {
        pairs.push(key);
      }
    }
  }

  let mut resolved: HashSet<String> = HashSet::new();
  for (first, second) in pairs {
    if resolved.contains(&first) || resolved.contains(&second) {
      continue;
    }
    let (Some(len_first), Some(len_second)) = (
      players.get(&first).filter(|snake| snake.alive).map(Snake::len),
      players.get(&second).filter(|snake| snake.alive).map(Snake::len),
    ) else {
      continue;
    };

    if len_first.abs_diff(len_second) <= COLLISION_SIZE_TOLERANCE {
      destroy(players, &first, food, now, next_food_id);
      destroy(players, &second, food, now, next_food_id);
      resolved.insert(first.clone());
      resolved.insert(second.clone());
      events.push(GameEvent::PlayerKilled {
        killer_id: Some(second.clone()),
        victim_id: first.clone(),
        killer_size: len_second,
        victim_size: len_first,
      });
      events.push(GameEvent::PlayerKilled {
        killer_id: Some(first),
        victim_id: second,
        killer_size: len_first,
        victim_size: len_second,
      });
    } else {
      let (winner, loser, winner_len, loser_len) = if len_first > len_second {
        (first, second, len_first, len_second)
      } else {
        (second, first, len_second, len_first)
      };
      destroy(players, &loser, food, now, next_food_id);
      resolved.insert(loser.clone());
      if let Some(snake) = players.get_mut(&winner) {
        // Winning still costs body length, capped at the minimum.
        trim_tail(snake, loser_len);
      }
      events.push(GameEvent::PlayerKilled {
        killer_id: Some(winner),
        victim_id: loser,
        killer_size: winner_len,
        victim_size: loser_len,
      });
    }
  }
}

/// Drops death food along the body and re-initializes the snake in place
/// with a fresh invincibility window. Destruction never removes a player
/// from the room.
fn destroy(
  players: &mut HashMap<String, Snake>,
  id: &str,
  food: &mut Vec<Food>,
  now: i64,
  next_food_id: &mut impl FnMut() -> u64,
) {
  let Some(snake) = players.get_mut(id) else { return };
  food.extend(death_food(&snake.segments, next_food_id));
  reset_snake(snake, now);
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::game::constants::{
    DEATH_FOOD_COUNT, DEATH_FOOD_VALUE, FOOD_SIZE, MIN_SNAKE_LENGTH, POWERUP_SIZE,
    SPAWN_INVINCIBILITY_MS,
  };
  use crate::game::types::PowerUpKind;

  const NOW: i64 = 60_000;

  fn straight_snake(id: &str, length: usize, origin: Point) -> Snake {
    Snake {
      id: id.to_string(),
      user_id: format!("user-{id}"),
      name: id.to_string(),
      color: "#FF6B6B".to_string(),
      segments: (0..length)
        .map(|index| Point {
          x: origin.x - index as f64 * 5.0,
          y: origin.y,
        })
        .collect(),
      direction: 0.0,
      speed: 2.0,
      score: 0,
      food_eaten: 0,
      display_score: 0,
      alive: true,
      is_boosting: false,
      boost_energy: 100.0,
      invincible: false,
      invincible_until: 0,
      has_won: false,
      joined_at: 0,
      boost_ticks: 0,
      win_reset_at: None,
    }
  }

  fn food_at(id: u64, x: f64, y: f64, value: i64) -> Food {
    Food {
      id,
      x,
      y,
      color: "#F7DC6F".to_string(),
      size: FOOD_SIZE,
      value,
      respawning: value != 50,
    }
  }

  fn run(
    players: &mut HashMap<String, Snake>,
    food: &mut Vec<Food>,
    power_ups: &mut Vec<PowerUp>,
  ) -> Vec<GameEvent> {
    let mut counter = 1000u64;
    resolve(players, food, power_ups, NOW, &mut || {
      counter += 1;
      counter
    })
  }

  #[test]
  fn food_pickup_grows_scores_and_respawns_in_tier() {
    let mut players = HashMap::new();
    players.insert(
      "a".to_string(),
      straight_snake("a", 3, Point { x: 100.0, y: 100.0 }),
    );
    let mut food = vec![food_at(1, 104.0, 100.0, 20)];
    let mut power_ups = Vec::new();

    run(&mut players, &mut food, &mut power_ups);

    let snake = &players["a"];
    assert_eq!(snake.len(), 5);
    assert_eq!(snake.score, 20);
    assert_eq!(snake.food_eaten, 1);
    assert_eq!(snake.display_score, 20);
    // Same tier, new spot.
    assert_eq!(food.len(), 1);
    assert_eq!(food[0].value, 20);
    assert!(food[0].x != 104.0 || food[0].y != 100.0);
  }

  #[test]
  fn top_tier_food_is_removed_and_crosses_multiplier_boundary() {
    let mut players = HashMap::new();
    let mut snake = straight_snake("a", 3, Point { x: 100.0, y: 100.0 });
    snake.score = 100;
    snake.food_eaten = 9;
    snake.display_score = 100;
    players.insert("a".to_string(), snake);
    let mut food = vec![food_at(1, 104.0, 100.0, 50)];
    let mut power_ups = Vec::new();

    run(&mut players, &mut food, &mut power_ups);

    let snake = &players["a"];
    assert_eq!(snake.food_eaten, 10);
    assert_eq!(snake.score, 150);
    assert_eq!(snake.display_score, 180); // 150 * 1.2
    assert!(food.is_empty());
  }

  #[test]
  fn invincible_snakes_still_eat() {
    let mut players = HashMap::new();
    let mut snake = straight_snake("a", 3, Point { x: 100.0, y: 100.0 });
    snake.invincible = true;
    snake.invincible_until = NOW + SPAWN_INVINCIBILITY_MS;
    players.insert("a".to_string(), snake);
    let mut food = vec![food_at(1, 104.0, 100.0, 5)];
    let mut power_ups = Vec::new();

    run(&mut players, &mut food, &mut power_ups);

    assert_eq!(players["a"].score, 5);
  }

  #[test]
  fn mega_growth_power_up_grows_synchronously() {
    let mut players = HashMap::new();
    players.insert(
      "a".to_string(),
      straight_snake("a", 3, Point { x: 200.0, y: 200.0 }),
    );
    let mut food = Vec::new();
    let mut power_ups = vec![PowerUp {
      id: 7,
      kind: PowerUpKind::MegaGrowth,
      x: 205.0,
      y: 200.0,
      size: POWERUP_SIZE,
    }];

    let events = run(&mut players, &mut food, &mut power_ups);

    assert_eq!(players["a"].len(), 8);
    assert!(power_ups.is_empty());
    assert_eq!(
      events,
      vec![GameEvent::PowerUpCollected {
        kind: PowerUpKind::MegaGrowth,
        player_id: "a".to_string(),
      }]
    );
  }

  #[test]
  fn advisory_power_ups_emit_events_without_growth() {
    let mut players = HashMap::new();
    players.insert(
      "a".to_string(),
      straight_snake("a", 3, Point { x: 200.0, y: 200.0 }),
    );
    let mut food = Vec::new();
    let mut power_ups = vec![PowerUp {
      id: 8,
      kind: PowerUpKind::Shield,
      x: 205.0,
      y: 200.0,
      size: POWERUP_SIZE,
    }];

    let events = run(&mut players, &mut food, &mut power_ups);

    assert_eq!(players["a"].len(), 3);
    assert_eq!(events.len(), 1);
  }

  #[test]
  fn self_collision_kills_and_drops_death_food() {
    let mut players = HashMap::new();
    let mut snake = straight_snake("a", 15, Point { x: 300.0, y: 300.0 });
    // Fold the head back onto a segment beyond the skip window.
    snake.segments[0] = Point {
      x: snake.segments[12].x + 1.0,
      y: snake.segments[12].y,
    };
    players.insert("a".to_string(), snake);
    let mut food = Vec::new();
    let mut power_ups = Vec::new();

    let events = run(&mut players, &mut food, &mut power_ups);

    assert!(!players["a"].alive);
    assert_eq!(food.len(), DEATH_FOOD_COUNT);
    assert!(food.iter().all(|item| item.value == DEATH_FOOD_VALUE));
    assert_eq!(
      events,
      vec![GameEvent::PlayerKilled {
        killer_id: None,
        victim_id: "a".to_string(),
        killer_size: 0,
        victim_size: 15,
      }]
    );
  }

  #[test]
  fn curvature_near_the_head_is_tolerated() {
    let mut players = HashMap::new();
    let mut snake = straight_snake("a", 15, Point { x: 300.0, y: 300.0 });
    // Head brushing a segment inside the skip window must not kill.
    snake.segments[0] = Point {
      x: snake.segments[5].x + 1.0,
      y: snake.segments[5].y,
    };
    players.insert("a".to_string(), snake);
    let mut food = Vec::new();
    let mut power_ups = Vec::new();

    let events = run(&mut players, &mut food, &mut power_ups);

    assert!(players["a"].alive);
    assert!(events.is_empty());
  }

  #[test]
  fn equal_length_collision_destroys_both_within_the_tick() {
    let mut players = HashMap::new();
    let mut first = straight_snake("a", 20, Point { x: 400.0, y: 300.0 });
    let second = straight_snake("b", 20, Point { x: 400.0, y: 500.0 });
    // First's head lands on second's body.
    first.segments[0] = Point { x: 395.0, y: 501.0 };
    players.insert("a".to_string(), first);
    players.insert("b".to_string(), second);
    let mut food = Vec::new();
    let mut power_ups = Vec::new();

    let events = run(&mut players, &mut food, &mut power_ups);

    assert_eq!(players["a"].len(), MIN_SNAKE_LENGTH);
    assert_eq!(players["b"].len(), MIN_SNAKE_LENGTH);
    assert!(players["a"].alive && players["b"].alive);
    assert!(players["a"].is_invincible(NOW + 1));
    assert!(players["b"].is_invincible(NOW + 1));
    assert_eq!(food.len(), DEATH_FOOD_COUNT * 2);
    assert_eq!(events.len(), 2);
  }

  #[test]
  fn longer_snake_survives_but_pays_the_loser_length() {
    let mut players = HashMap::new();
    let mut long = straight_snake("long", 30, Point { x: 200.0, y: 100.0 });
    let short = straight_snake("short", 10, Point { x: 200.0, y: 400.0 });
    long.segments[0] = Point { x: 195.0, y: 401.0 };
    players.insert("long".to_string(), long);
    players.insert("short".to_string(), short);
    let mut food = Vec::new();
    let mut power_ups = Vec::new();

    let events = run(&mut players, &mut food, &mut power_ups);

    assert_eq!(players["long"].len(), 20);
    assert_eq!(players["short"].len(), MIN_SNAKE_LENGTH);
    assert_eq!(
      events,
      vec![GameEvent::PlayerKilled {
        killer_id: Some("long".to_string()),
        victim_id: "short".to_string(),
        killer_size: 30,
        victim_size: 10,
      }]
    );
  }

  #[test]
  fn winner_trim_never_drops_below_minimum() {
    let mut players = HashMap::new();
    let mut long = straight_snake("long", 10, Point { x: 200.0, y: 100.0 });
    let short = straight_snake("short", 7, Point { x: 200.0, y: 400.0 });
    long.segments[0] = Point { x: 195.0, y: 401.0 };
    players.insert("long".to_string(), long);
    players.insert("short".to_string(), short);
    let mut food = Vec::new();
    let mut power_ups = Vec::new();

    run(&mut players, &mut food, &mut power_ups);

    assert_eq!(players["long"].len(), MIN_SNAKE_LENGTH);
  }

  #[test]
  fn mutual_contact_resolves_as_a_single_pair() {
    let mut players = HashMap::new();
    let mut first = straight_snake("a", 20, Point { x: 400.0, y: 300.0 });
    let mut second = straight_snake("b", 20, Point { x: 400.0, y: 310.0 });
    first.segments[0] = Point { x: 390.0, y: 310.0 };
    second.segments[0] = Point { x: 390.0, y: 300.0 };
    players.insert("a".to_string(), first);
    players.insert("b".to_string(), second);
    let mut food = Vec::new();
    let mut power_ups = Vec::new();

    let events = run(&mut players, &mut food, &mut power_ups);

    // One deduplicated pair: two kill events, not four.
    assert_eq!(events.len(), 2);
  }

  #[test]
  fn invincible_snakes_are_exempt_from_cross_collisions() {
    let mut players = HashMap::new();
    let mut attacker = straight_snake("a", 20, Point { x: 400.0, y: 300.0 });
    attacker.segments[0] = Point { x: 395.0, y: 501.0 };
    let mut shielded = straight_snake("b", 5, Point { x: 400.0, y: 500.0 });
    shielded.invincible = true;
    shielded.invincible_until = NOW + SPAWN_INVINCIBILITY_MS;
    players.insert("a".to_string(), attacker);
    players.insert("b".to_string(), shielded);
    let mut food = Vec::new();
    let mut power_ups = Vec::new();

    let events = run(&mut players, &mut food, &mut power_ups);

    assert!(events.is_empty());
    assert_eq!(players["a"].len(), 20);
    assert_eq!(players["b"].len(), 5);
  }
}
