use super::constants::{
  BASE_SPEED, BOOST_DRAIN_PER_TICK, BOOST_ENERGY_MAX, BOOST_MULTIPLIER, BOOST_REGEN_PER_TICK,
  BOOST_SHRINK_INTERVAL_TICKS, GAME_HEIGHT, GAME_WIDTH, MIN_SEGMENT_GAP, MIN_SNAKE_LENGTH,
  MIN_SPEED, SEGMENT_SPACING, SPAWN_INVINCIBILITY_MS, SPEED_DECAY_PER_SEGMENT, SPEED_TIERS,
  STARTING_LENGTH, WALL_MARGIN,
};
use super::math::{distance, normalize_angle, random_direction, random_position};
use super::types::{Point, Snake};
use std::f64::consts::PI;

/// Builds the starting geometry: `STARTING_LENGTH` segments trailing away
/// from the heading at fixed spacing.
fn starting_segments(position: Point, direction: f64) -> Vec<Point> {
  let (sin_d, cos_d) = direction.sin_cos();
  (0..STARTING_LENGTH)
    .map(|index| Point {
      x: position.x - cos_d * SEGMENT_SPACING * index as f64,
      y: position.y - sin_d * SEGMENT_SPACING * index as f64,
    })
    .collect()
}

pub fn create_snake(
  id: String,
  user_id: String,
  name: String,
  color: String,
  joined_at: u64,
  now: i64,
) -> Snake {
  let direction = random_direction();
  Snake {
    id,
    user_id,
    name,
    color,
    segments: starting_segments(random_position(), direction),
    direction,
    speed: BASE_SPEED,
    score: 0,
    food_eaten: 0,
    display_score: 0,
    alive: true,
    is_boosting: false,
    boost_energy: BOOST_ENERGY_MAX,
    invincible: true,
    invincible_until: now + SPAWN_INVINCIBILITY_MS,
    has_won: false,
    joined_at,
    boost_ticks: 0,
    win_reset_at: None,
  }
}

/// Re-initializes geometry, score and boost state in place, keeping the
/// snake's identity. Used for respawn, collision resets and post-win resets.
pub fn reset_snake(snake: &mut Snake, now: i64) {
  let direction = random_direction();
  snake.segments = starting_segments(random_position(), direction);
  snake.direction = direction;
  snake.speed = BASE_SPEED;
  snake.score = 0;
  snake.food_eaten = 0;
  snake.display_score = 0;
  snake.alive = true;
  snake.is_boosting = false;
  snake.boost_energy = BOOST_ENERGY_MAX;
  snake.invincible = true;
  snake.invincible_until = now + SPAWN_INVINCIBILITY_MS;
  snake.boost_ticks = 0;
  snake.win_reset_at = None;
}

/// Decreasing step function of body length: plateaus from the tier table,
/// then a linear decay floored at `MIN_SPEED`. Longer snakes trade agility
/// for growth.
pub fn speed_for_length(length: usize) -> f64 {
  for (max_length, speed) in SPEED_TIERS {
    if length <= max_length {
      return speed;
    }
  }
  let (decay_start, decay_base) = SPEED_TIERS[SPEED_TIERS.len() - 1];
  (decay_base - SPEED_DECAY_PER_SEGMENT * (length - decay_start) as f64).max(MIN_SPEED)
}

/// One simulation tick for a single snake: speed derivation, boost
/// drain/regen, head advance, wall reflection and body propagation. Touches
/// no geometry shared with other snakes.
pub fn update_snake(snake: &mut Snake, now: i64) {
  if !snake.alive {
    return;
  }

  if snake.invincible && now >= snake.invincible_until {
    snake.invincible = false;
  }

  let base_speed = speed_for_length(snake.len());
  let boosting = snake.is_boosting && snake.boost_energy > 0.0;
  let speed = if boosting {
    base_speed * BOOST_MULTIPLIER
  } else {
    base_speed
  };

  if boosting {
    snake.boost_energy = (snake.boost_energy - BOOST_DRAIN_PER_TICK).max(0.0);
    snake.boost_ticks += 1;
    // Boosting trades length for speed.
    if snake.boost_ticks % BOOST_SHRINK_INTERVAL_TICKS == 0 && snake.len() > MIN_SNAKE_LENGTH {
      snake.segments.pop();
    }
    if snake.boost_energy <= 0.0 {
      snake.is_boosting = false;
    }
  } else {
    snake.boost_energy = (snake.boost_energy + BOOST_REGEN_PER_TICK).min(BOOST_ENERGY_MAX);
  }
  snake.speed = speed;

  let previous: Vec<Point> = snake.segments.clone();

  let head = &mut snake.segments[0];
  head.x += snake.direction.cos() * speed;
  head.y += snake.direction.sin() * speed;

  // Mirror the heading at the wall margin; the outward-motion check keeps
  // each wall contact to a single reflection.
  if head.x < WALL_MARGIN && snake.direction.cos() < 0.0 {
    head.x = WALL_MARGIN;
    snake.direction = PI - snake.direction;
  } else if head.x > GAME_WIDTH - WALL_MARGIN && snake.direction.cos() > 0.0 {
    head.x = GAME_WIDTH - WALL_MARGIN;
    snake.direction = PI - snake.direction;
  }
  let head = &mut snake.segments[0];
  if head.y < WALL_MARGIN && snake.direction.sin() < 0.0 {
    head.y = WALL_MARGIN;
    snake.direction = -snake.direction;
  } else if head.y > GAME_HEIGHT - WALL_MARGIN && snake.direction.sin() > 0.0 {
    head.y = GAME_HEIGHT - WALL_MARGIN;
    snake.direction = -snake.direction;
  }
  snake.direction = normalize_angle(snake.direction);

  follow_leader(&mut snake.segments, &previous);
}

/// Leader-follower chain: each body segment takes the pre-tick position of
/// the segment ahead, pushed back along the leader-to-target vector when it
/// would land inside the minimum inter-segment gap.
fn follow_leader(segments: &mut [Point], previous: &[Point]) {
  for index in 1..segments.len() {
    let leader = segments[index - 1];
    let target = previous[index - 1];
    let gap = distance(leader, target);
    segments[index] = if gap < MIN_SEGMENT_GAP && gap > f64::EPSILON {
      Point {
        x: leader.x + (target.x - leader.x) / gap * MIN_SEGMENT_GAP,
        y: leader.y + (target.y - leader.y) / gap * MIN_SEGMENT_GAP,
      }
    } else {
      target
    };
  }
}

/// Appends tail segments along the existing tail-direction vector so growth
/// never stacks new segments on a single point.
pub fn grow_snake(snake: &mut Snake, count: usize) {
  for _ in 0..count {
    let tail = snake.segments[snake.len() - 1];
    let (dx, dy) = match snake.segments.get(snake.len().wrapping_sub(2)) {
      Some(before_tail) => {
        let length = distance(*before_tail, tail);
        if length > f64::EPSILON {
          (
            (tail.x - before_tail.x) / length,
            (tail.y - before_tail.y) / length,
          )
        } else {
          (-snake.direction.cos(), -snake.direction.sin())
        }
      }
      None => (-snake.direction.cos(), -snake.direction.sin()),
    };
    snake.segments.push(Point {
      x: tail.x + dx * MIN_SEGMENT_GAP,
      y: tail.y + dy * MIN_SEGMENT_GAP,
    });
  }
}

/// Drops `count` tail segments, never shrinking below the minimum length.
pub fn trim_tail(snake: &mut Snake, count: usize) {
  let target = snake.len().saturating_sub(count).max(MIN_SNAKE_LENGTH);
  snake.segments.truncate(target);
}
