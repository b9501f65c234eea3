use super::constants::SCORE_MULTIPLIER_TIERS;

/// Streak multiplier for the current life, looked up from the ordered tier
/// table (highest threshold first).
pub fn multiplier(food_eaten: u32) -> f64 {
  for (threshold, factor) in SCORE_MULTIPLIER_TIERS {
    if food_eaten >= threshold {
      return factor;
    }
  }
  1.0
}

pub fn display_score(score: i64, food_eaten: u32) -> i64 {
  (score as f64 * multiplier(food_eaten)).floor() as i64
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn multiplier_tier_boundaries() {
    assert_eq!(multiplier(0), 1.0);
    assert_eq!(multiplier(9), 1.0);
    assert_eq!(multiplier(10), 1.2);
    assert_eq!(multiplier(19), 1.2);
    assert_eq!(multiplier(20), 1.4);
    assert_eq!(multiplier(29), 1.4);
    assert_eq!(multiplier(30), 1.6);
    assert_eq!(multiplier(250), 1.6);
  }

  #[test]
  fn display_score_floors_the_scaled_value() {
    assert_eq!(display_score(105, 10), 126);
    assert_eq!(display_score(105, 0), 105);
    assert_eq!(display_score(33, 20), 46);
    assert_eq!(display_score(0, 30), 0);
  }
}
