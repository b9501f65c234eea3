use rand::distributions::Alphanumeric;
use rand::Rng;

pub const MIN_USER_ID_LENGTH: usize = 3;
pub const MAX_USER_ID_LENGTH: usize = 15;
pub const MAX_PLAYER_NAME_LENGTH: usize = 20;

/// User ids: 3-15 characters, ASCII alphanumeric plus hyphen, no leading or
/// trailing hyphen, no doubled hyphen.
pub fn is_valid_user_id(id: &str) -> bool {
  if id.len() < MIN_USER_ID_LENGTH || id.len() > MAX_USER_ID_LENGTH {
    return false;
  }
  if !id
    .chars()
    .all(|character| character.is_ascii_alphanumeric() || character == '-')
  {
    return false;
  }
  if id.starts_with('-') || id.ends_with('-') || id.contains("--") {
    return false;
  }
  true
}

/// Mints a fresh id of the form `player-XXXXXXX`, always within the grammar.
pub fn generate_user_id() -> String {
  let suffix: String = rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(7)
    .map(char::from)
    .collect();
  format!("player-{}", suffix.to_lowercase())
}

pub fn sanitize_player_name(name: &str, fallback: &str) -> String {
  let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
  if cleaned.is_empty() {
    return fallback.to_string();
  }
  cleaned.chars().take(MAX_PLAYER_NAME_LENGTH).collect()
}

/// Accepts `#RGB` / `#RRGGBB` hex colors; anything else falls back.
pub fn sanitize_color(color: &str, fallback: &str) -> String {
  let trimmed = color.trim();
  let is_hex = trimmed
    .strip_prefix('#')
    .map(|digits| {
      (digits.len() == 3 || digits.len() == 6) && digits.chars().all(|c| c.is_ascii_hexdigit())
    })
    .unwrap_or(false);
  if is_hex {
    trimmed.to_string()
  } else {
    fallback.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn user_id_grammar() {
    assert!(is_valid_user_id("abc"));
    assert!(is_valid_user_id("player-1"));
    assert!(is_valid_user_id("a1-b2-c3"));
    assert!(is_valid_user_id("abcdefghij12345"));

    assert!(!is_valid_user_id("ab")); // too short
    assert!(!is_valid_user_id("abcdefghij123456")); // too long
    assert!(!is_valid_user_id("-abc")); // leading hyphen
    assert!(!is_valid_user_id("abc-")); // trailing hyphen
    assert!(!is_valid_user_id("ab--cd")); // doubled hyphen
    assert!(!is_valid_user_id("ab cd")); // whitespace
    assert!(!is_valid_user_id("abc!")); // punctuation
    assert!(!is_valid_user_id(""));
  }

  #[test]
  fn generated_ids_satisfy_the_grammar() {
    for _ in 0..100 {
      let id = generate_user_id();
      assert!(is_valid_user_id(&id), "bad generated id: {id}");
    }
  }

  #[test]
  fn name_sanitization_collapses_whitespace_and_truncates() {
    assert_eq!(sanitize_player_name("  a   b  ", "Player"), "a b");
    assert_eq!(sanitize_player_name("", "Player"), "Player");
    assert_eq!(sanitize_player_name("   ", "Player"), "Player");
    let long = "x".repeat(40);
    assert_eq!(
      sanitize_player_name(&long, "Player").len(),
      MAX_PLAYER_NAME_LENGTH
    );
  }

  #[test]
  fn color_sanitization_accepts_hex_only() {
    assert_eq!(sanitize_color("#FF6B6B", "#AAAAAA"), "#FF6B6B");
    assert_eq!(sanitize_color(" #abc ", "#AAAAAA"), "#abc");
    assert_eq!(sanitize_color("red", "#AAAAAA"), "#AAAAAA");
    assert_eq!(sanitize_color("#12345", "#AAAAAA"), "#AAAAAA");
    assert_eq!(sanitize_color("#GGGGGG", "#AAAAAA"), "#AAAAAA");
  }
}
