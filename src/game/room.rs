use super::collision;
use super::constants::{
  BROADCAST_INTERVAL_TICKS, COLOR_POOL, DEFAULT_WIN_SCORE, FOOD_COUNT,
  FOOD_REPLENISH_INTERVAL_MS, GAME_HEIGHT, GAME_WIDTH, MAX_POWERUPS, POWERUP_SPAWN_INTERVAL_MS,
  ROOM_MAX_PLAYERS, SOLO_AUTO_START_MS, TICK_MS, WIN_RESET_DELAY_MS,
};
use super::food::{spawn_food, spawn_power_up};
use super::math::normalize_angle;
use super::snake::{create_snake, reset_snake, update_snake};
use super::types::{Food, GameEvent, PowerUp, Snake};
use crate::protocol::{self, RoomSummary, ServerMessage};
use crate::shared::identity::{sanitize_color, sanitize_player_name};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomError {
  RoomFull,
  RoomNotFound,
}

impl fmt::Display for RoomError {
  fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      RoomError::RoomFull => write!(formatter, "Room is full"),
      RoomError::RoomNotFound => write!(formatter, "Room not found"),
    }
  }
}

/// Non-wire facts the registry needs for listing and quick-play matching.
#[derive(Debug, Clone)]
pub struct RoomInfo {
  pub id: String,
  pub player_count: usize,
  pub max_players: usize,
  pub game_started: bool,
  pub created_at: i64,
  pub is_public: bool,
  pub is_solo: bool,
  pub closed: bool,
}

impl RoomInfo {
  pub fn summary(&self) -> RoomSummary {
    RoomSummary {
      id: self.id.clone(),
      player_count: self.player_count,
      max_players: self.max_players,
      game_started: self.game_started,
      created_at: self.created_at,
    }
  }
}

/// One isolated simulation instance. All mutation happens behind the state
/// mutex, either in an inbound-message handler or in the tick body, so
/// handlers always run to completion before the next one starts.
#[derive(Debug)]
pub struct Room {
  pub id: String,
  state: Mutex<RoomState>,
  running: AtomicBool,
}

#[derive(Debug)]
struct SessionEntry {
  sender: UnboundedSender<String>,
  user_id: String,
  joined_seq: u64,
}

#[derive(Debug)]
struct RoomState {
  room_id: String,
  sessions: HashMap<String, SessionEntry>,
  players: HashMap<String, Snake>,
  food: Vec<Food>,
  power_ups: Vec<PowerUp>,
  host_user_id: Option<String>,
  host_session_id: Option<String>,
  game_started: bool,
  win_score: i64,
  created_at: i64,
  is_public: bool,
  is_solo: bool,
  max_players: usize,
  closed: bool,
  next_food_id: u64,
  next_power_up_id: u64,
  join_seq: u64,
  tick_count: u64,
  last_power_up_spawn: i64,
  last_food_replenish: i64,
  auto_start_at: Option<i64>,
}

impl Room {
  pub fn new(id: String, is_public: bool, is_solo: bool) -> Self {
    let now = now_millis();
    Self {
      state: Mutex::new(RoomState::new(id.clone(), is_public, is_solo, now)),
      id,
      running: AtomicBool::new(false),
    }
  }

  pub async fn add_session(
    &self,
    session_id: &str,
    user_id: &str,
    sender: UnboundedSender<String>,
  ) -> Result<bool, RoomError> {
    let mut state = self.state.lock().await;
    state.add_session(session_id, user_id, sender)
  }

  /// Removes a member; returns true once the room is empty and closed, at
  /// which point the registry drops it.
  pub async fn remove_session(&self, session_id: &str) -> bool {
    let mut state = self.state.lock().await;
    state.remove_session(session_id);
    state.closed
  }

  pub async fn handle_join_game(
    &self,
    session_id: &str,
    user_id: &str,
    name: Option<String>,
    color: Option<String>,
  ) {
    let mut state = self.state.lock().await;
    state.handle_join_game(session_id, user_id, name, color, now_millis());
  }

  pub async fn handle_direction(&self, session_id: &str, angle: f64) {
    let mut state = self.state.lock().await;
    state.handle_direction(session_id, angle);
  }

  pub async fn handle_boost(&self, session_id: &str, active: bool) {
    let mut state = self.state.lock().await;
    state.handle_boost(session_id, active);
  }

  pub async fn handle_start(&self, session_id: &str) {
    let mut state = self.state.lock().await;
    state.handle_start(session_id, now_millis());
  }

  pub async fn handle_respawn(&self, session_id: &str) {
    let mut state = self.state.lock().await;
    state.handle_respawn(session_id, now_millis());
  }

  pub async fn handle_player_info(
    &self,
    session_id: &str,
    name: Option<String>,
    color: Option<String>,
  ) {
    let mut state = self.state.lock().await;
    state.handle_player_info(session_id, name, color);
  }

  pub async fn handle_user_id_change(&self, session_id: &str, new_user_id: &str) {
    let mut state = self.state.lock().await;
    state.handle_user_id_change(session_id, new_user_id);
  }

  pub async fn info(&self) -> RoomInfo {
    let state = self.state.lock().await;
    state.info()
  }

  /// Spawns the 60 Hz tick task for this room if it is not already running.
  /// The loop parks itself once the room is empty; a tick that panics is
  /// logged and skipped without taking the scheduler down.
  pub fn ensure_loop(self: &Arc<Self>) {
    if self
      .running
      .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
      .is_err()
    {
      return;
    }

    let room = Arc::clone(self);
    tokio::spawn(async move {
      let mut interval = tokio::time::interval(std::time::Duration::from_millis(TICK_MS));
      loop {
        interval.tick().await;
        let mut state = room.state.lock().await;
        if state.closed || state.sessions.is_empty() {
          state.closed = true;
          room.running.store(false, Ordering::SeqCst);
          break;
        }
        let now = now_millis();
        if catch_unwind(AssertUnwindSafe(|| state.tick(now))).is_err() {
          tracing::error!(room_id = %room.id, tick = state.tick_count, "tick panicked, skipping frame");
        }
      }
      tracing::debug!(room_id = %room.id, "tick loop stopped");
    });
  }
}

pub fn now_millis() -> i64 {
  SystemTime::now()
    .duration_since(UNIX_EPOCH)
    .unwrap_or_default()
    .as_millis() as i64
}

impl RoomState {
  fn new(room_id: String, is_public: bool, is_solo: bool, now: i64) -> Self {
    let mut state = Self {
      room_id,
      sessions: HashMap::new(),
      players: HashMap::new(),
      food: Vec::with_capacity(FOOD_COUNT),
      power_ups: Vec::new(),
      host_user_id: None,
      host_session_id: None,
      game_started: false,
      win_score: DEFAULT_WIN_SCORE,
      created_at: now,
      is_public,
      is_solo,
      max_players: ROOM_MAX_PLAYERS,
      closed: false,
      next_food_id: 0,
      next_power_up_id: 0,
      join_seq: 0,
      tick_count: 0,
      last_power_up_spawn: now,
      last_food_replenish: now,
      auto_start_at: None,
    };
    for _ in 0..FOOD_COUNT {
      let id = state.alloc_food_id();
      state.food.push(spawn_food(id));
    }
    state
  }

  fn alloc_food_id(&mut self) -> u64 {
    self.next_food_id += 1;
    self.next_food_id
  }

  fn info(&self) -> RoomInfo {
    RoomInfo {
      id: self.room_id.clone(),
      player_count: self.sessions.len(),
      max_players: self.max_players,
      game_started: self.game_started,
      created_at: self.created_at,
      is_public: self.is_public,
      is_solo: self.is_solo,
      closed: self.closed,
    }
  }

  fn add_session(
    &mut self,
    session_id: &str,
    user_id: &str,
    sender: UnboundedSender<String>,
  ) -> Result<bool, RoomError> {
    if self.closed {
      return Err(RoomError::RoomNotFound);
    }
    if self.sessions.len() >= self.max_players {
      return Err(RoomError::RoomFull);
    }
    self.join_seq += 1;
    self.sessions.insert(
      session_id.to_string(),
      SessionEntry {
        sender,
        user_id: user_id.to_string(),
        joined_seq: self.join_seq,
      },
    );
    let is_host = if self.host_session_id.is_none() {
      self.host_session_id = Some(session_id.to_string());
      self.host_user_id = Some(user_id.to_string());
      true
    } else {
      self.host_session_id.as_deref() == Some(session_id)
    };
    tracing::debug!(room_id = %self.room_id, session_id, user_id, is_host, "member joined");
    Ok(is_host)
  }

  fn remove_session(&mut self, session_id: &str) {
    if self.sessions.remove(session_id).is_none() {
      return;
    }
    self.players.remove(session_id);
    tracing::debug!(room_id = %self.room_id, session_id, "member left");

    if self.sessions.is_empty() {
      // Destroyed the instant it becomes empty; the registry reaps it.
      self.closed = true;
      self.host_session_id = None;
      self.host_user_id = None;
      return;
    }

    if self.host_session_id.as_deref() == Some(session_id) {
      // Deterministic failover: the oldest remaining membership.
      let successor = self
        .sessions
        .iter()
        .min_by_key(|(_, entry)| entry.joined_seq)
        .map(|(id, entry)| (id.clone(), entry.user_id.clone()));
      if let Some((next_session, next_user)) = successor {
        self.host_session_id = Some(next_session);
        self.host_user_id = Some(next_user.clone());
        self.broadcast(&ServerMessage::NewHost { host_id: next_user });
      }
    }
  }

  fn handle_join_game(
    &mut self,
    session_id: &str,
    user_id: &str,
    name: Option<String>,
    color: Option<String>,
    now: i64,
  ) {
    let Some(session) = self.sessions.get(session_id) else { return };
    let joined_seq = session.joined_seq;
    let fallback_color = COLOR_POOL[self.players.len() % COLOR_POOL.len()];
    let name = sanitize_player_name(name.as_deref().unwrap_or(""), "Player");
    let color = sanitize_color(color.as_deref().unwrap_or(""), fallback_color);

    let snake = create_snake(
      session_id.to_string(),
      user_id.to_string(),
      name,
      color,
      joined_seq,
      now,
    );
    self.players.insert(session_id.to_string(), snake);

    let is_host = self.host_session_id.as_deref() == Some(session_id);
    self.send_to(
      session_id,
      &ServerMessage::Init {
        player_id: session_id.to_string(),
        user_id: user_id.to_string(),
        game_width: GAME_WIDTH,
        game_height: GAME_HEIGHT,
        is_host,
        game_started: self.game_started,
      },
    );

    if self.is_solo && !self.game_started && self.auto_start_at.is_none() {
      self.auto_start_at = Some(now + SOLO_AUTO_START_MS);
    }
  }

  fn handle_direction(&mut self, session_id: &str, angle: f64) {
    if !angle.is_finite() {
      return;
    }
    if let Some(snake) = self.players.get_mut(session_id).filter(|snake| snake.alive) {
      snake.direction = normalize_angle(angle);
    }
  }

  fn handle_boost(&mut self, session_id: &str, active: bool) {
    if let Some(snake) = self.players.get_mut(session_id).filter(|snake| snake.alive) {
      snake.is_boosting = active;
    }
  }

  fn handle_start(&mut self, session_id: &str, now: i64) {
    if self.host_session_id.as_deref() != Some(session_id) {
      tracing::debug!(room_id = %self.room_id, session_id, "start ignored: not host");
      return;
    }
    self.start_game(now);
  }

  fn start_game(&mut self, now: i64) {
    // Idempotent: a second start never produces a second broadcast.
    if self.game_started || self.sessions.is_empty() {
      return;
    }
    self.game_started = true;
    self.auto_start_at = None;
    tracing::info!(room_id = %self.room_id, players = self.players.len(), "game started");
    self.broadcast(&ServerMessage::GameStarted {
      start_time: now,
      player_count: self.players.len(),
    });
  }

  fn handle_respawn(&mut self, session_id: &str, now: i64) {
    if let Some(snake) = self
      .players
      .get_mut(session_id)
      .filter(|snake| !snake.alive)
    {
      reset_snake(snake, now);
    }
  }

  fn handle_player_info(&mut self, session_id: &str, name: Option<String>, color: Option<String>) {
    let Some(snake) = self.players.get_mut(session_id) else { return };
    if let Some(name) = name {
      snake.name = sanitize_player_name(&name, &snake.name.clone());
    }
    if let Some(color) = color {
      snake.color = sanitize_color(&color, &snake.color.clone());
    }
  }

  fn handle_user_id_change(&mut self, session_id: &str, new_user_id: &str) {
    let was_host_user = self
      .sessions
      .get(session_id)
      .map(|entry| self.host_user_id.as_deref() == Some(entry.user_id.as_str()))
      .unwrap_or(false);
    let Some(session) = self.sessions.get_mut(session_id) else { return };
    session.user_id = new_user_id.to_string();
    if let Some(snake) = self.players.get_mut(session_id) {
      snake.user_id = new_user_id.to_string();
    }
    if was_host_user && self.host_session_id.as_deref() == Some(session_id) {
      self.host_user_id = Some(new_user_id.to_string());
    }
  }

  /// One scheduler frame: auto-start bookkeeping, then (while running)
  /// movement, collisions, win checks and spawn timers, then the throttled
  /// snapshot broadcast.
  fn tick(&mut self, now: i64) {
    self.tick_count += 1;

    if !self.game_started {
      if let Some(at) = self.auto_start_at {
        if now >= at {
          self.start_game(now);
        }
      }
    } else {
      for snake in self.players.values_mut() {
        update_snake(snake, now);
      }

      let mut next_food_id = self.next_food_id;
      let events = collision::resolve(
        &mut self.players,
        &mut self.food,
        &mut self.power_ups,
        now,
        &mut || {
          next_food_id += 1;
          next_food_id
        },
      );
      self.next_food_id = next_food_id;
      self.publish_events(&events);

      self.check_victories(now);
      self.spawn_power_ups(now);
      self.replenish_food(now);
    }

    if self.tick_count % BROADCAST_INTERVAL_TICKS == 0 {
      self.broadcast_snapshot();
    }
  }

  fn publish_events(&mut self, events: &[GameEvent]) {
    for event in events {
      let message = match event {
        GameEvent::PlayerKilled {
          killer_id,
          victim_id,
          killer_size,
          victim_size,
        } => ServerMessage::PlayerKilled {
          killer_id: killer_id.clone(),
          victim_id: victim_id.clone(),
          killer_size: *killer_size,
          victim_size: *victim_size,
        },
        GameEvent::PowerUpCollected { kind, player_id } => ServerMessage::PowerUpCollected {
          kind: *kind,
          player_id: player_id.clone(),
        },
      };
      self.broadcast(&message);
    }
  }

  fn check_victories(&mut self, now: i64) {
    let winners: Vec<(String, String, i64)> = self
      .players
      .values()
      .filter(|snake| !snake.has_won && snake.display_score >= self.win_score)
      .map(|snake| (snake.id.clone(), snake.name.clone(), snake.display_score))
      .collect();

    for (winner_id, winner_name, score) in winners {
      if let Some(snake) = self.players.get_mut(&winner_id) {
        snake.has_won = true;
        snake.win_reset_at = Some(now + WIN_RESET_DELAY_MS);
      }
      tracing::info!(room_id = %self.room_id, winner_id, score, "personal victory");
      self.send_to(
        &winner_id,
        &ServerMessage::PersonalVictory {
          winner_id: winner_id.clone(),
          winner_name: winner_name.clone(),
          score,
        },
      );
      // Everyone else only learns that somebody won.
      self.broadcast_except(
        &winner_id,
        &ServerMessage::PlayerAchievedVictory {
          winner_name,
          score,
        },
      );
    }

    let due: Vec<String> = self
      .players
      .values()
      .filter(|snake| matches!(snake.win_reset_at, Some(at) if now >= at))
      .map(|snake| snake.id.clone())
      .collect();
    for id in due {
      if let Some(snake) = self.players.get_mut(&id) {
        reset_snake(snake, now);
      }
    }
  }

  fn spawn_power_ups(&mut self, now: i64) {
    if now - self.last_power_up_spawn < POWERUP_SPAWN_INTERVAL_MS {
      return;
    }
    self.last_power_up_spawn = now;
    if self.power_ups.len() >= MAX_POWERUPS {
      return;
    }
    self.next_power_up_id += 1;
    self.power_ups.push(spawn_power_up(self.next_power_up_id));
  }

  /// Tops the pool back toward its floor after non-respawning items (top
  /// tier, death drops) were consumed.
  fn replenish_food(&mut self, now: i64) {
    if self.food.len() >= FOOD_COUNT || now - self.last_food_replenish < FOOD_REPLENISH_INTERVAL_MS
    {
      return;
    }
    self.last_food_replenish = now;
    let id = self.alloc_food_id();
    self.food.push(spawn_food(id));
  }

  fn broadcast_snapshot(&mut self) {
    let message = ServerMessage::GameUpdate {
      players: self.players.values().cloned().collect(),
      food: self.food.clone(),
      power_ups: self.power_ups.clone(),
      game_started: self.game_started,
      room_host: self.host_user_id.clone(),
    };
    self.broadcast(&message);
  }

  fn send_to(&mut self, session_id: &str, message: &ServerMessage) {
    let stale = match self.sessions.get(session_id) {
      Some(session) => session.sender.send(protocol::encode(message)).is_err(),
      None => false,
    };
    if stale {
      self.remove_session(session_id);
    }
  }

  fn broadcast(&mut self, message: &ServerMessage) {
    let payload = protocol::encode(message);
    self.broadcast_payload(&payload, None);
  }

  fn broadcast_except(&mut self, excluded_session: &str, message: &ServerMessage) {
    let payload = protocol::encode(message);
    self.broadcast_payload(&payload, Some(excluded_session));
  }

  /// Fire-and-forget fan-out; a dead receiver is swept out rather than ever
  /// blocking the tick.
  fn broadcast_payload(&mut self, payload: &str, excluded_session: Option<&str>) {
    let mut stale = Vec::new();
    for (session_id, session) in &self.sessions {
      if excluded_session == Some(session_id.as_str()) {
        continue;
      }
      if session.sender.send(payload.to_string()).is_err() {
        stale.push(session_id.clone());
      }
    }
    for session_id in stale {
      self.remove_session(&session_id);
    }
  }
}
