use crate::game::types::{Food, PowerUp, PowerUpKind, Snake};
use serde::{Deserialize, Serialize};

/// Inbound control messages, tagged the way the browser client emits them.
/// Anything that fails to deserialize is dropped silently.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
  #[serde(rename_all = "camelCase")]
  JoinRoom { room_id: String, user_id: String },
  #[serde(rename_all = "camelCase")]
  CreateRoom {
    user_id: String,
    #[serde(default)]
    is_public: bool,
    #[serde(default)]
    is_solo: bool,
  },
  #[serde(rename_all = "camelCase")]
  QuickPlay { user_id: String },
  GetRoomList,
  #[serde(rename_all = "camelCase")]
  CheckUserId { existing_id: Option<String> },
  #[serde(rename_all = "camelCase")]
  JoinGame {
    user_id: String,
    name: Option<String>,
    color: Option<String>,
  },
  #[serde(rename_all = "camelCase")]
  UpdateDirection { angle_radians: f64 },
  Boost { active: bool },
  StartGame,
  Respawn,
  UpdatePlayerInfo {
    name: Option<String>,
    color: Option<String>,
  },
  #[serde(rename_all = "camelCase")]
  RequestUserIdChange { old_id: String, new_id: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
  pub id: String,
  pub player_count: usize,
  pub max_players: usize,
  pub game_started: bool,
  pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
  #[serde(rename_all = "camelCase")]
  UserIdAssigned { user_id: String, is_new_user: bool },
  RoomList { rooms: Vec<RoomSummary> },
  #[serde(rename_all = "camelCase")]
  RoomCreated { room_id: String, is_host: bool },
  #[serde(rename_all = "camelCase")]
  RoomJoined { room_id: String, is_host: bool },
  RoomError { message: String },
  #[serde(rename_all = "camelCase")]
  Init {
    player_id: String,
    user_id: String,
    game_width: f64,
    game_height: f64,
    is_host: bool,
    game_started: bool,
  },
  #[serde(rename_all = "camelCase")]
  GameStarted { start_time: i64, player_count: usize },
  #[serde(rename_all = "camelCase")]
  NewHost { host_id: String },
  GameFull,
  #[serde(rename_all = "camelCase")]
  GameUpdate {
    players: Vec<Snake>,
    food: Vec<Food>,
    power_ups: Vec<PowerUp>,
    game_started: bool,
    room_host: Option<String>,
  },
  #[serde(rename_all = "camelCase")]
  PlayerKilled {
    killer_id: Option<String>,
    victim_id: String,
    killer_size: usize,
    victim_size: usize,
  },
  #[serde(rename_all = "camelCase")]
  PowerUpCollected {
    // The enum tag already claims the "type" key on the envelope.
    #[serde(rename = "powerUpType")]
    kind: PowerUpKind,
    player_id: String,
  },
  #[serde(rename_all = "camelCase")]
  PersonalVictory {
    winner_id: String,
    winner_name: String,
    score: i64,
  },
  #[serde(rename_all = "camelCase")]
  PlayerAchievedVictory { winner_name: String, score: i64 },
  #[serde(rename_all = "camelCase")]
  UserIdChangeSuccess { new_user_id: String },
  UserIdChangeError { message: String },
}

pub fn encode(message: &ServerMessage) -> String {
  serde_json::to_string(message).unwrap_or_default()
}
