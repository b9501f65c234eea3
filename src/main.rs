use axum::{
  extract::ws::{Message, WebSocket},
  extract::{State, WebSocketUpgrade},
  http::Method,
  response::IntoResponse,
  routing::get,
  Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::env;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::EnvFilter;

mod game;
mod protocol;
mod shared;

use game::registry::RoomRegistry;
use game::room::Room;
use protocol::{ClientMessage, ServerMessage};
use shared::identity::is_valid_user_id;

#[derive(Clone)]
struct AppState {
  registry: Arc<RoomRegistry>,
}

#[derive(Debug, Serialize)]
struct OkResponse {
  ok: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  let state = Arc::new(AppState {
    registry: Arc::new(RoomRegistry::new()),
  });

  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods([Method::GET, Method::POST])
    .allow_headers(Any);

  let app: Router = Router::new()
    .route("/api/health", get(health))
    .route("/api/ws", get(ws_handler))
    .layer(cors)
    .with_state(state);

  let port: u16 = env::var("PORT")
    .ok()
    .and_then(|value| value.parse().ok())
    .unwrap_or(3000);

  let address = format!("0.0.0.0:{port}");
  tracing::info!("listening on {address}");

  let listener = tokio::net::TcpListener::bind(&address).await?;
  axum::serve(listener, app).await?;

  Ok(())
}

async fn health() -> impl IntoResponse {
  Json(OkResponse { ok: true })
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  ws.on_upgrade(move |socket| handle_socket(socket, state.registry.clone()))
}

/// One task per connection: a spawned writer drains the outbound channel so
/// a slow client never stalls a room tick, while this task applies inbound
/// messages as they arrive.
async fn handle_socket(socket: WebSocket, registry: Arc<RoomRegistry>) {
  let (mut sender, mut receiver) = socket.split();

  if !registry.try_acquire_connection() {
    let _ = sender
      .send(Message::Text(protocol::encode(&ServerMessage::GameFull)))
      .await;
    return;
  }

  let (tx, mut rx) = mpsc::unbounded_channel::<String>();
  let send_task = tokio::spawn(async move {
    while let Some(payload) = rx.recv().await {
      if sender.send(Message::Text(payload)).await.is_err() {
        break;
      }
    }
  });

  let mut connection = Connection {
    session_id: uuid::Uuid::new_v4().to_string(),
    registry: registry.clone(),
    tx,
    user_id: None,
    room: None,
  };
  tracing::debug!(session_id = %connection.session_id, "connection opened");

  while let Some(result) = receiver.next().await {
    let Ok(message) = result else { break };
    match message {
      Message::Text(text) => connection.handle_text(&text).await,
      Message::Close(_) => break,
      _ => {}
    }
  }

  connection.teardown().await;
  registry.release_connection();
  send_task.abort();
}

/// Per-connection gateway state: the stable user identity and the room this
/// connection currently plays in.
struct Connection {
  session_id: String,
  registry: Arc<RoomRegistry>,
  tx: mpsc::UnboundedSender<String>,
  user_id: Option<String>,
  room: Option<Arc<Room>>,
}

impl Connection {
  fn send(&self, message: &ServerMessage) {
    let _ = self.tx.send(protocol::encode(message));
  }

  async fn handle_text(&mut self, text: &str) {
    // Malformed payloads are dropped without a reply.
    let Ok(message) = serde_json::from_str::<ClientMessage>(text) else { return };
    self.handle_message(message).await;
  }

  async fn handle_message(&mut self, message: ClientMessage) {
    match message {
      ClientMessage::CheckUserId { existing_id } => {
        let (user_id, is_new_user) = self
          .registry
          .assign_user_id(existing_id.as_deref(), &self.session_id);
        if let Some(previous) = self.user_id.take() {
          if previous != user_id {
            self.registry.release_user_id(&previous, &self.session_id);
          }
        }
        self.user_id = Some(user_id.clone());
        self.send(&ServerMessage::UserIdAssigned {
          user_id,
          is_new_user,
        });
      }
      ClientMessage::GetRoomList => {
        let rooms = self.registry.list_rooms().await;
        self.send(&ServerMessage::RoomList { rooms });
      }
      ClientMessage::CreateRoom {
        user_id,
        is_public,
        is_solo,
      } => {
        if !self.adopt_user_id(&user_id) {
          return;
        }
        self.leave_room().await;
        let room = self.registry.create_room(is_public, is_solo);
        self.enter_room(room, true).await;
      }
      ClientMessage::JoinRoom { room_id, user_id } => {
        if !self.adopt_user_id(&user_id) {
          return;
        }
        let Some(room) = self.registry.get(&room_id) else {
          self.send(&ServerMessage::RoomError {
            message: game::room::RoomError::RoomNotFound.to_string(),
          });
          return;
        };
        self.leave_room().await;
        self.enter_room(room, false).await;
      }
      ClientMessage::QuickPlay { user_id } => {
        if !self.adopt_user_id(&user_id) {
          return;
        }
        self.leave_room().await;
        let room = self.registry.quick_play().await;
        self.enter_room(room, false).await;
      }
      ClientMessage::JoinGame {
        user_id,
        name,
        color,
      } => {
        if !self.adopt_user_id(&user_id) {
          return;
        }
        match &self.room {
          Some(room) => {
            room
              .handle_join_game(&self.session_id, &user_id, name, color)
              .await;
          }
          None => self.send(&ServerMessage::RoomError {
            message: "Join a room first".to_string(),
          }),
        }
      }
      ClientMessage::UpdateDirection { angle_radians } => {
        if let Some(room) = &self.room {
          room.handle_direction(&self.session_id, angle_radians).await;
        }
      }
      ClientMessage::Boost { active } => {
        if let Some(room) = &self.room {
          room.handle_boost(&self.session_id, active).await;
        }
      }
      ClientMessage::StartGame => {
        if let Some(room) = &self.room {
          room.handle_start(&self.session_id).await;
        }
      }
      ClientMessage::Respawn => {
        if let Some(room) = &self.room {
          room.handle_respawn(&self.session_id).await;
        }
      }
      ClientMessage::UpdatePlayerInfo { name, color } => {
        if let Some(room) = &self.room {
          room.handle_player_info(&self.session_id, name, color).await;
        }
      }
      ClientMessage::RequestUserIdChange { old_id, new_id } => {
        match self
          .registry
          .change_user_id(&old_id, &new_id, &self.session_id)
        {
          Ok(()) => {
            self.user_id = Some(new_id.clone());
            if let Some(room) = &self.room {
              room.handle_user_id_change(&self.session_id, &new_id).await;
            }
            self.send(&ServerMessage::UserIdChangeSuccess {
              new_user_id: new_id,
            });
          }
          Err(message) => self.send(&ServerMessage::UserIdChangeError { message }),
        }
      }
    }
  }

  /// Binds the user id named in a payload to this connection, rejecting
  /// format violations and ids owned by other live connections before any
  /// state is touched.
  fn adopt_user_id(&mut self, requested: &str) -> bool {
    if self.user_id.as_deref() == Some(requested) {
      return true;
    }
    if !is_valid_user_id(requested) {
      self.send(&ServerMessage::RoomError {
        message: "Invalid user ID".to_string(),
      });
      return false;
    }
    if !self.registry.claim_user_id(requested, &self.session_id) {
      self.send(&ServerMessage::RoomError {
        message: "User ID is already in use".to_string(),
      });
      return false;
    }
    if let Some(previous) = self.user_id.take() {
      self.registry.release_user_id(&previous, &self.session_id);
    }
    self.user_id = Some(requested.to_string());
    true
  }

  async fn enter_room(&mut self, room: Arc<Room>, created: bool) {
    let user_id = self.user_id.clone().unwrap_or_default();
    match room
      .add_session(&self.session_id, &user_id, self.tx.clone())
      .await
    {
      Ok(is_host) => {
        room.ensure_loop();
        let room_id = room.id.clone();
        self.room = Some(room);
        self.send(&if created {
          ServerMessage::RoomCreated { room_id, is_host }
        } else {
          ServerMessage::RoomJoined { room_id, is_host }
        });
      }
      Err(error) => self.send(&ServerMessage::RoomError {
        message: error.to_string(),
      }),
    }
  }

  async fn leave_room(&mut self) {
    if let Some(room) = self.room.take() {
      let empty = room.remove_session(&self.session_id).await;
      if empty {
        self.registry.reap(&room.id).await;
      }
    }
  }

  async fn teardown(&mut self) {
    self.leave_room().await;
    if let Some(user_id) = self.user_id.take() {
      self.registry.release_user_id(&user_id, &self.session_id);
    }
    tracing::debug!(session_id = %self.session_id, "connection closed");
  }
}
