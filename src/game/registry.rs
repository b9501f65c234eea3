use super::constants::{MAX_CONNECTIONS, ROOM_CODE_LENGTH};
use super::room::{Room, RoomInfo};
use crate::protocol::RoomSummary;
use crate::shared::identity::{generate_user_id, is_valid_user_id};
use dashmap::DashMap;
use rand::Rng;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const ROOM_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Process-wide ownership of rooms and active identities. Each room is an
/// independent aggregate; the registry only creates, finds and reaps them.
#[derive(Debug, Default)]
pub struct RoomRegistry {
  rooms: DashMap<String, Arc<Room>>,
  /// user id -> owning session id; uniqueness among active connections.
  active_user_ids: DashMap<String, String>,
  connections: AtomicUsize,
}

impl RoomRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Global capacity gate, taken once per WebSocket connection.
  pub fn try_acquire_connection(&self) -> bool {
    let mut current = self.connections.load(Ordering::SeqCst);
    loop {
      if current >= MAX_CONNECTIONS {
        return false;
      }
      match self.connections.compare_exchange(
        current,
        current + 1,
        Ordering::SeqCst,
        Ordering::SeqCst,
      ) {
        Ok(_) => return true,
        Err(actual) => current = actual,
      }
    }
  }

  pub fn release_connection(&self) {
    self.connections.fetch_sub(1, Ordering::SeqCst);
  }

  /// Allocates an empty room in the waiting state. The room's tick loop is
  /// started by the gateway on the first successful join, so a just-created
  /// room is never closed before its creator gets in.
  pub fn create_room(&self, is_public: bool, is_solo: bool) -> Arc<Room> {
    loop {
      let code = random_room_code();
      match self.rooms.entry(code.clone()) {
        dashmap::mapref::entry::Entry::Occupied(_) => continue,
        dashmap::mapref::entry::Entry::Vacant(entry) => {
          let room = Arc::new(Room::new(code, is_public, is_solo));
          entry.insert(room.clone());
          tracing::info!(room_id = %room.id, is_public, is_solo, "room created");
          return room;
        }
      }
    }
  }

  pub fn get(&self, room_id: &str) -> Option<Arc<Room>> {
    self.rooms.get(room_id).map(|entry| entry.value().clone())
  }

  async fn snapshots(&self) -> Vec<(Arc<Room>, RoomInfo)> {
    // Collect handles first; awaiting room locks while iterating the map
    // would hold its shard locks across suspension points.
    let handles: Vec<Arc<Room>> = self.rooms.iter().map(|entry| entry.value().clone()).collect();
    let mut infos = Vec::with_capacity(handles.len());
    for room in handles {
      let info = room.info().await;
      infos.push((room, info));
    }
    infos
  }

  /// Public, non-solo rooms, newest first.
  pub async fn list_rooms(&self) -> Vec<RoomSummary> {
    let mut listed: Vec<RoomInfo> = self
      .snapshots()
      .await
      .into_iter()
      .map(|(_, info)| info)
      .filter(|info| info.is_public && !info.is_solo && !info.closed)
      .collect();
    listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
    listed.iter().map(RoomInfo::summary).collect()
  }

  /// Prefers the most-recently-created public room that has spare capacity
  /// and has not started; otherwise opens a fresh public room.
  pub async fn quick_play(&self) -> Arc<Room> {
    let candidate = self
      .snapshots()
      .await
      .into_iter()
      .filter(|(_, info)| {
        info.is_public
          && !info.is_solo
          && !info.closed
          && !info.game_started
          && info.player_count < info.max_players
      })
      .max_by(|(_, a), (_, b)| a.created_at.cmp(&b.created_at).then(b.id.cmp(&a.id)));

    match candidate {
      Some((room, _)) => room,
      None => self.create_room(true, false),
    }
  }

  /// Drops a room once it reports closed. Closing is sticky, so a stale
  /// handle can never resurrect a reaped room.
  pub async fn reap(&self, room_id: &str) {
    let Some(room) = self.get(room_id) else { return };
    if room.info().await.closed {
      self.rooms.remove(room_id);
      tracing::info!(room_id, "room destroyed");
    }
  }

  /// Validates a client-remembered id, or mints a fresh one. Returns the
  /// assigned id and whether it is newly generated.
  pub fn assign_user_id(&self, requested: Option<&str>, session_id: &str) -> (String, bool) {
    if let Some(requested) = requested {
      if is_valid_user_id(requested) && self.claim_user_id(requested, session_id) {
        return (requested.to_string(), false);
      }
    }
    loop {
      let fresh = generate_user_id();
      if self.claim_user_id(&fresh, session_id) {
        return (fresh, true);
      }
    }
  }

  pub fn claim_user_id(&self, user_id: &str, session_id: &str) -> bool {
    match self.active_user_ids.entry(user_id.to_string()) {
      dashmap::mapref::entry::Entry::Occupied(entry) => entry.get().as_str() == session_id,
      dashmap::mapref::entry::Entry::Vacant(entry) => {
        entry.insert(session_id.to_string());
        true
      }
    }
  }

  pub fn release_user_id(&self, user_id: &str, session_id: &str) {
    self
      .active_user_ids
      .remove_if(user_id, |_, owner| owner.as_str() == session_id);
  }

  pub fn change_user_id(
    &self,
    old_id: &str,
    new_id: &str,
    session_id: &str,
  ) -> Result<(), String> {
    if !is_valid_user_id(new_id) {
      return Err("Invalid user ID format".to_string());
    }
    let owns_old = self
      .active_user_ids
      .get(old_id)
      .map(|owner| owner.value().as_str() == session_id)
      .unwrap_or(false);
    if !owns_old {
      return Err("Unknown user ID".to_string());
    }
    match self.active_user_ids.entry(new_id.to_string()) {
      dashmap::mapref::entry::Entry::Occupied(_) => Err("User ID is already in use".to_string()),
      dashmap::mapref::entry::Entry::Vacant(entry) => {
        entry.insert(session_id.to_string());
        self.release_user_id(old_id, session_id);
        Ok(())
      }
    }
  }
}

fn random_room_code() -> String {
  let mut rng = rand::thread_rng();
  (0..ROOM_CODE_LENGTH)
    .map(|_| ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())] as char)
    .collect()
}
