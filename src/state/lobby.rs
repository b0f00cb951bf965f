use axum::extract::ws::{CloseFrame, Message};
use dashmap::DashMap;
use tokio::sync::{Mutex, MutexGuard, RwLock, mpsc};
use tracing::warn;

use crate::{dao::models::LobbyEntity, dto::ws::ServerMessage};

/// Handle used to push messages to one connected client.
#[derive(Clone)]
pub struct RoomConnection {
    /// Identifier of the connection itself.
    pub socket_id: String,
    /// Trusted user id the connection authenticated as.
    pub user_id: String,
    /// Whether this connection drives the game.
    pub is_host: bool,
    /// Writer channel for the connection's WebSocket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Connection registry for one lobby's real-time room.
///
/// Delivery is fire-and-forget: a broadcast enqueues the frame on every
/// connection's writer channel and never waits for acknowledgement.
#[derive(Default)]
pub struct Room {
    connections: DashMap<String, RoomConnection>,
}

impl Room {
    /// Register a connection under its socket id.
    pub fn insert(&self, connection: RoomConnection) {
        self.connections
            .insert(connection.socket_id.clone(), connection);
    }

    /// Remove a connection, returning its handle if it was present.
    pub fn remove(&self, socket_id: &str) -> Option<RoomConnection> {
        self.connections.remove(socket_id).map(|(_, conn)| conn)
    }

    /// Whether the room has no connections.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Send a message to every connection in the room.
    pub fn broadcast(&self, message: &ServerMessage) {
        let text = message.to_text();
        for entry in self.connections.iter() {
            let _ = entry.tx.send(Message::Text(text.clone().into()));
        }
    }

    /// Send a message to every non-host connection in the room.
    pub fn broadcast_to_players(&self, message: &ServerMessage) {
        let text = message.to_text();
        for entry in self.connections.iter() {
            if !entry.is_host {
                let _ = entry.tx.send(Message::Text(text.clone().into()));
            }
        }
    }

    /// Send a message to one connection. Returns false when the socket is
    /// unknown or its writer has closed.
    pub fn send_to(&self, socket_id: &str, message: &ServerMessage) -> bool {
        match self.connections.get(socket_id) {
            Some(conn) => conn.tx.send(Message::Text(message.to_text().into())).is_ok(),
            None => false,
        }
    }

    /// Send a message to the host connection, if one is bound.
    pub fn send_to_host(&self, message: &ServerMessage) {
        for entry in self.connections.iter() {
            if entry.is_host {
                let _ = entry.tx.send(Message::Text(message.to_text().into()));
            }
        }
    }

    /// Force-disconnect one connection ("opened in another tab" semantics).
    pub fn kick(&self, socket_id: &str, reason: &str) {
        if let Some((_, conn)) = self.connections.remove(socket_id) {
            warn!(socket_id, reason, "force-disconnecting connection");
            let _ = conn.tx.send(Message::Close(Some(CloseFrame {
                code: 1000,
                reason: reason.into(),
            })));
        }
    }

    /// Force-disconnect every connection in the room, host included.
    pub fn kick_all(&self, reason: &str) {
        let socket_ids: Vec<String> = self
            .connections
            .iter()
            .map(|entry| entry.socket_id.clone())
            .collect();
        for socket_id in socket_ids {
            self.kick(&socket_id, reason);
        }
    }
}

/// Per-lobby state bundle: the operation gate serializing all mutations, the
/// in-memory cache of the durable lobby record, and the connection room.
/// Created on first reference to a lobby id and kept for the process
/// lifetime; the durable record is the source of truth across restarts.
pub struct LobbySession {
    /// Stable lobby identifier.
    pub id: String,
    /// Real-time connection room.
    pub room: Room,
    gate: Mutex<()>,
    cache: RwLock<Option<LobbyEntity>>,
}

impl LobbySession {
    /// Fresh session with an empty cache and room.
    pub fn new(id: String) -> Self {
        Self {
            id,
            room: Room::default(),
            gate: Mutex::new(()),
            cache: RwLock::new(None),
        }
    }

    /// Acquire the per-lobby operation gate. Every coordinator operation and
    /// answer submission for this lobby runs under this guard, which is what
    /// makes read-modify-write sequences over the players list safe.
    pub async fn gate(&self) -> MutexGuard<'_, ()> {
        self.gate.lock().await
    }

    /// Cached copy of the lobby record, if the cache is warm.
    pub async fn cached(&self) -> Option<LobbyEntity> {
        self.cache.read().await.clone()
    }

    /// Replace the cache with a freshly persisted record.
    pub async fn set_cached(&self, lobby: LobbyEntity) {
        let mut guard = self.cache.write().await;
        *guard = Some(lobby);
    }
}
